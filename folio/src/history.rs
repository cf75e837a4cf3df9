// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The undo log: a flat list of primitive edits with grouping and merging.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::cursor::Operation;
use crate::format::FormatIndex;
use crate::fragment::FragmentKind;
use crate::object::ObjectIndex;

/// An application-defined undo item.
///
/// Custom items ride the document's undo log so that application state can
/// stay in step with document edits made in the same edit block. They must
/// not touch the document they are logged with; the document is mid-replay
/// when they run.
pub trait CustomUndo: Debug {
    /// Rolls the item's effect back.
    fn undo(&mut self);
    /// Applies the item's effect again.
    fn redo(&mut self);
}

/// One primitive edit in the undo log.
///
/// Format-change commands store only one format index: the log keeps "the
/// other side" of the change, and each replay swaps the stored index with the
/// one currently in the document. Replaying twice is therefore a round trip.
#[derive(Debug)]
pub(crate) enum UndoCommand {
    /// Characters were inserted at `pos`.
    Inserted {
        pos: usize,
        buffer_pos: usize,
        len: usize,
        format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    },
    /// Characters were removed at `pos`.
    Removed {
        pos: usize,
        buffer_pos: usize,
        len: usize,
        format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    },
    /// A run's character format was replaced.
    CharFormatChanged {
        pos: usize,
        len: usize,
        format: FormatIndex,
    },
    /// A block's format was replaced. `pos` addresses the block.
    BlockFormatChanged { pos: usize, format: FormatIndex },
    /// A separator was inserted at `pos`, splitting a block in two.
    BlockInserted {
        pos: usize,
        buffer_pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
        op: Operation,
    },
    /// A separator was removed at `pos`, merging two blocks.
    BlockRemoved {
        pos: usize,
        buffer_pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
        op: Operation,
    },
    /// A frame sentinel was inserted at `pos`, adding a block boundary.
    BlockAdded {
        pos: usize,
        buffer_pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    },
    /// A frame sentinel was removed at `pos`, deleting a block boundary.
    BlockDeleted {
        pos: usize,
        buffer_pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    },
    /// A structural object's format was replaced.
    GroupFormatChanged {
        object: ObjectIndex,
        format: FormatIndex,
    },
    /// An application-defined item.
    Custom(Box<dyn CustomUndo>),
}

/// A command plus its position in the grouping structure.
#[derive(Debug)]
pub(crate) struct UndoEntry {
    pub(crate) command: UndoCommand,
    /// `true` when this entry continues the group opened by its predecessor.
    /// Undo and redo always traverse a whole group.
    pub(crate) grouped: bool,
}

/// The undo log.
///
/// `position` points between the undone and redone parts: everything before
/// it can be undone, everything at and after it can be redone. Appending an
/// edit truncates the redo part.
#[derive(Debug, Default)]
pub(crate) struct UndoStack {
    entries: Vec<UndoEntry>,
    position: usize,
    enabled: bool,
    /// Log position last marked unmodified; `None` once that position has
    /// been truncated away.
    clean: Option<usize>,
}

impl UndoStack {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            enabled: true,
            clean: Some(0),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables undo recording. Disabling clears the log.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.clear();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        if self.clean != Some(self.position) {
            self.clean = None;
        } else {
            self.clean = Some(0);
        }
        self.position = 0;
    }

    pub(crate) fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub(crate) fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        debug_assert!(position <= self.entries.len(), "log position out of range");
        self.position = position;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn grouped(&self, index: usize) -> bool {
        self.entries[index].grouped
    }

    /// Appends a command, possibly merging it into the previous entry.
    ///
    /// Does nothing while recording is disabled. `merge` permits coalescing
    /// with the entry on top of the log; callers clear it across group
    /// boundaries.
    pub(crate) fn push(&mut self, command: UndoCommand, grouped: bool, merge: bool) {
        if !self.enabled {
            return;
        }
        if self.position < self.entries.len() {
            self.entries.truncate(self.position);
            if let Some(clean) = self.clean {
                if clean > self.position {
                    // The unmodified state can no longer be reached.
                    self.clean = None;
                }
            }
        }
        // Never merge into the entry that produced the unmodified state:
        // the coalesced edit would leave the log position on the clean
        // mark and hide the modification.
        if merge && self.clean != Some(self.position) {
            if let Some(last) = self.entries.last_mut() {
                if try_merge(&mut last.command, &command) {
                    return;
                }
            }
        }
        self.entries.push(UndoEntry { command, grouped });
        self.position = self.entries.len();
    }

    /// Takes the entries out for replay. Recording is suspended until
    /// [`end_replay`](Self::end_replay) hands them back.
    pub(crate) fn begin_replay(&mut self) -> Vec<UndoEntry> {
        debug_assert!(self.enabled, "replay without an undo log");
        self.enabled = false;
        core::mem::take(&mut self.entries)
    }

    pub(crate) fn end_replay(&mut self, entries: Vec<UndoEntry>) {
        debug_assert!(self.entries.is_empty(), "replay entries already restored");
        self.entries = entries;
        self.enabled = true;
    }

    /// Whether the document differs from the state last marked unmodified.
    pub(crate) fn is_modified(&self) -> bool {
        self.clean != Some(self.position)
    }

    pub(crate) fn set_modified(&mut self, modified: bool) {
        self.clean = if modified { None } else { Some(self.position) };
    }
}

/// Coalesces `next` into `last` when the two read as one edit.
fn try_merge(last: &mut UndoCommand, next: &UndoCommand) -> bool {
    match (last, next) {
        (
            UndoCommand::Inserted {
                pos,
                buffer_pos,
                len,
                format,
                kind,
                op,
            },
            UndoCommand::Inserted {
                pos: next_pos,
                buffer_pos: next_buffer_pos,
                len: next_len,
                format: next_format,
                kind: next_kind,
                op: next_op,
            },
        ) => {
            // A typing run: the new text continues the old in the document
            // and in the buffer.
            if *kind == FragmentKind::Text
                && *next_kind == FragmentKind::Text
                && format == next_format
                && op == next_op
                && *pos + *len == *next_pos
                && *buffer_pos + *len == *next_buffer_pos
            {
                *len += next_len;
                return true;
            }
            false
        }
        (
            UndoCommand::Removed {
                pos,
                buffer_pos,
                len,
                format,
                kind,
                op,
            },
            UndoCommand::Removed {
                pos: next_pos,
                buffer_pos: next_buffer_pos,
                len: next_len,
                format: next_format,
                kind: next_kind,
                op: next_op,
            },
        ) => {
            if *kind != FragmentKind::Text
                || *next_kind != FragmentKind::Text
                || format != next_format
                || op != next_op
            {
                return false;
            }
            // Forward deletion eats successive text at a fixed position.
            if *pos == *next_pos && *buffer_pos + *len == *next_buffer_pos {
                *len += next_len;
                return true;
            }
            // Backspacing walks left through a buffer run.
            if *next_pos + *next_len == *pos && *next_buffer_pos + *next_len == *buffer_pos {
                *pos = *next_pos;
                *buffer_pos = *next_buffer_pos;
                *len += next_len;
                return true;
            }
            false
        }
        (
            UndoCommand::CharFormatChanged { pos, len, format },
            UndoCommand::CharFormatChanged {
                pos: next_pos,
                len: next_len,
                format: next_format,
            },
        ) => {
            if format != next_format {
                return false;
            }
            if *pos + *len == *next_pos {
                *len += next_len;
                return true;
            }
            if *next_pos + *next_len == *pos {
                *pos = *next_pos;
                *len += next_len;
                return true;
            }
            false
        }
        _ => false,
    }
}
