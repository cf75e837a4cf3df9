// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document: text storage, formats, structure and undo in one place.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;

use crate::block::{Block, BlockId, BlockMap};
use crate::cursor::{CursorId, CursorRegistry, Operation};
use crate::error::{Error, ErrorKind};
use crate::format::{FormatCollection, FormatIndex};
use crate::fragment::{Fragment, FragmentKind, FragmentMap};
use crate::history::{CustomUndo, UndoCommand, UndoStack};
use crate::object::{DocObject, Frame, List, ObjectIndex, ObjectRegistry, Table};
use crate::style::{BlockFormat, Brush, CharFormat, Format, FrameFormat, TableFormat};

/// Character stored for the opening sentinel of a frame.
const FRAME_BEGIN_CHAR: char = '\u{FDD0}';
/// Character stored for the closing sentinel of a frame.
const FRAME_END_CHAR: char = '\u{FDD1}';
/// Character standing in for an inline object.
const OBJECT_CHAR: char = '\u{FFFC}';

/// How a format change combines with the formats already in place.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum FormatChangeMode {
    /// Overlay the given attributes onto each existing format.
    #[default]
    Merge,
    /// Replace each existing format wholesale.
    Set,
}

/// Accumulated description of everything that changed since the last call to
/// [`Document::take_change`].
///
/// `from` and `length` describe the touched span in the current document;
/// `old_length` is how many positions that span replaced. Consecutive edits
/// fold into a single covering change.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DocumentChange {
    /// First touched position.
    pub from: usize,
    /// Length of the replaced span in the previous state.
    pub old_length: usize,
    /// Length of the touched span in the current state.
    pub length: usize,
}

#[derive(Copy, Clone, Debug)]
struct PendingChange {
    start: usize,
    /// One past the touched span, in current coordinates.
    end: usize,
    old_len: usize,
}

/// A rich text document.
///
/// The document owns an append-only character buffer, the piece table over
/// it, the block structure, interned formats, structural objects, registered
/// cursors and the undo log. All positions are character indices; `\n`
/// separates blocks and noncharacter sentinels delimit frames.
#[derive(Debug)]
pub struct Document<B: Brush> {
    buffer: Vec<char>,
    fragments: FragmentMap,
    blocks: BlockMap,
    formats: FormatCollection<B>,
    objects: ObjectRegistry,
    cursors: CursorRegistry,
    undo: UndoStack,
    revision: u64,
    edit_depth: usize,
    /// Whether the currently open edit block has recorded a command yet.
    group_started: bool,
    /// The next recorded command chains onto the previous undo group.
    join_pending: bool,
    change: Option<PendingChange>,
    default_char: FormatIndex,
    default_block: FormatIndex,
}

impl<B: Brush> Document<B> {
    /// Creates an empty document: no characters, one empty block.
    pub fn new() -> Self {
        let mut formats = FormatCollection::new();
        let default_char = formats.intern(Format::Char(CharFormat::default()));
        let default_block = formats.intern(Format::Block(BlockFormat::default()));
        let root_format = formats.intern(Format::Frame(FrameFormat::default()));
        Self {
            buffer: Vec::new(),
            fragments: FragmentMap::new(),
            blocks: BlockMap::new(default_block),
            formats,
            objects: ObjectRegistry::new(root_format),
            cursors: CursorRegistry::new(),
            undo: UndoStack::new(),
            revision: 0,
            edit_depth: 0,
            group_started: false,
            join_pending: false,
            change: None,
            default_char,
            default_block,
        }
    }

    // ----- queries ---------------------------------------------------------

    /// Number of positions in the document, sentinels included.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns `true` if the document holds no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fragments in the piece table.
    pub fn fragment_count(&self) -> usize {
        self.fragments.count()
    }

    /// Number of blocks. At least 1.
    pub fn block_count(&self) -> usize {
        self.blocks.count()
    }

    /// Monotonic revision, bumped by every primitive edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The interned formats of this document.
    pub fn formats(&self) -> &FormatCollection<B> {
        &self.formats
    }

    /// Interns a format, returning its index.
    pub fn intern_format(&mut self, format: Format<B>) -> FormatIndex {
        self.formats.intern(format)
    }

    /// Interns a character format.
    pub fn intern_char_format(&mut self, format: CharFormat<B>) -> FormatIndex {
        self.formats.intern(Format::Char(format))
    }

    /// Interns a block format.
    pub fn intern_block_format(&mut self, format: BlockFormat<B>) -> FormatIndex {
        self.formats.intern(Format::Block(format))
    }

    /// The format applied to text inserted without an explicit one, and the
    /// base other character formats are resolved against.
    pub fn default_char_format(&self) -> FormatIndex {
        self.default_char
    }

    /// The base block format.
    pub fn default_block_format(&self) -> FormatIndex {
        self.default_block
    }

    /// Replaces the base character format. Touches the whole document.
    pub fn set_default_char_format(&mut self, format: CharFormat<B>) {
        self.default_char = self.formats.intern(Format::Char(format));
        self.touch_everything();
    }

    /// Replaces the base block format. Touches the whole document.
    pub fn set_default_block_format(&mut self, format: BlockFormat<B>) {
        self.default_block = self.formats.intern(Format::Block(format));
        self.touch_everything();
    }

    /// The character at `pos`.
    ///
    /// Separators read as `\n`, frame sentinels and inline objects as their
    /// sentinel characters.
    pub fn char_at(&self, pos: usize) -> char {
        let (index, start) = self
            .fragments
            .find(pos)
            .expect("character position out of bounds");
        let fragment = self.fragments.get(index);
        self.buffer[fragment.buffer_pos + (pos - start)]
    }

    /// The document as plain text.
    ///
    /// Block separators and frame boundaries read as `\n`; inline objects as
    /// U+FFFC. The final block contributes no trailing newline.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for (_, _, fragment) in self.fragments.iter() {
            match fragment.kind {
                FragmentKind::Text => {
                    let run = &self.buffer[fragment.buffer_pos..fragment.buffer_pos + fragment.len];
                    text.extend(run.iter().copied());
                }
                FragmentKind::Separator
                | FragmentKind::FrameBegin
                | FragmentKind::FrameEnd => text.push('\n'),
                FragmentKind::FrameAtom => text.push(OBJECT_CHAR),
            }
        }
        text
    }

    // ----- blocks ----------------------------------------------------------

    /// The block containing `pos`. The end position belongs to the final
    /// block.
    pub fn block_at(&self, pos: usize) -> BlockRef<'_, B> {
        debug_assert!(pos <= self.len(), "block lookup out of bounds");
        let (index, start) = self.blocks.find(pos.min(self.len()));
        BlockRef {
            doc: self,
            index,
            start,
        }
    }

    /// The `number`th block of the document, counting from 0.
    pub fn block_by_number(&self, number: usize) -> Option<BlockRef<'_, B>> {
        if number >= self.blocks.count() {
            return None;
        }
        Some(BlockRef {
            doc: self,
            index: number,
            start: self.blocks.position_of(number),
        })
    }

    /// The first block of the document.
    pub fn first_block(&self) -> BlockRef<'_, B> {
        BlockRef {
            doc: self,
            index: 0,
            start: 0,
        }
    }

    /// The last block of the document.
    pub fn last_block(&self) -> BlockRef<'_, B> {
        let index = self.blocks.count() - 1;
        BlockRef {
            doc: self,
            index,
            start: self.blocks.position_of(index),
        }
    }

    /// The block with the given id, if it still exists.
    pub fn block_by_id(&self, id: BlockId) -> Option<BlockRef<'_, B>> {
        let index = self.blocks.index_of(id)?;
        Some(BlockRef {
            doc: self,
            index,
            start: self.blocks.position_of(index),
        })
    }

    /// Iterates all blocks in order.
    pub fn blocks(&self) -> Blocks<'_, B> {
        Blocks {
            doc: self,
            next: 0,
        }
    }

    // ----- objects ---------------------------------------------------------

    /// The root frame spanning the whole document.
    pub fn root_frame(&self) -> ObjectIndex {
        self.objects.root()
    }

    /// The structural object at `index`, if it has not been deleted.
    pub fn object(&self, index: ObjectIndex) -> Option<&DocObject> {
        self.objects.get(index)
    }

    /// The frame view of the object at `index`.
    ///
    /// Panics if the object was deleted or is not a frame.
    pub fn frame(&self, index: ObjectIndex) -> &Frame {
        self.objects.frame(index)
    }

    /// The table at `index`.
    ///
    /// Panics if the object was deleted or is not a table.
    pub fn table(&self, index: ObjectIndex) -> &Table {
        self.objects
            .get(index)
            .and_then(DocObject::as_table)
            .expect("object is not a live table")
    }

    /// The innermost frame containing the character at `pos`.
    pub fn frame_at(&self, pos: usize) -> ObjectIndex {
        self.objects.frame_at(pos)
    }

    /// The span of positions a frame covers, sentinels included.
    ///
    /// The root frame covers the whole document. Returns `None` for frames
    /// not currently linked into the text.
    pub fn frame_range(&self, index: ObjectIndex) -> Option<Range<usize>> {
        if index == self.objects.root() {
            return Some(0..self.len());
        }
        let frame = self.objects.frame(index);
        match (frame.begin(), frame.end()) {
            (Some(begin), Some(end)) => Some(begin..end + 1),
            _ => None,
        }
    }

    /// Iterates a frame's content: child frames and the blocks that belong
    /// directly to the frame, in document order.
    pub fn frame_content(&self, index: ObjectIndex) -> FrameIter<'_, B> {
        let (next, limit) = if index == self.objects.root() {
            (0, self.blocks.count())
        } else {
            let frame = self.objects.frame(index);
            match (frame.begin(), frame.end()) {
                (Some(begin), Some(end)) if begin != end => {
                    (self.blocks.find(begin + 1).0, self.blocks.find(end).0 + 1)
                }
                // Unlinked or atomic frames have no iterable content.
                _ => (0, 0),
            }
        };
        FrameIter {
            doc: self,
            next,
            limit,
            pending: None,
        }
    }

    /// Member blocks of a list, in document order.
    pub fn list_blocks(&self, list: ObjectIndex) -> Vec<BlockId> {
        let mut members = Vec::new();
        for (_, _, block) in self.blocks.iter() {
            if self.formats.block_format(block.format).object_index == Some(list) {
                members.push(block.id);
            }
        }
        members
    }

    /// 1-based ordinal of a block within a list, if it is a member.
    pub fn list_item_number(&self, list: ObjectIndex, block: BlockId) -> Option<usize> {
        self.list_blocks(list)
            .iter()
            .position(|&id| id == block)
            .map(|i| i + 1)
    }

    /// Creates a structural object described by `format` and returns its
    /// index. The interned format is pointed back at the object.
    ///
    /// Panics if `format` is a character or block format.
    pub fn create_object(&mut self, format: Format<B>) -> ObjectIndex {
        let index = self.objects.next_index();
        let mut format = format;
        format.set_object_index(index);
        let format_index = self.formats.intern(format.clone());
        let object = match format {
            Format::Frame(_) => DocObject::Frame(Frame::new(format_index)),
            Format::Table(_) => DocObject::Table(Table::new(format_index)),
            Format::List(_) => DocObject::List(List::new(format_index)),
            Format::Char(_) | Format::Block(_) => {
                panic!("character and block formats do not describe objects")
            }
        };
        let created = self.objects.create(object);
        debug_assert!(created == index, "object index allocation out of sync");
        created
    }

    /// Deletes an object that no longer owns any text or blocks.
    pub fn delete_object(&mut self, index: ObjectIndex) {
        if let Some(object) = self.objects.get(index) {
            match object {
                DocObject::Frame(f) => {
                    debug_assert!(f.begin().is_none() && f.end().is_none(), "frame still linked");
                }
                DocObject::Table(t) => {
                    debug_assert!(t.frame.begin().is_none(), "table still linked");
                }
                DocObject::List(l) => debug_assert!(l.is_empty(), "list still has blocks"),
            }
            self.objects.delete(index);
        }
    }

    /// Replaces an object's format. The change is undoable.
    pub fn set_object_format(&mut self, object: ObjectIndex, format: Format<B>) {
        let mut format = format;
        format.set_object_index(object);
        let new_index = self.formats.intern(format);
        let old = self.apply_object_format(object, new_index);
        if old != new_index {
            self.record(UndoCommand::GroupFormatChanged { object, format: old });
        }
    }

    // ----- cursors ---------------------------------------------------------

    /// Registers a cursor that will track edits until deregistered.
    pub fn register_cursor(&mut self, position: usize) -> CursorId {
        self.cursors.register(position.min(self.len()))
    }

    /// Removes a cursor from the registry. The id goes stale.
    pub fn deregister_cursor(&mut self, id: CursorId) {
        self.cursors.deregister(id);
    }

    /// Current position of a registered cursor.
    pub fn cursor_position(&self, id: CursorId) -> usize {
        self.cursors.position(id)
    }

    /// Moves a registered cursor.
    pub fn set_cursor_position(&mut self, id: CursorId, position: usize) {
        self.cursors.set_position(id, position.min(self.len()));
    }

    /// Selection anchor of a registered cursor.
    pub fn cursor_anchor(&self, id: CursorId) -> Option<usize> {
        self.cursors.anchor(id)
    }

    /// Sets or clears a cursor's selection anchor.
    pub fn set_cursor_anchor(&mut self, id: CursorId, anchor: Option<usize>) {
        self.cursors.set_anchor(id, anchor.map(|a| a.min(self.len())));
    }

    // ----- change notification ---------------------------------------------

    /// Takes the accumulated change description, resetting it.
    pub fn take_change(&mut self) -> Option<DocumentChange> {
        self.change.take().map(|c| DocumentChange {
            from: c.start,
            old_length: c.old_len,
            length: c.end - c.start,
        })
    }

    // ----- edit blocks and undo --------------------------------------------

    /// Opens an edit block: everything recorded until the matching
    /// [`end_edit_block`](Self::end_edit_block) undoes as one step. Nests.
    pub fn begin_edit_block(&mut self) {
        self.edit_depth += 1;
    }

    /// Closes the innermost edit block.
    pub fn end_edit_block(&mut self) {
        debug_assert!(self.edit_depth > 0, "unbalanced edit block");
        self.edit_depth = self.edit_depth.saturating_sub(1);
        if self.edit_depth == 0 {
            self.group_started = false;
            self.join_pending = false;
        }
    }

    /// Opens an edit block whose commands chain onto the previous undo
    /// group, so both undo together.
    pub fn join_previous_edit_block(&mut self) {
        self.join_pending = true;
        self.edit_depth += 1;
    }

    /// Returns `true` while undo recording is enabled.
    pub fn is_undo_enabled(&self) -> bool {
        self.undo.is_enabled()
    }

    /// Enables or disables undo recording. Disabling clears the log.
    pub fn set_undo_enabled(&mut self, enabled: bool) {
        self.undo.set_enabled(enabled);
    }

    /// Returns `true` if there is something to undo.
    pub fn is_undo_available(&self) -> bool {
        self.undo.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn is_redo_available(&self) -> bool {
        self.undo.can_redo()
    }

    /// Number of groups [`undo`](Self::undo) can take back.
    pub fn available_undo_steps(&self) -> usize {
        (0..self.undo.position())
            .filter(|&i| !self.undo.grouped(i))
            .count()
    }

    /// Number of groups [`redo`](Self::redo) can replay.
    pub fn available_redo_steps(&self) -> usize {
        (self.undo.position()..self.undo.len())
            .filter(|&i| !self.undo.grouped(i))
            .count()
    }

    /// Drops the whole undo log.
    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }

    /// Whether the document differs from the state last marked unmodified.
    pub fn is_modified(&self) -> bool {
        self.undo.is_modified()
    }

    /// Marks the current state as (un)modified.
    pub fn set_modified(&mut self, modified: bool) {
        self.undo.set_modified(modified);
    }

    /// Appends an application-defined item to the current undo group.
    pub fn add_custom_undo(&mut self, item: Box<dyn CustomUndo>) {
        self.record(UndoCommand::Custom(item));
    }

    /// Undoes the most recent group. Returns `false` if there was nothing to
    /// undo or an edit block is open.
    pub fn undo(&mut self) -> bool {
        if self.edit_depth > 0 {
            debug_assert!(false, "undo inside an open edit block");
            return false;
        }
        if !self.undo.is_enabled() || !self.undo.can_undo() {
            return false;
        }
        let mut entries = self.undo.begin_replay();
        let mut position = self.undo.position();
        loop {
            position -= 1;
            let entry = &mut entries[position];
            let stop = !entry.grouped || position == 0;
            self.apply_inverse(&mut entry.command);
            if stop {
                break;
            }
        }
        self.undo.end_replay(entries);
        self.undo.set_position(position);
        true
    }

    /// Redoes the most recently undone group. Returns `false` if there was
    /// nothing to redo or an edit block is open.
    pub fn redo(&mut self) -> bool {
        if self.edit_depth > 0 {
            debug_assert!(false, "redo inside an open edit block");
            return false;
        }
        if !self.undo.is_enabled() || !self.undo.can_redo() {
            return false;
        }
        let mut entries = self.undo.begin_replay();
        let mut position = self.undo.position();
        loop {
            let entry = &mut entries[position];
            self.apply_forward(&mut entry.command);
            position += 1;
            if position == entries.len() || !entries[position].grouped {
                break;
            }
        }
        self.undo.end_replay(entries);
        self.undo.set_position(position);
        true
    }

    // ----- text edits ------------------------------------------------------

    /// Inserts `text` at `pos` with the given character format.
    ///
    /// Embedded `\n` characters split blocks, exactly as if
    /// [`insert_block`](Self::insert_block) had been called; the new blocks
    /// keep the format of the block being split.
    pub fn insert(&mut self, pos: usize, text: &str, format: FormatIndex) {
        debug_assert!(pos <= self.len(), "insert position out of bounds");
        let mut pos = pos.min(self.len());
        if text.is_empty() {
            return;
        }
        if !text.contains('\n') {
            self.insert_segment(pos, text, format);
            return;
        }
        self.begin_edit_block();
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                let (block_index, _) = self.blocks.find(pos);
                let block_format = self.blocks.get(block_index).format;
                self.insert_block(pos, block_format, format);
                pos += 1;
            }
            if !segment.is_empty() {
                self.insert_segment(pos, segment, format);
                pos += segment.chars().count();
            }
        }
        self.end_edit_block();
    }

    /// Inserts a run already present in the character buffer.
    ///
    /// This is the piece-table fast path: no characters are copied, only a
    /// fragment is created over `buffer_range`.
    pub fn insert_buffer_range(
        &mut self,
        pos: usize,
        buffer_range: Range<usize>,
        format: FormatIndex,
    ) {
        debug_assert!(
            buffer_range.end <= self.buffer.len(),
            "buffer range out of bounds"
        );
        debug_assert!(
            self.buffer[buffer_range.clone()]
                .iter()
                .all(|&c| c != '\n' && c != FRAME_BEGIN_CHAR && c != FRAME_END_CHAR),
            "reused buffer runs must not cover separators or sentinels"
        );
        if buffer_range.is_empty() {
            return;
        }
        let len = buffer_range.len();
        self.insert_inline(
            pos.min(self.len()),
            buffer_range.start,
            len,
            format,
            FragmentKind::Text,
            Operation::MoveCursor,
        );
    }

    /// Inserts a block boundary at `pos`.
    ///
    /// The block containing `pos` is split: the head keeps its identity and
    /// format and gains the separator (whose character format is
    /// `char_format`); the tail becomes a new block with `block_format`.
    pub fn insert_block(
        &mut self,
        pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
    ) {
        let pos = pos.min(self.len());
        self.buffer.push('\n');
        let buffer_pos = self.buffer.len() - 1;
        self.insert_block_raw(
            pos,
            buffer_pos,
            block_format,
            char_format,
            FragmentKind::Separator,
            Operation::MoveCursor,
        );
    }

    /// Removes `len` positions starting at `pos`.
    ///
    /// Removing a separator merges its block into the next one; the merged
    /// block keeps the first block's format. Removing frame sentinels takes
    /// the frames out of the tree.
    pub fn remove(&mut self, pos: usize, len: usize) {
        self.remove_with(pos, len, Operation::MoveCursor);
    }

    /// [`remove`](Self::remove) with explicit cursor behavior.
    pub fn remove_with(&mut self, pos: usize, len: usize, op: Operation) {
        debug_assert!(pos <= self.len(), "remove position out of bounds");
        let pos = pos.min(self.len());
        let mut remaining = len.min(self.len() - pos);
        if remaining == 0 {
            return;
        }
        // A removal crossing fragment kinds decomposes into several
        // commands, which must undo as one step. Single-fragment removals
        // stay free-standing so consecutive backspaces can still coalesce.
        let grouped = {
            let (index, start) = self
                .fragments
                .find(pos)
                .expect("removal range checked above");
            let fragment = self.fragments.get(index);
            match fragment.kind {
                FragmentKind::Text => remaining > fragment.len - (pos - start),
                _ => remaining > 1,
            }
        };
        if grouped {
            self.begin_edit_block();
        }
        while remaining > 0 {
            let (index, start) = self
                .fragments
                .find(pos)
                .expect("removal range checked above");
            let fragment = *self.fragments.get(index);
            let offset = pos - start;
            match fragment.kind {
                FragmentKind::Text => {
                    let take = (fragment.len - offset).min(remaining);
                    self.remove_text_span(pos, take, op);
                    remaining -= take;
                }
                FragmentKind::FrameAtom => {
                    self.remove_atom(pos, op);
                    remaining -= 1;
                }
                FragmentKind::Separator | FragmentKind::FrameBegin | FragmentKind::FrameEnd => {
                    self.remove_block_boundary(pos, op);
                    remaining -= 1;
                }
            }
        }
        if grouped {
            self.end_edit_block();
        }
    }

    // ----- format edits ----------------------------------------------------

    /// Applies a character format to `[pos, pos + len)`.
    ///
    /// Fragments are split at the range edges; each fragment in the range is
    /// retargeted at the new (merged or replaced) interned format, and
    /// neighboring fragments that end up equal are merged back together.
    pub fn set_char_format(
        &mut self,
        pos: usize,
        len: usize,
        format: &CharFormat<B>,
        mode: FormatChangeMode,
    ) {
        debug_assert!(pos + len <= self.len(), "format range out of bounds");
        let pos = pos.min(self.len());
        let len = len.min(self.len() - pos);
        if len == 0 {
            return;
        }
        let revision = self.bump_revision();
        self.fragments.split_at(pos);
        self.fragments.split_at(pos + len);
        let (mut index, start) = self
            .fragments
            .find(pos)
            .expect("format range checked above");
        debug_assert!(start == pos, "split must land the range on a boundary");
        let mut covered = 0;
        let mut records: Vec<(usize, usize, FormatIndex)> = Vec::new();
        while covered < len {
            let fragment = *self.fragments.get(index);
            let mut candidate = match mode {
                FormatChangeMode::Set => format.clone(),
                FormatChangeMode::Merge => {
                    self.formats.char_format(fragment.format).merged(format)
                }
            };
            if fragment.kind != FragmentKind::Text {
                // Sentinels must stay attached to their object.
                let old = self.formats.char_format(fragment.format);
                candidate.object_index = old.object_index;
                if candidate.object_type.is_none() {
                    candidate.object_type = old.object_type;
                }
            }
            let new_index = self.formats.intern(Format::Char(candidate));
            if new_index != fragment.format {
                self.fragments.set_format(index, new_index);
                records.push((pos + covered, fragment.len, fragment.format));
            }
            covered += fragment.len;
            index += 1;
        }
        self.unite_range(pos, pos + len);
        // Several reformatted fragments undo as one step; a lone record
        // stays free-standing so repeated formatting can coalesce.
        let grouped = records.len() > 1;
        if grouped {
            self.begin_edit_block();
        }
        for (record_pos, record_len, old) in records {
            self.record(UndoCommand::CharFormatChanged {
                pos: record_pos,
                len: record_len,
                format: old,
            });
        }
        if grouped {
            self.end_edit_block();
        }
        self.touch_blocks(pos, len, revision);
        self.note_change(pos, len, len);
    }

    /// Applies a block format to every block intersecting `[pos, pos + len]`.
    ///
    /// With `len == 0` only the block containing `pos` is touched. Block
    /// group membership follows the format's `object_index`.
    pub fn set_block_format(
        &mut self,
        pos: usize,
        len: usize,
        format: &BlockFormat<B>,
        mode: FormatChangeMode,
    ) {
        let pos = pos.min(self.len());
        let len = len.min(self.len() - pos);
        self.begin_edit_block();
        let revision = self.bump_revision();
        let (first, _) = self.blocks.find(pos);
        let (last, _) = self.blocks.find(pos + len);
        for block_index in first..=last {
            let block = *self.blocks.get(block_index);
            let new_index = match mode {
                FormatChangeMode::Set => self.formats.intern(Format::Block(format.clone())),
                FormatChangeMode::Merge => {
                    let merged = self.formats.block_format(block.format).merged(format);
                    self.formats.intern(Format::Block(merged))
                }
            };
            if new_index == block.format {
                continue;
            }
            let block_pos = self.blocks.position_of(block_index);
            self.blocks.update(block_index, |b| {
                b.format = new_index;
                b.revision = revision;
            });
            self.update_list_membership(block.id, block.format, new_index);
            self.record(UndoCommand::BlockFormatChanged {
                pos: block_pos,
                format: block.format,
            });
            self.note_change(block_pos, block.len, block.len);
        }
        self.end_edit_block();
    }

    // ----- frames and tables -----------------------------------------------

    /// Wraps `[start, end)` in a new frame delimited by sentinel characters.
    ///
    /// Both endpoints must lie in the same innermost frame; otherwise the
    /// frame would cross an existing boundary and
    /// [`ErrorKind::FrameNesting`] is returned. Existing frames that fall
    /// entirely inside the range become children of the new frame.
    ///
    /// With `start == end` this creates an atomic inline frame, see
    /// [`insert_inline_object`](Self::insert_inline_object).
    pub fn insert_frame(
        &mut self,
        start: usize,
        end: usize,
        format: FrameFormat<B>,
    ) -> Result<ObjectIndex, Error> {
        debug_assert!(start <= end, "frame endpoints reversed");
        let doc_len = self.len();
        let (start, end) = if start <= end {
            (start.min(doc_len), end.min(doc_len))
        } else {
            (end.min(doc_len), start.min(doc_len))
        };
        if start == end {
            return Ok(self.insert_inline_object(start, format, CharFormat::default()));
        }
        if self.objects.frame_for_insert(start) != self.objects.frame_for_insert(end) {
            return Err(ErrorKind::FrameNesting { start, end }.into());
        }
        self.begin_edit_block();
        let index = self.objects.next_index();
        let mut format = format;
        format.object_index = Some(index);
        let format_index = self.formats.intern(Format::Frame(format));
        let created = self.objects.create(DocObject::Frame(Frame::new(format_index)));
        debug_assert!(created == index, "object index allocation out of sync");
        let sentinel_format = self.intern_char_format(CharFormat {
            object_index: Some(index),
            ..CharFormat::default()
        });
        // Close first: inserting the opening sentinel would shift `end`.
        self.buffer.push(FRAME_END_CHAR);
        let end_buffer_pos = self.buffer.len() - 1;
        self.insert_block_raw(
            end,
            end_buffer_pos,
            self.default_block,
            sentinel_format,
            FragmentKind::FrameEnd,
            Operation::MoveCursor,
        );
        self.buffer.push(FRAME_BEGIN_CHAR);
        let begin_buffer_pos = self.buffer.len() - 1;
        self.insert_block_raw(
            start,
            begin_buffer_pos,
            self.default_block,
            sentinel_format,
            FragmentKind::FrameBegin,
            Operation::MoveCursor,
        );
        {
            let frame = self.objects.frame_mut(index);
            frame.begin = Some(start);
            frame.end = Some(end + 1);
        }
        let parent = self.objects.frame_for_insert(start);
        self.objects.link(index, parent);
        self.objects.adopt_children(index, parent);
        self.end_edit_block();
        Ok(index)
    }

    /// Inserts a single-character inline object at `pos`.
    ///
    /// The object is an atomic frame: it participates in the frame tree (and
    /// can float), but sits inline in its block's text as one character. The
    /// character format's `object_type` selects how consumers measure and
    /// draw it.
    pub fn insert_inline_object(
        &mut self,
        pos: usize,
        format: FrameFormat<B>,
        char_format: CharFormat<B>,
    ) -> ObjectIndex {
        let pos = pos.min(self.len());
        let index = self.objects.next_index();
        let mut format = format;
        format.object_index = Some(index);
        let format_index = self.formats.intern(Format::Frame(format));
        let created = self.objects.create(DocObject::Frame(Frame::new(format_index)));
        debug_assert!(created == index, "object index allocation out of sync");
        let mut char_format = char_format;
        char_format.object_index = Some(index);
        let char_index = self.intern_char_format(char_format);
        self.buffer.push(OBJECT_CHAR);
        let buffer_pos = self.buffer.len() - 1;
        self.insert_inline(
            pos,
            buffer_pos,
            1,
            char_index,
            FragmentKind::FrameAtom,
            Operation::MoveCursor,
        );
        index
    }

    /// Removes a frame's sentinels, keeping its content in place.
    ///
    /// The frame's children are reparented to its parent and the frame
    /// leaves the tree; the object itself survives for undo.
    pub fn remove_frame(&mut self, index: ObjectIndex) {
        debug_assert!(index != self.objects.root(), "the root frame is fixed");
        let frame = self.objects.frame(index);
        let (Some(begin), Some(end)) = (frame.begin(), frame.end()) else {
            debug_assert!(false, "frame is not linked into the text");
            return;
        };
        self.begin_edit_block();
        if begin == end {
            // Atomic frames are a single inline character.
            self.remove_with(begin, 1, Operation::MoveCursor);
        } else {
            // End first so the begin position stays valid.
            self.remove_block_boundary(end, Operation::MoveCursor);
            self.remove_block_boundary(begin, Operation::MoveCursor);
        }
        self.end_edit_block();
    }

    /// Inserts a `rows x columns` table at `pos`.
    ///
    /// The table is a frame; every cell is a child frame of the table with
    /// initially empty content. Cell spans come from the cell frame formats
    /// and default to 1.
    pub fn insert_table(
        &mut self,
        pos: usize,
        rows: usize,
        columns: usize,
        format: TableFormat<B>,
    ) -> ObjectIndex {
        debug_assert!(rows > 0 && columns > 0, "tables need at least one cell");
        let rows = rows.max(1);
        let columns = columns.max(1);
        let pos = pos.min(self.len());
        self.begin_edit_block();
        let index = self.objects.next_index();
        let mut format = format;
        format.frame.object_index = Some(index);
        format.columns = Some(u16::try_from(columns).unwrap_or(u16::MAX));
        let format_index = self.formats.intern(Format::Table(format));
        let created = self.objects.create(DocObject::Table(Table::new(format_index)));
        debug_assert!(created == index, "object index allocation out of sync");
        let table_sentinel = self.intern_char_format(CharFormat {
            object_index: Some(index),
            ..CharFormat::default()
        });

        // Characters go in left to right so no position shifts under us.
        let mut at = pos;
        self.push_sentinel_block(&mut at, table_sentinel, FragmentKind::FrameBegin);
        let mut cells = Vec::with_capacity(rows * columns);
        for _ in 0..rows * columns {
            let cell = self.objects.next_index();
            let cell_format = self.formats.intern(Format::Frame(FrameFormat {
                object_index: Some(cell),
                ..FrameFormat::default()
            }));
            let created = self.objects.create(DocObject::Frame(Frame::new(cell_format)));
            debug_assert!(created == cell, "object index allocation out of sync");
            let cell_sentinel = self.intern_char_format(CharFormat {
                object_index: Some(cell),
                ..CharFormat::default()
            });
            let begin = at;
            self.push_sentinel_block(&mut at, cell_sentinel, FragmentKind::FrameBegin);
            self.push_sentinel_block(&mut at, cell_sentinel, FragmentKind::FrameEnd);
            {
                let frame = self.objects.frame_mut(cell);
                frame.begin = Some(begin);
                frame.end = Some(begin + 1);
            }
            cells.push(cell);
        }
        self.push_sentinel_block(&mut at, table_sentinel, FragmentKind::FrameEnd);
        {
            let frame = self.objects.frame_mut(index);
            frame.begin = Some(pos);
            frame.end = Some(at - 1);
        }
        let parent = self.objects.frame_for_insert(pos);
        self.objects.link(index, parent);
        for &cell in &cells {
            self.objects.link(cell, index);
        }
        if let Some(DocObject::Table(table)) = self.objects.get_mut(index) {
            table.rows = rows;
            table.columns = columns;
            table.cells = cells;
        }
        self.refresh_table_grid(index);
        self.end_edit_block();
        index
    }

    // ----- internals -------------------------------------------------------

    fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Records an undo command with the current grouping flags.
    fn record(&mut self, command: UndoCommand) {
        let starts_group = self.edit_depth > 0 && !self.group_started && !self.join_pending;
        let grouped = if self.edit_depth > 0 {
            self.group_started || self.join_pending
        } else {
            self.join_pending
        };
        self.undo.push(command, grouped, !starts_group);
        if self.edit_depth > 0 {
            self.group_started = true;
        }
        self.join_pending = false;
    }

    /// Folds an edit into the pending change description.
    ///
    /// `from` is in current coordinates; the edit replaced `old_len`
    /// positions with `new_len`.
    fn note_change(&mut self, from: usize, old_len: usize, new_len: usize) {
        match &mut self.change {
            None => {
                self.change = Some(PendingChange {
                    start: from,
                    end: from + new_len,
                    old_len,
                });
            }
            Some(change) => {
                if from < change.start {
                    change.old_len += change.start - from;
                    change.start = from;
                }
                let edit_old_end = from + old_len;
                if edit_old_end > change.end {
                    change.old_len += edit_old_end - change.end;
                    change.end = from + new_len;
                } else {
                    change.end = change.end - old_len + new_len;
                }
            }
        }
    }

    fn touch_everything(&mut self) {
        let revision = self.bump_revision();
        let count = self.blocks.count();
        for index in 0..count {
            self.blocks.update(index, |b| b.revision = revision);
        }
        let len = self.len();
        self.note_change(0, len, len);
    }

    /// Stamps the revision of every block intersecting `[pos, pos + len]`.
    fn touch_blocks(&mut self, pos: usize, len: usize, revision: u64) {
        let (first, _) = self.blocks.find(pos);
        let (last, _) = self.blocks.find((pos + len).min(self.len()));
        for index in first..=last {
            self.blocks.update(index, |b| b.revision = revision);
        }
    }

    fn insert_segment(&mut self, pos: usize, text: &str, format: FormatIndex) {
        debug_assert!(!text.contains('\n'), "segments are separator-free");
        let buffer_pos = self.buffer.len();
        self.buffer.extend(text.chars());
        let len = self.buffer.len() - buffer_pos;
        self.insert_inline(
            pos,
            buffer_pos,
            len,
            format,
            FragmentKind::Text,
            Operation::MoveCursor,
        );
    }

    /// Inserts an inline fragment (text or inline object) at `pos`.
    fn insert_inline(
        &mut self,
        pos: usize,
        buffer_pos: usize,
        len: usize,
        format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    ) {
        debug_assert!(
            matches!(kind, FragmentKind::Text | FragmentKind::FrameAtom),
            "inline fragments only"
        );
        let revision = self.bump_revision();
        let (block_index, _) = self.blocks.find(pos);
        self.fragments.insert(
            pos,
            Fragment {
                buffer_pos,
                len,
                format,
                kind,
            },
            kind == FragmentKind::Text,
        );
        self.blocks.grow(block_index, len, revision);
        self.cursors.adjust_for_insert(pos, len, op);
        self.objects.adjust_for_insert(pos, len);
        if kind == FragmentKind::FrameAtom {
            self.relink_atom(pos, format);
        }
        self.record(UndoCommand::Inserted {
            pos,
            buffer_pos,
            len,
            format,
            kind,
            op,
        });
        self.note_change(pos, 0, len);
    }

    /// Puts an atomic frame back into the tree at its character's position.
    fn relink_atom(&mut self, pos: usize, char_format: FormatIndex) {
        let Some(object) = self.formats.char_format(char_format).object_index else {
            debug_assert!(false, "inline object without an object index");
            return;
        };
        {
            let frame = self.objects.frame_mut(object);
            frame.begin = Some(pos);
            frame.end = Some(pos);
        }
        let parent = self.objects.frame_for_insert(pos);
        self.objects.link(object, parent);
    }

    /// Inserts a block boundary character of the given kind at `pos`.
    fn insert_block_raw(
        &mut self,
        pos: usize,
        buffer_pos: usize,
        block_format: FormatIndex,
        char_format: FormatIndex,
        kind: FragmentKind,
        op: Operation,
    ) {
        debug_assert!(kind.is_block_boundary(), "not a block boundary kind");
        let revision = self.bump_revision();
        let (block_index, block_start) = self.blocks.find(pos);
        let old_len = self.blocks.get(block_index).len;
        let head_len = pos - block_start + 1;
        let tail_len = old_len - (pos - block_start);
        self.fragments.insert(
            pos,
            Fragment {
                buffer_pos,
                len: 1,
                format: char_format,
                kind,
            },
            false,
        );
        let tail_id = self.blocks.allocate_id();
        self.blocks.update(block_index, |b| {
            b.len = head_len;
            b.revision = revision;
        });
        self.blocks.insert_entry(
            block_index + 1,
            Block {
                id: tail_id,
                len: tail_len,
                format: block_format,
                revision,
            },
        );
        self.cursors.adjust_for_insert(pos, 1, op);
        self.objects.adjust_for_insert(pos, 1);
        if let Some(list) = self.formats.block_format(block_format).object_index {
            self.list_add(list, tail_id);
        }
        let command = match kind {
            FragmentKind::Separator => UndoCommand::BlockInserted {
                pos,
                buffer_pos,
                block_format,
                char_format,
                op,
            },
            _ => UndoCommand::BlockAdded {
                pos,
                buffer_pos,
                block_format,
                char_format,
                kind,
                op,
            },
        };
        self.record(command);
        self.note_change(pos, 0, 1);
    }

    /// Removes the block boundary character at `pos`, merging its block into
    /// the following one. The merged block keeps the first block's identity
    /// and format.
    fn remove_block_boundary(&mut self, pos: usize, op: Operation) {
        let revision = self.bump_revision();
        let (index, start) = self
            .fragments
            .find(pos)
            .expect("boundary position out of bounds");
        let fragment = *self.fragments.get(index);
        debug_assert!(start == pos, "boundary fragments are one character");
        debug_assert!(fragment.kind.is_block_boundary(), "not a block boundary");
        let (head_index, _) = self.blocks.find(pos);
        let head_len = self.blocks.get(head_index).len;
        self.fragments.remove_span(pos, 1);
        let dead = self.blocks.remove_entry(head_index + 1);
        self.blocks.update(head_index, |b| {
            b.len = head_len - 1 + dead.len;
            b.revision = revision;
        });
        self.cursors.adjust_for_remove(pos, 1);
        self.objects.adjust_for_remove(pos, 1);
        if let Some(list) = self.formats.block_format(dead.format).object_index {
            self.list_remove(list, dead.id);
        }
        if fragment.kind != FragmentKind::Separator {
            if let Some(object) = self.formats.char_format(fragment.format).object_index {
                self.objects.sentinel_removed(object, fragment.kind);
            } else {
                debug_assert!(false, "sentinel without an object index");
            }
        }
        self.unite_at(pos);
        let command = match fragment.kind {
            FragmentKind::Separator => UndoCommand::BlockRemoved {
                pos,
                buffer_pos: fragment.buffer_pos,
                block_format: dead.format,
                char_format: fragment.format,
                op,
            },
            _ => UndoCommand::BlockDeleted {
                pos,
                buffer_pos: fragment.buffer_pos,
                block_format: dead.format,
                char_format: fragment.format,
                kind: fragment.kind,
                op,
            },
        };
        self.record(command);
        self.note_change(pos, 1, 0);
    }

    fn remove_text_span(&mut self, pos: usize, len: usize, op: Operation) {
        let revision = self.bump_revision();
        let fragment = self.fragments.remove_span(pos, len);
        let (block_index, _) = self.blocks.find(pos);
        self.blocks.shrink(block_index, len, revision);
        self.cursors.adjust_for_remove(pos, len);
        self.objects.adjust_for_remove(pos, len);
        self.unite_at(pos);
        self.record(UndoCommand::Removed {
            pos,
            buffer_pos: fragment.buffer_pos,
            len,
            format: fragment.format,
            kind: FragmentKind::Text,
            op,
        });
        self.note_change(pos, len, 0);
    }

    fn remove_atom(&mut self, pos: usize, op: Operation) {
        let revision = self.bump_revision();
        let fragment = self.fragments.remove_span(pos, 1);
        let (block_index, _) = self.blocks.find(pos);
        self.blocks.shrink(block_index, 1, revision);
        self.cursors.adjust_for_remove(pos, 1);
        self.objects.adjust_for_remove(pos, 1);
        if let Some(object) = self.formats.char_format(fragment.format).object_index {
            self.objects.sentinel_removed(object, FragmentKind::FrameAtom);
        }
        self.unite_at(pos);
        self.record(UndoCommand::Removed {
            pos,
            buffer_pos: fragment.buffer_pos,
            len: 1,
            format: fragment.format,
            kind: FragmentKind::FrameAtom,
            op,
        });
        self.note_change(pos, 1, 0);
    }

    /// Merges the text fragments meeting at `pos` if the buffer allows.
    ///
    /// Removing a later insertion leaves its neighbors buffer-adjacent
    /// again; uniting them restores the pre-insertion fragment structure.
    fn unite_at(&mut self, pos: usize) {
        if pos == 0 {
            return;
        }
        if let Some((index, _)) = self.fragments.find(pos - 1) {
            self.fragments.try_unite(index);
        }
    }

    /// Merges equal neighboring text fragments across `[from, to]`.
    fn unite_range(&mut self, from: usize, to: usize) {
        let mut index = if from == 0 {
            0
        } else {
            match self.fragments.find(from - 1) {
                Some((index, _)) => index,
                None => return,
            }
        };
        while index + 1 < self.fragments.count() {
            let boundary = self.fragments.position_of(index + 1);
            if boundary > to {
                break;
            }
            if !self.fragments.try_unite(index) {
                index += 1;
            }
        }
    }

    /// Swaps in a new format on an object, returning the previous one and
    /// propagating the side effects shared by do and undo paths.
    fn apply_object_format(&mut self, object: ObjectIndex, new_index: FormatIndex) -> FormatIndex {
        let old = match self.objects.get_mut(object) {
            Some(DocObject::Frame(f)) => core::mem::replace(&mut f.format, new_index),
            Some(DocObject::Table(t)) => core::mem::replace(&mut t.frame.format, new_index),
            Some(DocObject::List(l)) => core::mem::replace(&mut l.format, new_index),
            None => {
                debug_assert!(false, "formatting a deleted object");
                return new_index;
            }
        };
        if old == new_index {
            return old;
        }
        let revision = self.bump_revision();
        // Cell span changes reshape the owning table's grid.
        if let Some(DocObject::Table(_)) = self.objects.get(object) {
            self.refresh_table_grid(object);
        } else if let Some(parent) = self
            .objects
            .get(object)
            .and_then(DocObject::as_frame)
            .and_then(Frame::parent)
        {
            if matches!(self.objects.get(parent), Some(DocObject::Table(_))) {
                self.refresh_table_grid(parent);
            }
        }
        match self.objects.get(object) {
            Some(DocObject::List(_)) => {
                let members = self.list_blocks(object);
                for id in members {
                    if let Some(index) = self.blocks.index_of(id) {
                        let block_pos = self.blocks.position_of(index);
                        let block_len = self.blocks.get(index).len;
                        self.blocks.update(index, |b| b.revision = revision);
                        self.note_change(block_pos, block_len, block_len);
                    }
                }
            }
            _ => {
                if let Some(range) = self.frame_range(object) {
                    let len = range.end - range.start;
                    self.touch_blocks(range.start, len, revision);
                    self.note_change(range.start, len, len);
                }
            }
        }
        old
    }

    /// Rebuilds a table's slot grid from its cells' span formats.
    fn refresh_table_grid(&mut self, table: ObjectIndex) {
        let Some(DocObject::Table(t)) = self.objects.get(table) else {
            return;
        };
        let spans: Vec<(usize, usize)> = t
            .cells
            .iter()
            .map(|&cell| {
                let format = self.formats.frame_format(self.objects.frame(cell).format);
                (format.row_span_or_default(), format.column_span_or_default())
            })
            .collect();
        if let Some(DocObject::Table(t)) = self.objects.get_mut(table) {
            t.rebuild_grid(&spans);
        }
    }

    fn push_sentinel_block(&mut self, at: &mut usize, char_format: FormatIndex, kind: FragmentKind) {
        let c = match kind {
            FragmentKind::FrameBegin => FRAME_BEGIN_CHAR,
            FragmentKind::FrameEnd => FRAME_END_CHAR,
            _ => unreachable!("sentinel kinds only"),
        };
        self.buffer.push(c);
        let buffer_pos = self.buffer.len() - 1;
        self.insert_block_raw(
            *at,
            buffer_pos,
            self.default_block,
            char_format,
            kind,
            Operation::MoveCursor,
        );
        *at += 1;
    }

    fn update_list_membership(&mut self, id: BlockId, old: FormatIndex, new: FormatIndex) {
        let old_list = self.formats.block_format(old).object_index;
        let new_list = self.formats.block_format(new).object_index;
        if old_list == new_list {
            return;
        }
        if let Some(list) = old_list {
            self.list_remove(list, id);
        }
        if let Some(list) = new_list {
            self.list_add(list, id);
        }
    }

    fn list_add(&mut self, list: ObjectIndex, id: BlockId) {
        if let Some(DocObject::List(l)) = self.objects.get_mut(list) {
            l.add_block(id);
        }
    }

    fn list_remove(&mut self, list: ObjectIndex, id: BlockId) {
        if let Some(DocObject::List(l)) = self.objects.get_mut(list) {
            l.remove_block(id);
        }
    }

    /// Re-establishes a frame sentinel restored by undo, relinking the frame
    /// once both endpoints are back.
    fn restore_sentinel(&mut self, char_format: FormatIndex, kind: FragmentKind, pos: usize) {
        let Some(object) = self.formats.char_format(char_format).object_index else {
            debug_assert!(false, "sentinel without an object index");
            return;
        };
        {
            let frame = self.objects.frame_mut(object);
            match kind {
                FragmentKind::FrameBegin => frame.begin = Some(pos),
                FragmentKind::FrameEnd => frame.end = Some(pos),
                _ => debug_assert!(false, "not a sentinel kind"),
            }
        }
        let frame = self.objects.frame(object);
        if let (Some(begin), Some(_)) = (frame.begin(), frame.end()) {
            if frame.parent().is_none() {
                let parent = self.objects.frame_for_insert(begin);
                self.objects.link(object, parent);
                self.objects.adopt_children(object, parent);
            }
        }
    }

    /// Applies the inverse of a logged command (the undo direction).
    fn apply_inverse(&mut self, command: &mut UndoCommand) {
        match command {
            UndoCommand::Inserted { pos, len, op, .. } => {
                self.remove_with(*pos, *len, *op);
            }
            UndoCommand::Removed {
                pos,
                buffer_pos,
                len,
                format,
                kind,
                op,
            } => {
                self.insert_inline(*pos, *buffer_pos, *len, *format, *kind, *op);
            }
            UndoCommand::CharFormatChanged { pos, len, format } => {
                *format = self.replay_char_format(*pos, *len, *format);
            }
            UndoCommand::BlockFormatChanged { pos, format } => {
                *format = self.replay_block_format(*pos, *format);
            }
            UndoCommand::BlockInserted { pos, op, .. } => {
                self.remove_block_boundary(*pos, *op);
            }
            UndoCommand::BlockRemoved {
                pos,
                buffer_pos,
                block_format,
                char_format,
                op,
            } => {
                self.insert_block_raw(
                    *pos,
                    *buffer_pos,
                    *block_format,
                    *char_format,
                    FragmentKind::Separator,
                    *op,
                );
            }
            UndoCommand::BlockAdded { pos, op, .. } => {
                self.remove_block_boundary(*pos, *op);
            }
            UndoCommand::BlockDeleted {
                pos,
                buffer_pos,
                block_format,
                char_format,
                kind,
                op,
            } => {
                self.insert_block_raw(*pos, *buffer_pos, *block_format, *char_format, *kind, *op);
                self.restore_sentinel(*char_format, *kind, *pos);
            }
            UndoCommand::GroupFormatChanged { object, format } => {
                *format = self.apply_object_format(*object, *format);
            }
            UndoCommand::Custom(item) => item.undo(),
        }
    }

    /// Re-applies a logged command (the redo direction).
    fn apply_forward(&mut self, command: &mut UndoCommand) {
        match command {
            UndoCommand::Inserted {
                pos,
                buffer_pos,
                len,
                format,
                kind,
                op,
            } => {
                self.insert_inline(*pos, *buffer_pos, *len, *format, *kind, *op);
            }
            UndoCommand::Removed { pos, len, op, .. } => {
                self.remove_with(*pos, *len, *op);
            }
            UndoCommand::CharFormatChanged { pos, len, format } => {
                *format = self.replay_char_format(*pos, *len, *format);
            }
            UndoCommand::BlockFormatChanged { pos, format } => {
                *format = self.replay_block_format(*pos, *format);
            }
            UndoCommand::BlockInserted {
                pos,
                buffer_pos,
                block_format,
                char_format,
                op,
            } => {
                self.insert_block_raw(
                    *pos,
                    *buffer_pos,
                    *block_format,
                    *char_format,
                    FragmentKind::Separator,
                    *op,
                );
            }
            UndoCommand::BlockRemoved { pos, op, .. } => {
                self.remove_block_boundary(*pos, *op);
            }
            UndoCommand::BlockAdded {
                pos,
                buffer_pos,
                block_format,
                char_format,
                kind,
                op,
            } => {
                self.insert_block_raw(*pos, *buffer_pos, *block_format, *char_format, *kind, *op);
                self.restore_sentinel(*char_format, *kind, *pos);
            }
            UndoCommand::BlockDeleted { pos, op, .. } => {
                self.remove_block_boundary(*pos, *op);
            }
            UndoCommand::GroupFormatChanged { object, format } => {
                *format = self.apply_object_format(*object, *format);
            }
            UndoCommand::Custom(item) => item.redo(),
        }
    }

    /// Sets the character format of `[pos, pos + len)` to `stored`,
    /// returning the format it replaced. The range is format-uniform at
    /// replay time.
    fn replay_char_format(&mut self, pos: usize, len: usize, stored: FormatIndex) -> FormatIndex {
        let revision = self.bump_revision();
        self.fragments.split_at(pos);
        self.fragments.split_at(pos + len);
        let (mut index, _) = self
            .fragments
            .find(pos)
            .expect("format replay range out of bounds");
        let mut covered = 0;
        let mut replaced = None;
        while covered < len {
            let fragment = *self.fragments.get(index);
            debug_assert!(
                replaced.is_none() || replaced == Some(fragment.format),
                "format replay range must be uniform"
            );
            replaced = Some(fragment.format);
            self.fragments.set_format(index, stored);
            covered += fragment.len;
            index += 1;
        }
        self.unite_range(pos, pos + len);
        self.touch_blocks(pos, len, revision);
        self.note_change(pos, len, len);
        replaced.unwrap_or(stored)
    }

    /// Sets the format of the block at `pos` to `stored`, returning the
    /// format it replaced.
    fn replay_block_format(&mut self, pos: usize, stored: FormatIndex) -> FormatIndex {
        let revision = self.bump_revision();
        let (index, block_pos) = self.blocks.find(pos);
        let block = *self.blocks.get(index);
        self.blocks.update(index, |b| {
            b.format = stored;
            b.revision = revision;
        });
        self.update_list_membership(block.id, block.format, stored);
        self.note_change(block_pos, block.len, block.len);
        block.format
    }
}

impl<B: Brush> Default for Document<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// A lightweight handle to one block of a document.
#[derive(Copy, Clone, Debug)]
pub struct BlockRef<'a, B: Brush> {
    doc: &'a Document<B>,
    index: usize,
    start: usize,
}

impl<'a, B: Brush> BlockRef<'a, B> {
    /// Stable id of the block.
    pub fn id(&self) -> BlockId {
        self.doc.blocks.get(self.index).id
    }

    /// First position of the block.
    pub fn position(&self) -> usize {
        self.start
    }

    /// Positions covered, including the terminating character if any.
    pub fn len(&self) -> usize {
        self.doc.blocks.get(self.index).len
    }

    /// Returns `true` for an empty block (only the final block can be).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions covered by content, excluding the terminator.
    pub fn content_len(&self) -> usize {
        let len = self.len();
        if self.is_terminated() {
            len - 1
        } else {
            len
        }
    }

    /// Whether the block ends in a separator or sentinel. Only the final
    /// block does not.
    pub fn is_terminated(&self) -> bool {
        self.index + 1 < self.doc.blocks.count()
    }

    /// The block's format index.
    pub fn format_index(&self) -> FormatIndex {
        self.doc.blocks.get(self.index).format
    }

    /// The block's format.
    pub fn format(&self) -> &'a BlockFormat<B> {
        self.doc.formats.block_format(self.format_index())
    }

    /// Character format of the block's terminator, or the document default
    /// for the final block.
    pub fn char_format_index(&self) -> FormatIndex {
        if !self.is_terminated() {
            return self.doc.default_char;
        }
        let terminator = self.start + self.len() - 1;
        match self.doc.fragments.find(terminator) {
            Some((index, _)) => self.doc.fragments.get(index).format,
            None => self.doc.default_char,
        }
    }

    /// Revision of the last edit that touched this block.
    pub fn revision(&self) -> u64 {
        self.doc.blocks.get(self.index).revision
    }

    /// The list or block group this block belongs to, if any.
    pub fn object_index(&self) -> Option<ObjectIndex> {
        self.format().object_index
    }

    /// The block's text. Inline objects read as U+FFFC; the terminator is
    /// not included.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.content_len());
        for run in self.runs() {
            match run.kind {
                FragmentKind::Text => {
                    let fragment_start = run.buffer_pos;
                    let chars = &self.doc.buffer[fragment_start..fragment_start + run.range.len()];
                    text.extend(chars.iter().copied());
                }
                _ => text.push(OBJECT_CHAR),
            }
        }
        text
    }

    /// Iterates the block's content as format-uniform runs.
    pub fn runs(&self) -> TextRuns<'a, B> {
        TextRuns {
            doc: self.doc,
            iter: self.doc.fragments.iter_from(self.start),
            remaining: self.content_len(),
            local: 0,
        }
    }

    /// The block after this one.
    pub fn next(&self) -> Option<BlockRef<'a, B>> {
        let index = self.index + 1;
        if index >= self.doc.blocks.count() {
            return None;
        }
        Some(BlockRef {
            doc: self.doc,
            index,
            start: self.start + self.len(),
        })
    }

    /// The block before this one.
    pub fn previous(&self) -> Option<BlockRef<'a, B>> {
        let index = self.index.checked_sub(1)?;
        Some(BlockRef {
            doc: self.doc,
            index,
            start: self.start - self.doc.blocks.get(index).len,
        })
    }
}

/// One format-uniform run of a block's content.
#[derive(Clone, Debug)]
pub struct TextRun {
    /// Range in block-local content offsets.
    pub range: Range<usize>,
    /// Offset of the run in the document's character buffer.
    pub buffer_pos: usize,
    /// Interned character format of the run.
    pub format: FormatIndex,
    /// Role of the run's characters.
    pub kind: FragmentKind,
}

/// Iterator over a block's content runs.
#[derive(Debug)]
pub struct TextRuns<'a, B: Brush> {
    doc: &'a Document<B>,
    iter: crate::tree::Iter<'a, Fragment>,
    remaining: usize,
    local: usize,
}

impl<B: Brush> Iterator for TextRuns<'_, B> {
    type Item = TextRun;

    fn next(&mut self) -> Option<TextRun> {
        if self.remaining == 0 {
            return None;
        }
        let (_, _, fragment) = self.iter.next()?;
        debug_assert!(
            fragment.len <= self.remaining,
            "content runs must not cross the block terminator"
        );
        let run = TextRun {
            range: self.local..self.local + fragment.len,
            buffer_pos: fragment.buffer_pos,
            format: fragment.format,
            kind: fragment.kind,
        };
        self.local += fragment.len;
        self.remaining -= fragment.len;
        Some(run)
    }
}

/// Iterator over all blocks of a document.
#[derive(Debug)]
pub struct Blocks<'a, B: Brush> {
    doc: &'a Document<B>,
    next: usize,
}

impl<'a, B: Brush> Iterator for Blocks<'a, B> {
    type Item = BlockRef<'a, B>;

    fn next(&mut self) -> Option<BlockRef<'a, B>> {
        if self.next >= self.doc.blocks.count() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(BlockRef {
            doc: self.doc,
            index,
            start: self.doc.blocks.position_of(index),
        })
    }
}

/// One item of a frame's content.
#[derive(Debug)]
pub enum FrameContent<'a, B: Brush> {
    /// A child frame (or table).
    Frame(ObjectIndex),
    /// A block belonging directly to the frame.
    Block(BlockRef<'a, B>),
}

/// Iterator over a frame's content, alternating child frames and blocks.
///
/// Blocks that exist purely to carry a child frame's opening sentinel are
/// skipped; the child frame is yielded in their place.
#[derive(Debug)]
pub struct FrameIter<'a, B: Brush> {
    doc: &'a Document<B>,
    /// Index of the next block to consider.
    next: usize,
    /// One past the last content block.
    limit: usize,
    /// A child frame discovered at the end of the previous block.
    pending: Option<ObjectIndex>,
}

impl<'a, B: Brush> Iterator for FrameIter<'a, B> {
    type Item = FrameContent<'a, B>;

    fn next(&mut self) -> Option<FrameContent<'a, B>> {
        if let Some(child) = self.pending.take() {
            self.skip_past(child);
            return Some(FrameContent::Frame(child));
        }
        if self.next >= self.limit {
            return None;
        }
        let index = self.next;
        let start = self.doc.blocks.position_of(index);
        let len = self.doc.blocks.get(index).len;
        // A block holding nothing but a child's opening sentinel is pure
        // structure: yield the child instead.
        if len == 1 {
            if let Some(child) = self.child_beginning_at(start) {
                self.skip_past(child);
                return Some(FrameContent::Frame(child));
            }
        }
        self.next = index + 1;
        if len > 1 {
            if let Some(child) = self.child_beginning_at(start + len - 1) {
                self.pending = Some(child);
            }
        }
        Some(FrameContent::Block(BlockRef {
            doc: self.doc,
            index,
            start,
        }))
    }
}

impl<B: Brush> FrameIter<'_, B> {
    /// The child frame whose opening sentinel sits at `pos`, if any.
    fn child_beginning_at(&self, pos: usize) -> Option<ObjectIndex> {
        let (index, _) = self.doc.fragments.find(pos)?;
        let fragment = self.doc.fragments.get(index);
        if fragment.kind != FragmentKind::FrameBegin {
            return None;
        }
        self.doc.formats.char_format(fragment.format).object_index
    }

    /// Advances past a child frame's closing sentinel.
    fn skip_past(&mut self, child: ObjectIndex) {
        let Some(end) = self.doc.objects.frame(child).end() else {
            debug_assert!(false, "iterated child frame is unlinked");
            self.next = self.limit;
            return;
        };
        // The closing sentinel terminates its block, so `end + 1` is a block
        // start (or the end of the document, which names the final block).
        self.next = self.doc.blocks.find(end + 1).0;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::style::{Alignment, FontStyle, FontWeight, ListFormat, ListStyle};

    fn doc() -> Document<u8> {
        Document::new()
    }

    fn doc_with(text: &str) -> Document<u8> {
        let mut d = doc();
        let format = d.default_char_format();
        d.insert(0, text, format);
        d
    }

    fn bold<B: Brush>() -> CharFormat<B> {
        CharFormat {
            font_weight: Some(FontWeight::BOLD),
            ..CharFormat::default()
        }
    }

    fn block_texts(d: &Document<u8>) -> Vec<String> {
        d.blocks().map(|b| b.text()).collect()
    }

    #[test]
    fn an_empty_document_has_one_empty_block() {
        let d = doc();
        assert_eq!(d.len(), 0);
        assert_eq!(d.block_count(), 1);
        assert_eq!(d.fragment_count(), 0);
        assert_eq!(d.plain_text(), "");
        assert!(!d.is_modified());
    }

    #[test]
    fn inserted_text_reads_back() {
        let d = doc_with("Hello");
        assert_eq!(d.len(), 5);
        assert_eq!(d.plain_text(), "Hello");
        assert_eq!(d.char_at(1), 'e');
        assert_eq!(d.block_at(0).text(), "Hello");
        assert_eq!(d.fragment_count(), 1);
    }

    #[test]
    fn adjacent_same_format_inserts_unite() {
        let mut d = doc_with("Hel");
        let format = d.default_char_format();
        d.insert(3, "lo", format);
        assert_eq!(d.plain_text(), "Hello");
        assert_eq!(d.fragment_count(), 1);
    }

    #[test]
    fn newlines_split_blocks() {
        let d = doc_with("a\nbc\n");
        assert_eq!(d.block_count(), 3);
        assert_eq!(block_texts(&d), ["a", "bc", ""]);
        assert_eq!(d.block_at(0).len(), 2);
        assert_eq!(d.block_at(2).len(), 3);
        assert_eq!(d.block_at(5).len(), 0);
        assert_eq!(d.plain_text(), "a\nbc\n");
    }

    #[test]
    fn blocks_are_reachable_by_number_and_neighbor() {
        let d = doc_with("a\nbc\n");
        assert_eq!(d.first_block().text(), "a");
        assert_eq!(d.last_block().text(), "");
        assert_eq!(d.block_by_number(1).map(|b| b.text()), Some("bc".into()));
        assert!(d.block_by_number(3).is_none());
        let middle = d.first_block().next().unwrap();
        assert_eq!(middle.text(), "bc");
        assert_eq!(middle.previous().unwrap().position(), 0);
        assert!(d.first_block().previous().is_none());
    }

    #[test]
    fn splitting_a_block_keeps_the_head_identity() {
        let mut d = doc_with("hello");
        let head_id = d.block_at(0).id();
        let tail_format = d.intern_block_format(BlockFormat {
            alignment: Some(Alignment::Middle),
            ..BlockFormat::default()
        });
        let char_format = d.default_char_format();
        d.insert_block(2, tail_format, char_format);
        assert_eq!(d.block_count(), 2);
        assert_eq!(d.block_at(0).id(), head_id);
        assert_eq!(d.block_at(0).text(), "he");
        let tail = d.block_at(3);
        assert_eq!(tail.text(), "llo");
        assert_eq!(tail.format_index(), tail_format);
        assert_ne!(tail.id(), head_id);
    }

    #[test]
    fn removing_a_separator_merges_into_the_first_block() {
        let mut d = doc_with("ab\ncd");
        let first = d.block_at(0);
        let first_id = first.id();
        let second_id = d.block_at(3).id();
        d.remove(2, 1);
        assert_eq!(d.block_count(), 1);
        assert_eq!(d.plain_text(), "abcd");
        assert_eq!(d.block_at(0).id(), first_id);
        assert!(d.block_by_id(second_id).is_none());
    }

    #[test]
    fn removal_inside_a_fragment_splits_it() {
        let mut d = doc_with("abcdef");
        d.remove(2, 2);
        assert_eq!(d.plain_text(), "abef");
        // The surviving halves are not buffer-adjacent anymore.
        assert_eq!(d.fragment_count(), 2);
    }

    #[test]
    fn registered_cursors_follow_edits() {
        let mut d = doc_with("hello");
        let cursor = d.register_cursor(3);
        let format = d.default_char_format();
        d.insert(1, "xx", format);
        assert_eq!(d.cursor_position(cursor), 5);
        d.remove(4, 3);
        assert_eq!(d.cursor_position(cursor), 4);
        d.remove(0, 4);
        assert_eq!(d.cursor_position(cursor), 0);
        d.deregister_cursor(cursor);
    }

    #[test]
    fn undo_and_redo_walk_the_log() {
        let mut d = doc_with("hello world");
        d.remove(5, 6);
        assert_eq!(d.plain_text(), "hello");
        assert!(d.undo());
        assert_eq!(d.plain_text(), "hello world");
        assert!(d.undo());
        assert_eq!(d.plain_text(), "");
        assert_eq!(d.fragment_count(), 0);
        assert!(!d.undo());
        assert!(d.redo());
        assert!(d.redo());
        assert_eq!(d.plain_text(), "hello");
        assert!(!d.redo());
    }

    #[test]
    fn consecutive_typing_coalesces_into_one_step() {
        let mut d = doc();
        let format = d.default_char_format();
        for (i, c) in ["H", "e", "l", "l", "o"].iter().enumerate() {
            d.insert(i, c, format);
        }
        assert_eq!(d.available_undo_steps(), 1);
        assert!(d.undo());
        assert_eq!(d.plain_text(), "");
        assert!(d.redo());
        assert_eq!(d.plain_text(), "Hello");
    }

    #[test]
    fn backspacing_coalesces_into_one_step() {
        let mut d = doc_with("abc");
        d.remove(2, 1);
        d.remove(1, 1);
        d.remove(0, 1);
        assert_eq!(d.available_undo_steps(), 2);
        assert!(d.undo());
        assert_eq!(d.plain_text(), "abc");
    }

    #[test]
    fn edit_blocks_undo_as_one_step() {
        let mut d = doc_with("abcdef");
        d.begin_edit_block();
        let format = d.default_char_format();
        d.insert(6, "!", format);
        d.remove(0, 1);
        d.end_edit_block();
        assert_eq!(d.plain_text(), "bcdef!");
        assert!(d.undo());
        assert_eq!(d.plain_text(), "abcdef");
        assert!(d.redo());
        assert_eq!(d.plain_text(), "bcdef!");
    }

    #[test]
    fn join_previous_extends_the_last_group() {
        let mut d = doc();
        let format = d.default_char_format();
        d.begin_edit_block();
        d.insert(0, "one", format);
        d.end_edit_block();
        d.join_previous_edit_block();
        d.insert(3, " half", format);
        d.end_edit_block();
        assert!(d.undo());
        assert_eq!(d.plain_text(), "");
    }

    #[test]
    fn char_format_change_splits_and_undo_heals() {
        let mut d = doc_with("abcdef");
        assert_eq!(d.fragment_count(), 1);
        d.set_char_format(2, 2, &bold(), FormatChangeMode::Merge);
        assert_eq!(d.fragment_count(), 3);
        let runs: Vec<_> = d.block_at(0).runs().collect();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].range, 2..4);
        assert_eq!(
            d.formats().char_format(runs[1].format).font_weight,
            Some(FontWeight::BOLD)
        );
        assert!(d.undo());
        // The pieces come from one buffer run, so they merge back together.
        assert_eq!(d.fragment_count(), 1);
        assert!(d.redo());
        assert_eq!(d.fragment_count(), 3);
    }

    #[test]
    fn merge_layers_attributes_and_set_replaces_them() {
        let mut d = doc_with("ab");
        d.set_char_format(
            0,
            2,
            &CharFormat {
                font_style: Some(FontStyle::Italic),
                ..CharFormat::default()
            },
            FormatChangeMode::Merge,
        );
        d.set_char_format(0, 2, &bold(), FormatChangeMode::Merge);
        let merged = d.formats().char_format(d.block_at(0).runs().next().unwrap().format);
        assert_eq!(merged.font_style, Some(FontStyle::Italic));
        assert_eq!(merged.font_weight, Some(FontWeight::BOLD));
        d.set_char_format(0, 2, &bold(), FormatChangeMode::Set);
        let set = d.formats().char_format(d.block_at(0).runs().next().unwrap().format);
        assert_eq!(set.font_style, None);
        assert_eq!(set.font_weight, Some(FontWeight::BOLD));
    }

    #[test]
    fn block_format_changes_are_undoable() {
        let mut d = doc_with("one\ntwo");
        let centered = BlockFormat {
            alignment: Some(Alignment::Middle),
            ..BlockFormat::default()
        };
        d.set_block_format(0, d.len(), &centered, FormatChangeMode::Merge);
        assert_eq!(d.block_at(0).format().alignment, Some(Alignment::Middle));
        assert_eq!(d.block_at(5).format().alignment, Some(Alignment::Middle));
        assert!(d.undo());
        assert_eq!(d.block_at(0).format().alignment, None);
        assert_eq!(d.block_at(5).format().alignment, None);
    }

    #[test]
    fn modified_tracks_the_clean_log_position() {
        let mut d = doc();
        assert!(!d.is_modified());
        let format = d.default_char_format();
        d.insert(0, "a", format);
        assert!(d.is_modified());
        assert!(d.undo());
        assert!(!d.is_modified());
        assert!(d.redo());
        d.set_modified(false);
        assert!(!d.is_modified());
        assert!(d.undo());
        assert!(d.is_modified());
    }

    #[test]
    fn frames_wrap_ranges_in_sentinels() {
        let mut d = doc_with("abcdef");
        let frame = d.insert_frame(2, 4, FrameFormat::default()).unwrap();
        assert_eq!(d.len(), 8);
        assert_eq!(d.plain_text(), "ab\ncd\nef");
        assert_eq!(d.frame_range(frame), Some(2..6));
        assert_eq!(d.frame_at(3), frame);
        assert_eq!(d.frame_at(7), d.root_frame());
        let content: Vec<String> = d
            .frame_content(frame)
            .map(|item| match item {
                FrameContent::Block(b) => b.text(),
                FrameContent::Frame(_) => panic!("no nested frames here"),
            })
            .collect();
        assert_eq!(content, ["cd"]);
    }

    #[test]
    fn root_iteration_interleaves_blocks_and_frames() {
        let mut d = doc_with("abcdef");
        let frame = d.insert_frame(2, 4, FrameFormat::default()).unwrap();
        let mut items = Vec::new();
        for item in d.frame_content(d.root_frame()) {
            match item {
                FrameContent::Block(b) => items.push(b.text()),
                FrameContent::Frame(f) => {
                    assert_eq!(f, frame);
                    items.push(String::from("<frame>"));
                }
            }
        }
        assert_eq!(items, ["ab", "<frame>", "ef"]);
    }

    #[test]
    fn crossing_frame_boundaries_is_rejected() {
        let mut d = doc_with("abcdefgh");
        d.insert_frame(2, 6, FrameFormat::default()).unwrap();
        let err = d.insert_frame(4, 9, FrameFormat::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrameNesting { start: 4, end: 9 });
    }

    #[test]
    fn wrapping_a_frame_adopts_it() {
        let mut d = doc_with("abcdef");
        let inner = d.insert_frame(2, 4, FrameFormat::default()).unwrap();
        let outer = d.insert_frame(0, 8, FrameFormat::default()).unwrap();
        assert_eq!(d.frame(inner).parent(), Some(outer));
        assert_eq!(d.frame(outer).parent(), Some(d.root_frame()));
        assert_eq!(d.frame(outer).children(), &[inner]);
    }

    #[test]
    fn removing_a_frame_keeps_its_content() {
        let mut d = doc_with("abcd");
        let frame = d.insert_frame(1, 3, FrameFormat::default()).unwrap();
        d.remove_frame(frame);
        assert_eq!(d.plain_text(), "abcd");
        assert_eq!(d.frame(frame).begin(), None);
        assert_eq!(d.frame_at(2), d.root_frame());
        assert!(d.undo());
        assert_eq!(d.plain_text(), "a\nbc\nd");
        assert_eq!(d.frame_range(frame), Some(1..5));
        assert_eq!(d.frame(frame).parent(), Some(d.root_frame()));
    }

    #[test]
    fn frame_undo_restores_text_and_tree() {
        let mut d = doc_with("abcdef");
        let frame = d.insert_frame(2, 4, FrameFormat::default()).unwrap();
        assert!(d.undo());
        assert_eq!(d.plain_text(), "abcdef");
        assert_eq!(d.block_count(), 1);
        assert_eq!(d.frame(frame).begin(), None);
        assert!(d.frame(d.root_frame()).children().is_empty());
        assert!(d.redo());
        assert_eq!(d.plain_text(), "ab\ncd\nef");
        assert_eq!(d.frame_range(frame), Some(2..6));
        assert_eq!(d.frame(frame).parent(), Some(d.root_frame()));
    }

    #[test]
    fn inline_objects_are_single_characters() {
        let mut d = doc_with("abcd");
        let image = d.insert_inline_object(
            2,
            FrameFormat {
                width: Some(32.0),
                height: Some(16.0),
                ..FrameFormat::default()
            },
            CharFormat {
                object_type: Some(7),
                ..CharFormat::default()
            },
        );
        assert_eq!(d.len(), 5);
        assert_eq!(d.char_at(2), '\u{FFFC}');
        assert_eq!(d.block_count(), 1);
        assert!(d.frame(image).is_atomic());
        assert_eq!(d.frame(image).parent(), Some(d.root_frame()));
        let runs: Vec<_> = d.block_at(0).runs().collect();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].kind, FragmentKind::FrameAtom);
        d.remove(2, 1);
        assert_eq!(d.plain_text(), "abcd");
        assert_eq!(d.frame(image).begin(), None);
        assert!(d.undo());
        assert_eq!(d.frame(image).begin(), Some(2));
        assert_eq!(d.frame(image).parent(), Some(d.root_frame()));
    }

    #[test]
    fn tables_build_a_cell_grid() {
        let mut d = doc();
        let table = d.insert_table(0, 2, 2, TableFormat::default());
        // Table begin + per-cell begin/end + table end.
        assert_eq!(d.len(), 10);
        assert_eq!(d.block_count(), 11);
        let t = d.table(table);
        assert_eq!(t.rows(), 2);
        assert_eq!(t.columns(), 2);
        let cells: Vec<ObjectIndex> = t.cells().to_vec();
        assert_eq!(cells.len(), 4);
        assert_eq!(t.cell_at(0, 0), cells[0]);
        assert_eq!(t.cell_at(0, 1), cells[1]);
        assert_eq!(t.cell_at(1, 0), cells[2]);
        assert_eq!(t.cell_at(1, 1), cells[3]);
        for &cell in &cells {
            assert_eq!(d.frame(cell).parent(), Some(table));
        }
    }

    #[test]
    fn table_cells_hold_text() {
        let mut d = doc();
        let table = d.insert_table(0, 1, 2, TableFormat::default());
        let format = d.default_char_format();
        let first = d.table(table).cell_at(0, 0);
        let begin = d.frame(first).begin().unwrap();
        d.insert(begin + 1, "left", format);
        let second = d.table(table).cell_at(0, 1);
        let begin = d.frame(second).begin().unwrap();
        d.insert(begin + 1, "right", format);
        let cell_text = |d: &Document<u8>, cell: ObjectIndex| -> String {
            d.frame_content(cell)
                .map(|item| match item {
                    FrameContent::Block(b) => b.text(),
                    FrameContent::Frame(_) => panic!("cells hold blocks"),
                })
                .collect()
        };
        assert_eq!(cell_text(&d, first), "left");
        assert_eq!(cell_text(&d, second), "right");
    }

    #[test]
    fn removing_a_table_span_restores_on_undo() {
        let mut d = doc_with("xy");
        let table = d.insert_table(1, 2, 2, TableFormat::default());
        let table_len = 2 + 2 * 4;
        assert_eq!(d.len(), 2 + table_len);
        d.begin_edit_block();
        d.remove(1, table_len);
        d.end_edit_block();
        assert_eq!(d.plain_text(), "xy");
        assert_eq!(d.block_count(), 1);
        assert_eq!(d.frame(table).begin(), None);
        assert!(d.undo());
        assert_eq!(d.len(), 2 + table_len);
        assert_eq!(d.frame_range(table), Some(1..1 + table_len));
        let t = d.table(table);
        assert_eq!(t.cell_at(1, 1), t.cells()[3]);
        for &cell in d.table(table).cells() {
            assert_eq!(d.frame(cell).parent(), Some(table));
        }
    }

    #[test]
    fn cell_spans_reshape_the_grid() {
        let mut d = doc();
        let table = d.insert_table(0, 2, 3, TableFormat::default());
        let corner = d.table(table).cell_at(0, 0);
        d.set_object_format(
            corner,
            Format::Frame(FrameFormat {
                row_span: Some(2),
                column_span: Some(2),
                ..FrameFormat::default()
            }),
        );
        let t = d.table(table);
        assert_eq!(t.cell_at(1, 1), corner);
        assert_ne!(t.cell_at(0, 2), corner);
        assert!(d.undo());
        let t = d.table(table);
        assert_ne!(t.cell_at(1, 1), corner);
    }

    #[test]
    fn lists_collect_blocks_in_document_order() {
        let mut d = doc_with("alpha\nbeta\ngamma");
        let list = d.create_object(Format::List(ListFormat {
            style: Some(ListStyle::Decimal),
            ..ListFormat::default()
        }));
        let member = BlockFormat {
            object_index: Some(list),
            ..BlockFormat::default()
        };
        // Join the last block first; document order must win regardless.
        d.set_block_format(11, 0, &member, FormatChangeMode::Merge);
        d.set_block_format(0, 0, &member, FormatChangeMode::Merge);
        let first = d.block_at(0).id();
        let third = d.block_at(11).id();
        assert_eq!(d.list_blocks(list), [first, third]);
        assert_eq!(d.list_item_number(list, third), Some(2));
        assert_eq!(d.list_item_number(list, d.block_at(6).id()), None);
        // Leaving the list is a block format change like any other.
        d.set_block_format(0, 0, &BlockFormat::default(), FormatChangeMode::Set);
        assert_eq!(d.list_blocks(list), [third]);
        assert!(d.undo());
        assert_eq!(d.list_blocks(list), [first, third]);
    }

    #[test]
    fn change_descriptions_fold_into_a_union() {
        let mut d = doc();
        let format = d.default_char_format();
        d.insert(0, "hello", format);
        assert_eq!(
            d.take_change(),
            Some(DocumentChange {
                from: 0,
                old_length: 0,
                length: 5
            })
        );
        assert_eq!(d.take_change(), None);
        d.insert(5, " world", format);
        d.remove(0, 1);
        // The union replaces the old [0, 5) with the new [0, 10).
        let change = d.take_change().unwrap();
        assert_eq!(change.from, 0);
        assert_eq!(change.old_length, 5);
        assert_eq!(change.length, 10);
    }

    #[test]
    fn disabling_undo_clears_the_log() {
        let mut d = doc_with("abc");
        assert!(d.is_undo_available());
        d.set_undo_enabled(false);
        assert!(!d.is_undo_available());
        assert!(!d.undo());
        let format = d.default_char_format();
        d.insert(3, "d", format);
        d.set_undo_enabled(true);
        assert!(!d.is_undo_available());
        assert_eq!(d.plain_text(), "abcd");
    }

    #[test]
    fn buffer_runs_can_be_reinserted_without_copying() {
        let mut d = doc_with("abcdef");
        // "cd" lives at buffer offsets 2..4; alias it at the end.
        let format = d.default_char_format();
        d.insert_buffer_range(6, 2..4, format);
        assert_eq!(d.plain_text(), "abcdefcd");
        assert_eq!(d.fragment_count(), 2);
    }
}
