// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cursor registry: positions that follow the text they sit in.

use alloc::vec::Vec;

/// Cursor-preservation behavior of an edit.
///
/// Chooses what happens to cursors sitting exactly at the edit position:
/// whether an insertion there pushes them after the new text or leaves them
/// in front of it. Undo replays an edit with the operation it was recorded
/// with.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum Operation {
    /// Cursors at the edit position move with the edit.
    #[default]
    MoveCursor,
    /// Cursors at the edit position stay put.
    KeepCursor,
}

/// Handle to a cursor registered with a document.
///
/// Handles are generational: after [`deregister`](crate::Document::deregister_cursor),
/// the handle goes stale and using it panics rather than silently reading a
/// recycled slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CursorId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug)]
struct Slot {
    position: usize,
    anchor: Option<usize>,
    generation: u32,
    live: bool,
}

/// All cursors currently registered with a document.
///
/// Every edit walks the registry once, so lookups stay O(1) and edits pay
/// O(cursors), which is how these are used in practice: few cursors, many
/// edits.
#[derive(Clone, Debug, Default)]
pub(crate) struct CursorRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl CursorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, position: usize) -> CursorId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.position = position;
            slot.anchor = None;
            slot.live = true;
            return CursorId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("cursor id space exhausted");
        self.slots.push(Slot {
            position,
            anchor: None,
            generation: 0,
            live: true,
        });
        CursorId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn deregister(&mut self, id: CursorId) {
        let slot = self.check_mut(id);
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    pub(crate) fn position(&self, id: CursorId) -> usize {
        self.check(id).position
    }

    pub(crate) fn set_position(&mut self, id: CursorId, position: usize) {
        self.check_mut(id).position = position;
    }

    pub(crate) fn anchor(&self, id: CursorId) -> Option<usize> {
        self.check(id).anchor
    }

    pub(crate) fn set_anchor(&mut self, id: CursorId, anchor: Option<usize>) {
        self.check_mut(id).anchor = anchor;
    }

    /// Shifts cursors for an insertion of `n` positions at `pos`.
    pub(crate) fn adjust_for_insert(&mut self, pos: usize, n: usize, op: Operation) {
        for slot in self.slots.iter_mut().filter(|slot| slot.live) {
            slot.position = shift_insert(slot.position, pos, n, op);
            slot.anchor = slot.anchor.map(|a| shift_insert(a, pos, n, op));
        }
    }

    /// Shifts cursors for a removal of `n` positions at `pos`.
    pub(crate) fn adjust_for_remove(&mut self, pos: usize, n: usize) {
        for slot in self.slots.iter_mut().filter(|slot| slot.live) {
            slot.position = shift_remove(slot.position, pos, n);
            slot.anchor = slot.anchor.map(|a| shift_remove(a, pos, n));
        }
    }

    fn check(&self, id: CursorId) -> &Slot {
        let slot = &self.slots[id.index as usize];
        assert!(
            slot.live && slot.generation == id.generation,
            "stale cursor id"
        );
        slot
    }

    fn check_mut(&mut self, id: CursorId) -> &mut Slot {
        let slot = &mut self.slots[id.index as usize];
        assert!(
            slot.live && slot.generation == id.generation,
            "stale cursor id"
        );
        slot
    }
}

fn shift_insert(position: usize, pos: usize, n: usize, op: Operation) -> usize {
    let moves = match op {
        Operation::MoveCursor => position >= pos,
        Operation::KeepCursor => position > pos,
    };
    if moves {
        position + n
    } else {
        position
    }
}

fn shift_remove(position: usize, pos: usize, n: usize) -> usize {
    if position >= pos + n {
        position - n
    } else if position > pos {
        // Inside the removed range: collapse to the removal point.
        pos
    } else {
        position
    }
}
