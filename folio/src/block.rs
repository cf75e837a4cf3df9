// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocks: the paragraph-level structure over the fragment sequence.

use crate::format::FormatIndex;
use crate::tree::{Iter, Span, SpanTree};

/// Stable identity of a block.
///
/// Ids survive edits to the block's content and position. A block that is
/// removed (for example by merging it into its predecessor) retires its id;
/// undoing the removal produces a fresh id.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    /// Returns the raw id value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// One block: a run of positions ending, except for the final block, in a
/// separator or frame sentinel character.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Block {
    pub(crate) id: BlockId,
    /// Positions covered, including the terminating character if any. Only
    /// the final block may be empty.
    pub(crate) len: usize,
    pub(crate) format: FormatIndex,
    /// Document revision of the last edit that touched this block.
    pub(crate) revision: u64,
}

impl Span for Block {
    fn span_len(&self) -> usize {
        self.len
    }
}

/// Ordered sequence of blocks partitioning the document.
///
/// The block map never goes empty: even a fresh document has one empty,
/// unterminated block.
#[derive(Clone, Debug)]
pub(crate) struct BlockMap {
    tree: SpanTree<Block>,
    next_id: u32,
}

impl BlockMap {
    /// Creates a map holding a single empty block with the given format.
    pub(crate) fn new(format: FormatIndex) -> Self {
        let mut map = Self {
            tree: SpanTree::new(),
            next_id: 0,
        };
        let id = map.allocate_id();
        map.tree.insert(
            0,
            Block {
                id,
                len: 0,
                format,
                revision: 0,
            },
        );
        map
    }

    pub(crate) fn allocate_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id = self.next_id.checked_add(1).expect("block id space exhausted");
        id
    }

    pub(crate) fn count(&self) -> usize {
        self.tree.count()
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    /// Finds the block containing `pos`, returning its index and start.
    ///
    /// The end-of-document position belongs to the final block.
    pub(crate) fn find(&self, pos: usize) -> (usize, usize) {
        debug_assert!(pos <= self.len(), "block lookup out of bounds");
        match self.tree.find(pos) {
            Some(hit) => hit,
            None => {
                let last = self.tree.count() - 1;
                (last, self.len() - self.tree.get(last).len)
            }
        }
    }

    pub(crate) fn get(&self, index: usize) -> &Block {
        self.tree.get(index)
    }

    pub(crate) fn position_of(&self, index: usize) -> usize {
        self.tree.position_of(index)
    }

    pub(crate) fn insert_entry(&mut self, index: usize, block: Block) {
        self.tree.insert(index, block);
    }

    pub(crate) fn remove_entry(&mut self, index: usize) -> Block {
        debug_assert!(self.count() > 1, "the last block cannot be removed");
        self.tree.remove(index)
    }

    pub(crate) fn update<R>(&mut self, index: usize, f: impl FnOnce(&mut Block) -> R) -> R {
        self.tree.update(index, f)
    }

    /// Grows the block at `index` by `n` positions and stamps `revision`.
    pub(crate) fn grow(&mut self, index: usize, n: usize, revision: u64) {
        self.tree.update(index, |block| {
            block.len += n;
            block.revision = revision;
        });
    }

    /// Shrinks the block at `index` by `n` positions and stamps `revision`.
    pub(crate) fn shrink(&mut self, index: usize, n: usize, revision: u64) {
        self.tree.update(index, |block| {
            debug_assert!(block.len >= n, "block shrink underflow");
            block.len -= n;
            block.revision = revision;
        });
    }

    /// Iterates blocks in order, yielding `(index, start, block)`.
    pub(crate) fn iter(&self) -> Iter<'_, Block> {
        self.tree.iter()
    }

    pub(crate) fn iter_from_index(&self, index: usize) -> Iter<'_, Block> {
        self.tree.iter_from_index(index)
    }

    /// Index of the block with the given id, scanning the whole map.
    pub(crate) fn index_of(&self, id: BlockId) -> Option<usize> {
        self.iter()
            .find_map(|(index, _, block)| (block.id == id).then_some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(lens: &[usize]) -> BlockMap {
        let mut map = BlockMap::new(FormatIndex(0));
        // Shape the initial empty block into the requested layout.
        map.grow(0, lens[0], 1);
        for (i, &len) in lens.iter().enumerate().skip(1) {
            let id = map.allocate_id();
            map.insert_entry(
                i,
                Block {
                    id,
                    len,
                    format: FormatIndex(0),
                    revision: 1,
                },
            );
        }
        map
    }

    #[test]
    fn starts_with_one_empty_block() {
        let map = BlockMap::new(FormatIndex(0));
        assert_eq!(map.count(), 1);
        assert_eq!(map.len(), 0);
        assert_eq!(map.find(0), (0, 0));
    }

    #[test]
    fn end_position_belongs_to_the_final_block() {
        let map = map_of(&[3, 4]);
        assert_eq!(map.find(6), (1, 3));
        assert_eq!(map.find(7), (1, 3));
    }

    #[test]
    fn end_position_reaches_a_trailing_empty_block() {
        // "ab\n" leaves an empty final block after the separator.
        let map = map_of(&[3, 0]);
        assert_eq!(map.find(2), (0, 0));
        assert_eq!(map.find(3), (1, 3));
    }

    #[test]
    fn grow_and_shrink_stamp_revisions() {
        let mut map = map_of(&[3, 4]);
        map.grow(1, 2, 7);
        assert_eq!(map.get(1).len, 6);
        assert_eq!(map.get(1).revision, 7);
        map.shrink(1, 3, 8);
        assert_eq!(map.get(1).len, 3);
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn ids_are_unique_and_findable() {
        let mut map = map_of(&[3, 4, 5]);
        let a = map.get(0).id;
        let c = map.get(2).id;
        assert_ne!(a, c);
        assert_eq!(map.index_of(c), Some(2));
        map.remove_entry(2);
        assert_eq!(map.index_of(c), None);
    }
}
