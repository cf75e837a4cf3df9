// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The piece table: fragments mapping document positions to buffer runs.

use crate::format::FormatIndex;
use crate::tree::{Iter, Span, SpanTree};

/// What a fragment's characters mean.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FragmentKind {
    /// Ordinary text.
    Text,
    /// A single `\n` terminating a block.
    Separator,
    /// A single sentinel character opening a frame.
    FrameBegin,
    /// A single sentinel character closing a frame.
    FrameEnd,
    /// A single character standing for an inline object.
    FrameAtom,
}

impl FragmentKind {
    /// Returns `true` for kinds whose character ends the block it sits in.
    ///
    /// Inline objects are ordinary block content; everything else that is not
    /// text terminates a block.
    pub fn is_block_boundary(self) -> bool {
        matches!(self, Self::Separator | Self::FrameBegin | Self::FrameEnd)
    }
}

/// A run of characters that share a format, stored contiguously in the text
/// buffer.
///
/// Fragments of non-[`Text`](FragmentKind::Text) kind always cover exactly
/// one character.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Fragment {
    /// Offset of the run in the document's append-only character buffer.
    pub(crate) buffer_pos: usize,
    /// Number of characters covered.
    pub(crate) len: usize,
    /// Interned format of every character in the run.
    pub(crate) format: FormatIndex,
    /// Role of the characters.
    pub(crate) kind: FragmentKind,
}

impl Span for Fragment {
    fn span_len(&self) -> usize {
        self.len
    }
}

/// Ordered sequence of fragments covering the whole document.
///
/// Every mutation here is position bookkeeping only; the character buffer is
/// owned by the document and never shrinks.
#[derive(Clone, Debug)]
pub(crate) struct FragmentMap {
    tree: SpanTree<Fragment>,
}

impl FragmentMap {
    pub(crate) fn new() -> Self {
        Self {
            tree: SpanTree::new(),
        }
    }

    /// Total number of document positions covered.
    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    /// Number of fragments.
    pub(crate) fn count(&self) -> usize {
        self.tree.count()
    }

    /// Finds the fragment containing `pos`, returning its index and start.
    ///
    /// A position on a fragment boundary belongs to the fragment starting
    /// there. Returns `None` for the end-of-document position.
    pub(crate) fn find(&self, pos: usize) -> Option<(usize, usize)> {
        self.tree.find(pos)
    }

    pub(crate) fn get(&self, index: usize) -> &Fragment {
        self.tree.get(index)
    }

    pub(crate) fn position_of(&self, index: usize) -> usize {
        self.tree.position_of(index)
    }

    /// Inserts a fragment at `pos`, splitting any fragment spanning it.
    ///
    /// With `unite` set, the new fragment is merged into its neighbors where
    /// the piece-table geometry allows; only plain text merges. Returns the
    /// index of the fragment now covering the inserted characters.
    pub(crate) fn insert(&mut self, pos: usize, fragment: Fragment, unite: bool) -> usize {
        debug_assert!(pos <= self.len(), "fragment insert out of bounds");
        debug_assert!(fragment.len > 0, "fragments cover at least one position");
        self.split_at(pos);
        let index = match self.tree.find(pos) {
            Some((index, _)) => index,
            None => self.tree.count(),
        };
        self.tree.insert(index, fragment);
        if unite {
            // Try the right neighbor first so a left merge cannot shift the
            // index under us.
            self.try_unite(index);
            if index > 0 && self.try_unite(index - 1) {
                return index - 1;
            }
        }
        index
    }

    /// Splits the fragment spanning `pos` so that `pos` lands on a boundary.
    ///
    /// Returns `true` if a split happened.
    pub(crate) fn split_at(&mut self, pos: usize) -> bool {
        let Some((index, start)) = self.tree.find(pos) else {
            return false;
        };
        if start == pos {
            return false;
        }
        let offset = pos - start;
        let right = self.tree.update(index, |fragment| {
            debug_assert!(
                fragment.kind == FragmentKind::Text,
                "only text fragments span multiple positions"
            );
            let right = Fragment {
                buffer_pos: fragment.buffer_pos + offset,
                len: fragment.len - offset,
                format: fragment.format,
                kind: fragment.kind,
            };
            fragment.len = offset;
            right
        });
        self.tree.insert(index + 1, right);
        true
    }

    /// Merges the fragment at `index` with its right neighbor if both are
    /// plain text with the same format and adjacent in the buffer.
    pub(crate) fn try_unite(&mut self, index: usize) -> bool {
        if index + 1 >= self.tree.count() {
            return false;
        }
        let left = *self.tree.get(index);
        let right = *self.tree.get(index + 1);
        if left.kind != FragmentKind::Text || right.kind != FragmentKind::Text {
            return false;
        }
        if left.format != right.format || left.buffer_pos + left.len != right.buffer_pos {
            return false;
        }
        self.tree.remove(index + 1);
        self.tree.update(index, |fragment| fragment.len += right.len);
        true
    }

    /// Removes `[pos, pos + len)`, which must lie inside a single fragment,
    /// and returns the removed piece.
    pub(crate) fn remove_span(&mut self, pos: usize, len: usize) -> Fragment {
        debug_assert!(len > 0, "cannot remove an empty span");
        self.split_at(pos);
        self.split_at(pos + len);
        let (index, start) = self
            .tree
            .find(pos)
            .expect("removed span must exist in the piece table");
        debug_assert!(start == pos, "split must land the span on a boundary");
        let fragment = self.tree.remove(index);
        debug_assert!(
            fragment.len == len,
            "removed span must not cross fragment boundaries"
        );
        fragment
    }

    /// Replaces the format of the fragment at `index`, returning the old one.
    pub(crate) fn set_format(&mut self, index: usize, format: FormatIndex) -> FormatIndex {
        self.tree.update(index, |fragment| {
            core::mem::replace(&mut fragment.format, format)
        })
    }

    /// Iterates fragments in order, yielding `(index, start, fragment)`.
    pub(crate) fn iter(&self) -> Iter<'_, Fragment> {
        self.tree.iter()
    }

    /// Iterates fragments starting with the one containing `pos`.
    pub(crate) fn iter_from(&self, pos: usize) -> Iter<'_, Fragment> {
        let index = match self.tree.find(pos) {
            Some((index, _)) => index,
            None => self.tree.count(),
        };
        self.tree.iter_from_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buffer_pos: usize, len: usize, format: u32) -> Fragment {
        Fragment {
            buffer_pos,
            len,
            format: FormatIndex(format),
            kind: FragmentKind::Text,
        }
    }

    #[test]
    fn contiguous_inserts_unite() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 5, 0), true);
        map.insert(5, text(5, 3, 0), true);
        assert_eq!(map.count(), 1);
        assert_eq!(map.len(), 8);
        assert_eq!(map.get(0).buffer_pos, 0);
    }

    #[test]
    fn format_changes_block_uniting() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 5, 0), true);
        map.insert(5, text(5, 3, 1), true);
        assert_eq!(map.count(), 2);
    }

    #[test]
    fn buffer_gaps_block_uniting() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 5, 0), true);
        // Same format, but the run lives elsewhere in the buffer.
        map.insert(5, text(9, 3, 0), true);
        assert_eq!(map.count(), 2);
    }

    #[test]
    fn inserting_into_a_fragment_splits_it() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 6, 0), true);
        map.insert(3, text(6, 2, 1), true);
        assert_eq!(map.count(), 3);
        assert_eq!(map.len(), 8);
        let pieces: alloc::vec::Vec<(usize, usize)> = map
            .iter()
            .map(|(_, start, f)| (start, f.buffer_pos))
            .collect();
        assert_eq!(pieces, [(0, 0), (3, 6), (5, 3)]);
    }

    #[test]
    fn separators_never_unite() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 3, 0), true);
        let separator = Fragment {
            buffer_pos: 3,
            len: 1,
            format: FormatIndex(0),
            kind: FragmentKind::Separator,
        };
        map.insert(3, separator, false);
        map.insert(4, text(4, 2, 0), true);
        assert_eq!(map.count(), 3);
        assert_eq!(map.get(1).kind, FragmentKind::Separator);
    }

    #[test]
    fn remove_span_splits_edges() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 10, 0), true);
        let removed = map.remove_span(3, 4);
        assert_eq!(removed.buffer_pos, 3);
        assert_eq!(removed.len, 4);
        assert_eq!(map.len(), 6);
        assert_eq!(map.count(), 2);
        // The survivors keep their buffer homes.
        assert_eq!(map.get(0).buffer_pos, 0);
        assert_eq!(map.get(1).buffer_pos, 7);
    }

    #[test]
    fn split_then_unite_restores_the_fragment() {
        let mut map = FragmentMap::new();
        map.insert(0, text(0, 8, 0), true);
        map.split_at(4);
        assert_eq!(map.count(), 2);
        assert!(map.try_unite(0));
        assert_eq!(map.count(), 1);
        assert_eq!(map.get(0).len, 8);
    }
}
