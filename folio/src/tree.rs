// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A balanced order-statistic tree over variable-length spans.
//!
//! Both the fragment map and the block map are sequences of entries that each
//! cover a run of document positions. The tree keeps two running sums per
//! subtree, entry count and total span length, so that position lookups,
//! entry lookups and edits all run in time logarithmic in the number of
//! entries.

use alloc::vec::Vec;
use core::mem;

/// Entries stored in a [`SpanTree`] report how many positions they cover.
pub(crate) trait Span {
    fn span_len(&self) -> usize;
}

/// Node fan-out. A node that grows past this many entries or children is
/// split in half.
const MAX_ENTRIES: usize = 16;

#[derive(Clone, Debug)]
pub(crate) struct SpanTree<T> {
    root: Node<T>,
}

#[derive(Clone, Debug)]
struct Node<T> {
    /// Total span length of this subtree.
    len: usize,
    /// Total entry count of this subtree.
    count: usize,
    kind: NodeKind<T>,
}

#[derive(Clone, Debug)]
enum NodeKind<T> {
    Leaf(Vec<T>),
    Internal(Vec<Node<T>>),
}

impl<T: Span> Node<T> {
    fn leaf(entries: Vec<T>) -> Self {
        let mut node = Self {
            len: 0,
            count: 0,
            kind: NodeKind::Leaf(entries),
        };
        node.refresh();
        node
    }

    fn internal(children: Vec<Self>) -> Self {
        let mut node = Self {
            len: 0,
            count: 0,
            kind: NodeKind::Internal(children),
        };
        node.refresh();
        node
    }

    fn refresh(&mut self) {
        match &self.kind {
            NodeKind::Leaf(entries) => {
                self.len = entries.iter().map(Span::span_len).sum();
                self.count = entries.len();
            }
            NodeKind::Internal(children) => {
                self.len = children.iter().map(|c| c.len).sum();
                self.count = children.iter().map(|c| c.count).sum();
            }
        }
    }
}

impl<T: Span> SpanTree<T> {
    pub(crate) fn new() -> Self {
        Self {
            root: Node::leaf(Vec::new()),
        }
    }

    /// Total span length of all entries.
    pub(crate) fn len(&self) -> usize {
        self.root.len
    }

    /// Number of entries.
    pub(crate) fn count(&self) -> usize {
        self.root.count
    }

    /// Returns the entry at `index`.
    pub(crate) fn get(&self, index: usize) -> &T {
        let mut node = &self.root;
        let mut index = index;
        loop {
            match &node.kind {
                NodeKind::Leaf(entries) => return &entries[index],
                NodeKind::Internal(children) => {
                    let mut next = None;
                    for child in children {
                        if index < child.count {
                            next = Some(child);
                            break;
                        }
                        index -= child.count;
                    }
                    node = next.expect("entry index out of bounds");
                }
            }
        }
    }

    /// Returns the position at which the entry at `index` starts.
    pub(crate) fn position_of(&self, index: usize) -> usize {
        let mut node = &self.root;
        let mut index = index;
        let mut start = 0;
        loop {
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    debug_assert!(index <= entries.len(), "entry index out of bounds");
                    return start + entries[..index].iter().map(Span::span_len).sum::<usize>();
                }
                NodeKind::Internal(children) => {
                    let mut next = None;
                    for child in children {
                        if index < child.count {
                            next = Some(child);
                            break;
                        }
                        index -= child.count;
                        start += child.len;
                    }
                    node = next.expect("entry index out of bounds");
                }
            }
        }
    }

    /// Finds the entry containing `pos`.
    ///
    /// Returns the entry's index and start position. A position on a boundary
    /// belongs to the entry that starts there; zero-length entries never
    /// contain any position. Returns `None` when `pos` is at or past the end.
    pub(crate) fn find(&self, pos: usize) -> Option<(usize, usize)> {
        if pos >= self.root.len {
            return None;
        }
        let mut node = &self.root;
        let mut pos = pos;
        let mut index = 0;
        let mut start = 0;
        loop {
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    for entry in entries {
                        let len = entry.span_len();
                        if pos < len {
                            return Some((index, start));
                        }
                        pos -= len;
                        index += 1;
                        start += len;
                    }
                    return None;
                }
                NodeKind::Internal(children) => {
                    let mut next = None;
                    for child in children {
                        if pos < child.len {
                            next = Some(child);
                            break;
                        }
                        pos -= child.len;
                        index += child.count;
                        start += child.len;
                    }
                    node = next?;
                }
            }
        }
    }

    /// Inserts `entry` so that it becomes the entry at `index`.
    pub(crate) fn insert(&mut self, index: usize, entry: T) {
        debug_assert!(index <= self.root.count, "insert index out of bounds");
        if let Some(sibling) = insert_rec(&mut self.root, index, entry) {
            let old_root = mem::replace(&mut self.root, Node::leaf(Vec::new()));
            self.root = Node::internal(alloc::vec![old_root, sibling]);
        }
    }

    /// Removes and returns the entry at `index`.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        debug_assert!(index < self.root.count, "remove index out of bounds");
        let removed = remove_rec(&mut self.root, index);
        // Collapse a root with a single child so the height tracks shrinkage.
        loop {
            match &mut self.root.kind {
                NodeKind::Internal(children) if children.len() == 1 => {
                    let only = children.swap_remove(0);
                    self.root = only;
                }
                _ => break,
            }
        }
        removed
    }

    /// Applies `f` to the entry at `index` and repairs the sums on the path.
    pub(crate) fn update<R>(&mut self, index: usize, f: impl FnOnce(&mut T) -> R) -> R {
        update_rec(&mut self.root, index, f)
    }

    /// Iterates all entries in order, yielding `(index, start, entry)`.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        self.iter_from_index(0)
    }

    /// Iterates entries in order starting from the entry at `index`.
    pub(crate) fn iter_from_index(&self, index: usize) -> Iter<'_, T> {
        let mut iter = Iter {
            stack: Vec::new(),
            index,
            start: 0,
        };
        if index >= self.root.count {
            return iter;
        }
        let mut node = &self.root;
        let mut remaining = index;
        let mut start = 0;
        loop {
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    start += entries[..remaining]
                        .iter()
                        .map(Span::span_len)
                        .sum::<usize>();
                    iter.stack.push((node, remaining));
                    iter.start = start;
                    return iter;
                }
                NodeKind::Internal(children) => {
                    let mut next = None;
                    for (i, child) in children.iter().enumerate() {
                        if remaining < child.count {
                            iter.stack.push((node, i + 1));
                            next = Some(child);
                            break;
                        }
                        remaining -= child.count;
                        start += child.len;
                    }
                    match next {
                        Some(child) => node = child,
                        None => return iter,
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        fn depth_of<T>(node: &Node<T>) -> usize {
            match &node.kind {
                NodeKind::Leaf(_) => 0,
                NodeKind::Internal(children) => 1 + depth_of(&children[0]),
            }
        }
        fn check<T: Span>(node: &Node<T>, depth: usize) {
            let (len, count) = match &node.kind {
                NodeKind::Leaf(entries) => {
                    assert_eq!(depth, 0, "leaves must share a depth");
                    (
                        entries.iter().map(Span::span_len).sum::<usize>(),
                        entries.len(),
                    )
                }
                NodeKind::Internal(children) => {
                    assert!(!children.is_empty(), "internal nodes hold children");
                    for child in children {
                        assert!(child.count > 0, "empty subtrees must be pruned");
                        check(child, depth - 1);
                    }
                    (
                        children.iter().map(|c| c.len).sum(),
                        children.iter().map(|c| c.count).sum(),
                    )
                }
            };
            assert_eq!(node.len, len, "cached span sum out of date");
            assert_eq!(node.count, count, "cached entry count out of date");
        }
        check(&self.root, depth_of(&self.root));
    }
}

/// Iterator over tree entries, yielding `(index, start, entry)`.
#[derive(Clone, Debug)]
pub(crate) struct Iter<'a, T> {
    /// Path from the root to the current leaf, each with the slot to resume
    /// at. Empty once exhausted.
    stack: Vec<(&'a Node<T>, usize)>,
    /// Global index of the next entry.
    index: usize,
    /// Start position of the next entry.
    start: usize,
}

impl<'a, T: Span> Iterator for Iter<'a, T> {
    type Item = (usize, usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, slot) = self.stack.pop()?;
            match &node.kind {
                NodeKind::Leaf(entries) => {
                    if slot < entries.len() {
                        let entry = &entries[slot];
                        let item = (self.index, self.start, entry);
                        self.index += 1;
                        self.start += entry.span_len();
                        self.stack.push((node, slot + 1));
                        return Some(item);
                    }
                    // Leaf exhausted; resume in the parent.
                }
                NodeKind::Internal(children) => {
                    if slot < children.len() {
                        self.stack.push((node, slot + 1));
                        let mut child = &children[slot];
                        loop {
                            match &child.kind {
                                NodeKind::Leaf(_) => {
                                    self.stack.push((child, 0));
                                    break;
                                }
                                NodeKind::Internal(grandchildren) => {
                                    self.stack.push((child, 1));
                                    child = &grandchildren[0];
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn insert_rec<T: Span>(node: &mut Node<T>, index: usize, entry: T) -> Option<Node<T>> {
    let sibling = match &mut node.kind {
        NodeKind::Leaf(entries) => {
            entries.insert(index, entry);
            if entries.len() > MAX_ENTRIES {
                let right = entries.split_off(entries.len() / 2);
                Some(Node::leaf(right))
            } else {
                None
            }
        }
        NodeKind::Internal(children) => {
            let mut index = index;
            let mut at = 0;
            while at + 1 < children.len() && index > children[at].count {
                index -= children[at].count;
                at += 1;
            }
            // An index on a child boundary appends to the left child.
            let child_sibling = insert_rec(&mut children[at], index, entry);
            if let Some(new_child) = child_sibling {
                children.insert(at + 1, new_child);
            }
            if children.len() > MAX_ENTRIES {
                let right = children.split_off(children.len() / 2);
                Some(Node::internal(right))
            } else {
                None
            }
        }
    };
    node.refresh();
    sibling
}

fn remove_rec<T: Span>(node: &mut Node<T>, index: usize) -> T {
    let removed = match &mut node.kind {
        NodeKind::Leaf(entries) => entries.remove(index),
        NodeKind::Internal(children) => {
            let mut index = index;
            let mut at = 0;
            while index >= children[at].count {
                index -= children[at].count;
                at += 1;
            }
            let removed = remove_rec(&mut children[at], index);
            if children[at].count == 0 {
                children.remove(at);
            }
            removed
        }
    };
    node.refresh();
    removed
}

fn update_rec<T: Span, R>(node: &mut Node<T>, index: usize, f: impl FnOnce(&mut T) -> R) -> R {
    let result = match &mut node.kind {
        NodeKind::Leaf(entries) => f(&mut entries[index]),
        NodeKind::Internal(children) => {
            let mut index = index;
            let mut at = 0;
            while index >= children[at].count {
                index -= children[at].count;
                at += 1;
            }
            update_rec(&mut children[at], index, f)
        }
    };
    node.refresh();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Piece(usize);

    impl Span for Piece {
        fn span_len(&self) -> usize {
            self.0
        }
    }

    fn tree_of(lens: &[usize]) -> SpanTree<Piece> {
        let mut tree = SpanTree::new();
        for (i, &len) in lens.iter().enumerate() {
            tree.insert(i, Piece(len));
        }
        tree.check_invariants();
        tree
    }

    #[test]
    fn empty_tree() {
        let tree: SpanTree<Piece> = SpanTree::new();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.count(), 0);
        assert_eq!(tree.find(0), None);
    }

    #[test]
    fn find_respects_boundaries() {
        let tree = tree_of(&[3, 4, 5]);
        assert_eq!(tree.find(0), Some((0, 0)));
        assert_eq!(tree.find(2), Some((0, 0)));
        // A boundary position belongs to the entry that starts there.
        assert_eq!(tree.find(3), Some((1, 3)));
        assert_eq!(tree.find(6), Some((1, 3)));
        assert_eq!(tree.find(7), Some((2, 7)));
        assert_eq!(tree.find(11), Some((2, 7)));
        assert_eq!(tree.find(12), None);
        assert_eq!(tree.position_of(1), 3);
    }

    #[test]
    fn find_skips_zero_length_entries() {
        let tree = tree_of(&[2, 0, 3]);
        assert_eq!(tree.find(1), Some((0, 0)));
        assert_eq!(tree.find(2), Some((2, 2)));
        assert_eq!(tree.position_of(1), 2);
    }

    #[test]
    fn insert_splits_nodes() {
        let lens: Vec<usize> = (1..=100).collect();
        let tree = tree_of(&lens);
        assert_eq!(tree.count(), 100);
        assert_eq!(tree.len(), 5050);
        for index in 0..100 {
            assert_eq!(tree.get(index).0, index + 1);
        }
    }

    #[test]
    fn insert_in_the_middle_keeps_order() {
        let mut tree = tree_of(&[1, 2, 4, 5]);
        tree.insert(2, Piece(3));
        tree.check_invariants();
        let lens: Vec<usize> = tree.iter().map(|(_, _, p)| p.0).collect();
        assert_eq!(lens, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn remove_returns_entries_and_keeps_sums() {
        let mut tree = tree_of(&(1..=50).collect::<Vec<_>>());
        assert_eq!(tree.remove(9), Piece(10));
        tree.check_invariants();
        assert_eq!(tree.count(), 49);
        assert_eq!(tree.len(), 1275 - 10);
        while tree.count() > 0 {
            tree.remove(0);
        }
        tree.check_invariants();
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn update_repairs_sums() {
        let mut tree = tree_of(&[3, 4, 5]);
        tree.update(1, |p| p.0 = 10);
        tree.check_invariants();
        assert_eq!(tree.len(), 18);
        // Entry 1 now spans [3, 13); boundaries belong to the right.
        assert_eq!(tree.find(12), Some((1, 3)));
        assert_eq!(tree.find(13), Some((2, 13)));
    }

    #[test]
    fn iteration_yields_indices_and_starts() {
        let tree = tree_of(&[3, 4, 5]);
        let items: Vec<(usize, usize, usize)> =
            tree.iter().map(|(i, start, p)| (i, start, p.0)).collect();
        assert_eq!(items, [(0, 0, 3), (1, 3, 4), (2, 7, 5)]);
    }

    #[test]
    fn iteration_from_an_index() {
        let lens: Vec<usize> = (0..40).map(|i| i % 3 + 1).collect();
        let tree = tree_of(&lens);
        let tail: Vec<usize> = tree.iter_from_index(17).map(|(i, _, _)| i).collect();
        assert_eq!(tail, (17..40).collect::<Vec<_>>());
        let (index, start, _) = tree.iter_from_index(17).next().unwrap();
        assert_eq!(start, tree.position_of(index));
        assert_eq!(tree.iter_from_index(40).next(), None);
    }

    #[test]
    fn zero_length_entries_survive_iteration() {
        let tree = tree_of(&[3, 0]);
        let items: Vec<(usize, usize, usize)> =
            tree.iter().map(|(i, start, p)| (i, start, p.0)).collect();
        assert_eq!(items, [(0, 0, 3), (1, 3, 0)]);
    }

    #[test]
    fn interleaved_edits_stay_consistent() {
        let mut tree = SpanTree::new();
        for i in 0..200 {
            tree.insert(i / 2, Piece(i % 7 + 1));
        }
        tree.check_invariants();
        for _ in 0..150 {
            tree.remove(tree.count() / 3);
        }
        tree.check_invariants();
        let total: usize = tree.iter().map(|(_, _, p)| p.0).sum();
        assert_eq!(total, tree.len());
        assert_eq!(tree.count(), 50);
    }
}
