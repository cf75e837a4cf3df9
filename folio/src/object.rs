// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural objects: frames, tables and lists.
//!
//! Objects live in a registry owned by the document and are addressed by
//! [`ObjectIndex`]. Frames form a tree anchored at an implicit root frame
//! that spans the whole document; lists are flat groups of blocks. The
//! registry stores structure only. Formats stay interned in the format
//! collection and are referenced by index.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use smallvec::SmallVec;

use crate::block::BlockId;
use crate::format::FormatIndex;
use crate::fragment::FragmentKind;
use crate::style::ListStyle;

/// Identity of a structural object within one document.
///
/// Indices are never reused: deleting an object retires its index for the
/// lifetime of the document, so indices recorded in the undo log stay
/// unambiguous.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ObjectIndex(pub(crate) u32);

impl ObjectIndex {
    /// Returns the raw index value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// A rectangular region of the document delimited by sentinel characters.
#[derive(Clone, Debug)]
pub struct Frame {
    pub(crate) format: FormatIndex,
    pub(crate) parent: Option<ObjectIndex>,
    pub(crate) children: SmallVec<[ObjectIndex; 4]>,
    /// Position of the opening sentinel; `None` while unlinked.
    pub(crate) begin: Option<usize>,
    /// Position of the closing sentinel. Equal to `begin` for atomic frames.
    pub(crate) end: Option<usize>,
}

impl Frame {
    pub(crate) fn new(format: FormatIndex) -> Self {
        Self {
            format,
            parent: None,
            children: SmallVec::new(),
            begin: None,
            end: None,
        }
    }

    /// The frame's format index.
    pub fn format(&self) -> FormatIndex {
        self.format
    }

    /// The enclosing frame, if this frame is linked into the tree.
    pub fn parent(&self) -> Option<ObjectIndex> {
        self.parent
    }

    /// Child frames ordered by position.
    pub fn children(&self) -> &[ObjectIndex] {
        &self.children
    }

    /// Position of the opening sentinel.
    pub fn begin(&self) -> Option<usize> {
        self.begin
    }

    /// Position of the closing sentinel.
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    /// Returns `true` for single-character inline frames.
    pub fn is_atomic(&self) -> bool {
        self.begin.is_some() && self.begin == self.end
    }
}

/// A frame subdivided into a grid of cell frames.
#[derive(Clone, Debug)]
pub struct Table {
    pub(crate) frame: Frame,
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    /// Cell frames in creation (reading) order of their owning positions.
    pub(crate) cells: Vec<ObjectIndex>,
    /// `rows * columns` entries mapping grid slots to `cells` ordinals.
    pub(crate) grid: Vec<u32>,
    pub(crate) grid_dirty: bool,
}

impl Table {
    pub(crate) fn new(format: FormatIndex) -> Self {
        Self {
            frame: Frame::new(format),
            rows: 0,
            columns: 0,
            cells: Vec::new(),
            grid: Vec::new(),
            grid_dirty: true,
        }
    }

    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the grid.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Cell frames in reading order of their owning grid slots.
    pub fn cells(&self) -> &[ObjectIndex] {
        &self.cells
    }

    /// The owning cell of the grid slot `(row, column)`.
    ///
    /// With cell spans in play several slots can answer with the same cell.
    pub fn cell_at(&self, row: usize, column: usize) -> ObjectIndex {
        debug_assert!(!self.grid_dirty, "table grid queried while dirty");
        assert!(
            row < self.rows && column < self.columns,
            "cell coordinates out of range"
        );
        let ordinal = self.grid[row * self.columns + column];
        self.cells[ordinal as usize]
    }

    /// Rebuilds the slot grid from per-cell `(row_span, column_span)` pairs,
    /// given in the same order as [`cells`](Self::cells).
    ///
    /// Cells are placed left to right, top to bottom, each claiming the next
    /// free slot and then covering its spans, clipped to the grid.
    pub(crate) fn rebuild_grid(&mut self, spans: &[(usize, usize)]) {
        debug_assert_eq!(spans.len(), self.cells.len(), "span per cell required");
        let (rows, columns) = (self.rows, self.columns);
        self.grid.clear();
        self.grid.resize(rows * columns, u32::MAX);
        let mut row = 0;
        let mut column = 0;
        for (ordinal, &(row_span, column_span)) in spans.iter().enumerate() {
            // Skip slots claimed by spanning cells above or to the left.
            while row < rows && self.grid[row * columns + column] != u32::MAX {
                column += 1;
                if column == columns {
                    column = 0;
                    row += 1;
                }
            }
            if row >= rows {
                break;
            }
            let ordinal = u32::try_from(ordinal).expect("table cell count exceeds u32");
            for r in row..(row + row_span).min(rows) {
                for c in column..(column + column_span).min(columns) {
                    self.grid[r * columns + c] = ordinal;
                }
            }
        }
        // Unclaimed slots (possible with overlapping spans) fall back to the
        // last cell so lookups stay total.
        if let Some(last) = self.cells.len().checked_sub(1) {
            let last = u32::try_from(last).expect("table cell count exceeds u32");
            for slot in &mut self.grid {
                if *slot == u32::MAX {
                    *slot = last;
                }
            }
        }
        self.grid_dirty = false;
    }
}

/// A group of blocks sharing a list format.
#[derive(Clone, Debug)]
pub struct List {
    pub(crate) format: FormatIndex,
    /// Member blocks in membership order; the document derives document
    /// order by scanning blocks when needed.
    pub(crate) blocks: Vec<BlockId>,
}

impl List {
    pub(crate) fn new(format: FormatIndex) -> Self {
        Self {
            format,
            blocks: Vec::new(),
        }
    }

    /// The list's format index.
    pub fn format(&self) -> FormatIndex {
        self.format
    }

    /// Number of member blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the list has no member blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn add_block(&mut self, id: BlockId) {
        self.blocks.push(id);
    }

    pub(crate) fn remove_block(&mut self, id: BlockId) {
        self.blocks.retain(|&b| b != id);
    }
}

/// Any structural object a document can hold.
#[derive(Clone, Debug)]
pub enum DocObject {
    /// A plain frame.
    Frame(Frame),
    /// A table.
    Table(Table),
    /// A list.
    List(List),
}

impl DocObject {
    /// The frame view of this object, if it has one.
    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Self::Frame(f) => Some(f),
            Self::Table(t) => Some(&t.frame),
            Self::List(_) => None,
        }
    }

    /// The table view of this object, if it is one.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The list view of this object, if it is one.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    fn as_frame_mut(&mut self) -> Option<&mut Frame> {
        match self {
            Self::Frame(f) => Some(f),
            Self::Table(t) => Some(&mut t.frame),
            Self::List(_) => None,
        }
    }
}

/// Registry of all structural objects of a document.
#[derive(Clone, Debug)]
pub(crate) struct ObjectRegistry {
    objects: Vec<Option<DocObject>>,
    root: ObjectIndex,
}

impl ObjectRegistry {
    /// Creates a registry holding just the root frame.
    pub(crate) fn new(root_format: FormatIndex) -> Self {
        Self {
            objects: alloc::vec![Some(DocObject::Frame(Frame::new(root_format)))],
            root: ObjectIndex(0),
        }
    }

    pub(crate) fn root(&self) -> ObjectIndex {
        self.root
    }

    /// The index the next created object will get.
    pub(crate) fn next_index(&self) -> ObjectIndex {
        ObjectIndex(u32::try_from(self.objects.len()).expect("object index space exhausted"))
    }

    pub(crate) fn create(&mut self, object: DocObject) -> ObjectIndex {
        let index = u32::try_from(self.objects.len()).expect("object index space exhausted");
        self.objects.push(Some(object));
        ObjectIndex(index)
    }

    pub(crate) fn get(&self, index: ObjectIndex) -> Option<&DocObject> {
        self.objects.get(index.0 as usize)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, index: ObjectIndex) -> Option<&mut DocObject> {
        self.objects.get_mut(index.0 as usize)?.as_mut()
    }

    /// Deletes the object, retiring its index.
    pub(crate) fn delete(&mut self, index: ObjectIndex) {
        debug_assert!(index != self.root, "the root frame cannot be deleted");
        self.objects[index.0 as usize] = None;
    }

    /// The frame view of the object at `index`.
    ///
    /// Panics if the object was deleted or is not a frame.
    pub(crate) fn frame(&self, index: ObjectIndex) -> &Frame {
        self.get(index)
            .and_then(DocObject::as_frame)
            .expect("object is not a live frame")
    }

    pub(crate) fn frame_mut(&mut self, index: ObjectIndex) -> &mut Frame {
        self.get_mut(index)
            .and_then(DocObject::as_frame_mut)
            .expect("object is not a live frame")
    }

    /// Shifts the cached sentinel positions for an insertion.
    pub(crate) fn adjust_for_insert(&mut self, pos: usize, n: usize) {
        for object in self.objects.iter_mut().flatten() {
            if let Some(frame) = object.as_frame_mut() {
                if let Some(begin) = &mut frame.begin {
                    if *begin >= pos {
                        *begin += n;
                    }
                }
                if let Some(end) = &mut frame.end {
                    if *end >= pos {
                        *end += n;
                    }
                }
            }
        }
    }

    /// Shifts the cached sentinel positions for a removal.
    ///
    /// Sentinels inside the removed range are reported separately through
    /// [`sentinel_removed`](Self::sentinel_removed); this only fixes up
    /// survivors.
    pub(crate) fn adjust_for_remove(&mut self, pos: usize, n: usize) {
        for object in self.objects.iter_mut().flatten() {
            if let Some(frame) = object.as_frame_mut() {
                if let Some(begin) = &mut frame.begin {
                    if *begin >= pos + n {
                        *begin -= n;
                    } else if *begin > pos {
                        *begin = pos;
                    }
                }
                if let Some(end) = &mut frame.end {
                    if *end >= pos + n {
                        *end -= n;
                    } else if *end > pos {
                        *end = pos;
                    }
                }
            }
        }
    }

    /// Records that one of a frame's sentinels was removed from the text.
    ///
    /// Losing either sentinel takes the frame out of the tree; its children
    /// move up to its parent. A later re-insertion (undo) links it back.
    pub(crate) fn sentinel_removed(&mut self, index: ObjectIndex, kind: FragmentKind) {
        if self.frame(index).parent.is_some() {
            self.unlink(index);
        }
        let frame = self.frame_mut(index);
        match kind {
            FragmentKind::FrameBegin => frame.begin = None,
            FragmentKind::FrameEnd => frame.end = None,
            FragmentKind::FrameAtom => {
                frame.begin = None;
                frame.end = None;
            }
            _ => debug_assert!(false, "not a sentinel kind"),
        }
    }

    /// Links `child` under `parent`, keeping children ordered by position.
    pub(crate) fn link(&mut self, child: ObjectIndex, parent: ObjectIndex) {
        debug_assert!(child != parent, "a frame cannot contain itself");
        let begin = self.frame(child).begin;
        let at = self
            .frame(parent)
            .children
            .iter()
            .take_while(|&&c| self.frame(c).begin < begin)
            .count();
        self.frame_mut(parent).children.insert(at, child);
        self.frame_mut(child).parent = Some(parent);
    }

    /// Unlinks `child` from the tree, reparenting its children in place.
    pub(crate) fn unlink(&mut self, child: ObjectIndex) {
        let Some(parent) = self.frame(child).parent else {
            return;
        };
        let grandchildren = self.frame(child).children.clone();
        let slot = self
            .frame(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .expect("child missing from its parent");
        {
            let siblings = &mut self.frame_mut(parent).children;
            siblings.remove(slot);
            // Grandchildren are ordered and contiguous; splice them in where
            // the child sat.
            for (offset, &grandchild) in grandchildren.iter().enumerate() {
                siblings.insert(slot + offset, grandchild);
            }
        }
        for &grandchild in &grandchildren {
            self.frame_mut(grandchild).parent = Some(parent);
        }
        let frame = self.frame_mut(child);
        frame.parent = None;
        frame.children.clear();
    }

    /// Moves children of `parent` that now fall strictly inside `frame`'s
    /// span down into `frame`.
    pub(crate) fn adopt_children(&mut self, frame: ObjectIndex, parent: ObjectIndex) {
        let (Some(begin), Some(end)) = (self.frame(frame).begin, self.frame(frame).end) else {
            return;
        };
        let adopted: SmallVec<[ObjectIndex; 4]> = self
            .frame(parent)
            .children
            .iter()
            .copied()
            .filter(|&c| {
                c != frame
                    && matches!(
                        (self.frame(c).begin, self.frame(c).end),
                        (Some(b), Some(e)) if begin < b && e < end
                    )
            })
            .collect();
        self.frame_mut(parent)
            .children
            .retain(|c| !adopted.contains(c));
        for &child in &adopted {
            self.frame_mut(child).parent = Some(frame);
        }
        let target = &mut self.frame_mut(frame).children;
        debug_assert!(target.is_empty(), "adoption into a frame with children");
        target.extend(adopted);
    }

    /// The innermost frame containing the character at `pos`.
    ///
    /// Sentinels belong to their frame.
    pub(crate) fn frame_at(&self, pos: usize) -> ObjectIndex {
        self.descend(pos, |b, e, p| b <= p && p <= e)
    }

    /// The innermost frame an insertion at `pos` lands in.
    ///
    /// Inserting at a frame's begin sentinel goes before the frame;
    /// inserting at its end sentinel goes at the end of its content.
    pub(crate) fn frame_for_insert(&self, pos: usize) -> ObjectIndex {
        self.descend(pos, |b, e, p| b < p && p <= e)
    }

    fn descend(&self, pos: usize, contains: impl Fn(usize, usize, usize) -> bool) -> ObjectIndex {
        let mut current = self.root;
        'down: loop {
            for &child in self.frame(current).children.iter() {
                let frame = self.frame(child);
                if let (Some(begin), Some(end)) = (frame.begin, frame.end) {
                    if !frame.is_atomic() && contains(begin, end, pos) {
                        current = child;
                        continue 'down;
                    }
                }
            }
            return current;
        }
    }
}

/// Marker text for a numbered list item, for example `"iv."` or `"C."`.
///
/// Shape styles (disc, circle, square) have no text; this returns an empty
/// string for them.
pub fn list_marker_text(style: ListStyle, number: usize) -> String {
    let mut text = String::new();
    match style {
        ListStyle::Disc | ListStyle::Circle | ListStyle::Square => return text,
        ListStyle::Decimal => {
            let _ = write!(text, "{number}");
        }
        ListStyle::LowerAlpha | ListStyle::UpperAlpha => {
            push_alpha(&mut text, number, style == ListStyle::UpperAlpha);
        }
        ListStyle::LowerRoman | ListStyle::UpperRoman => {
            push_roman(&mut text, number, style == ListStyle::UpperRoman);
        }
    }
    text.push('.');
    text
}

// Bijective base 26: 1 -> a, 26 -> z, 27 -> aa.
fn push_alpha(out: &mut String, mut number: usize, upper: bool) {
    const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
    debug_assert!(number > 0, "item numbers start at 1");
    let mut letters = SmallVec::<[u8; 8]>::new();
    while number > 0 {
        number -= 1;
        letters.push(ALPHABET[number % 26]);
        number /= 26;
    }
    for &letter in letters.iter().rev() {
        let letter = char::from(letter);
        out.push(if upper {
            letter.to_ascii_uppercase()
        } else {
            letter
        });
    }
}

fn push_roman(out: &mut String, mut number: usize, upper: bool) {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    debug_assert!(number > 0, "item numbers start at 1");
    for (value, digits) in NUMERALS {
        while number >= value {
            number -= value;
            for c in digits.chars() {
                out.push(if upper { c.to_ascii_uppercase() } else { c });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_frame(begin: usize, end: usize) -> (ObjectRegistry, ObjectIndex) {
        let mut objects = ObjectRegistry::new(FormatIndex(0));
        let frame = objects.create(DocObject::Frame(Frame::new(FormatIndex(1))));
        {
            let f = objects.frame_mut(frame);
            f.begin = Some(begin);
            f.end = Some(end);
        }
        let root = objects.root();
        objects.link(frame, root);
        (objects, frame)
    }

    #[test]
    fn frames_nest_by_position() {
        let (mut objects, outer) = registry_with_frame(2, 20);
        let inner = objects.create(DocObject::Frame(Frame::new(FormatIndex(2))));
        {
            let f = objects.frame_mut(inner);
            f.begin = Some(5);
            f.end = Some(9);
        }
        objects.link(inner, outer);
        assert_eq!(objects.frame_at(7), inner);
        assert_eq!(objects.frame_at(15), outer);
        assert_eq!(objects.frame_at(0), objects.root());
        // The sentinels belong to their frame.
        assert_eq!(objects.frame_at(5), inner);
        assert_eq!(objects.frame_at(9), inner);
        // But inserting at the begin sentinel goes before the frame.
        assert_eq!(objects.frame_for_insert(5), outer);
        assert_eq!(objects.frame_for_insert(9), inner);
    }

    #[test]
    fn unlink_reparents_children_in_order() {
        let (mut objects, outer) = registry_with_frame(0, 30);
        let mut inner = Vec::new();
        for (b, e) in [(2, 5), (8, 11)] {
            let f = objects.create(DocObject::Frame(Frame::new(FormatIndex(2))));
            objects.frame_mut(f).begin = Some(b);
            objects.frame_mut(f).end = Some(e);
            objects.link(f, outer);
            inner.push(f);
        }
        objects.unlink(outer);
        let root = objects.root();
        assert_eq!(objects.frame(root).children(), inner.as_slice());
        assert_eq!(objects.frame(inner[0]).parent(), Some(root));
        assert_eq!(objects.frame(outer).parent(), None);
    }

    #[test]
    fn adoption_captures_contained_frames() {
        let (mut objects, early) = registry_with_frame(2, 5);
        let root = objects.root();
        let wrapper = objects.create(DocObject::Frame(Frame::new(FormatIndex(3))));
        objects.frame_mut(wrapper).begin = Some(1);
        objects.frame_mut(wrapper).end = Some(10);
        objects.link(wrapper, root);
        objects.adopt_children(wrapper, root);
        assert_eq!(objects.frame(root).children(), &[wrapper]);
        assert_eq!(objects.frame(wrapper).children(), &[early]);
        assert_eq!(objects.frame(early).parent(), Some(wrapper));
    }

    #[test]
    fn sentinel_loss_unlinks_the_frame() {
        let (mut objects, frame) = registry_with_frame(2, 9);
        objects.sentinel_removed(frame, FragmentKind::FrameBegin);
        assert_eq!(objects.frame(frame).parent(), None);
        assert_eq!(objects.frame(frame).begin(), None);
        assert_eq!(objects.frame(frame).end(), Some(9));
        assert!(objects.frame(objects.root()).children().is_empty());
    }

    #[test]
    fn grid_placement_with_spans() {
        let mut table = Table::new(FormatIndex(0));
        table.rows = 2;
        table.columns = 3;
        for i in 0..5 {
            table.cells.push(ObjectIndex(i + 10));
        }
        // The first cell covers a 2x2 corner; the rest fill around it.
        table.rebuild_grid(&[(2, 2), (1, 1), (1, 1), (1, 1), (1, 1)]);
        assert_eq!(table.cell_at(0, 0), ObjectIndex(10));
        assert_eq!(table.cell_at(1, 1), ObjectIndex(10));
        assert_eq!(table.cell_at(0, 2), ObjectIndex(11));
        assert_eq!(table.cell_at(1, 2), ObjectIndex(12));
    }

    #[test]
    fn markers_render_each_numbering_style() {
        assert_eq!(list_marker_text(ListStyle::Decimal, 3), "3.");
        assert_eq!(list_marker_text(ListStyle::LowerAlpha, 1), "a.");
        assert_eq!(list_marker_text(ListStyle::LowerAlpha, 27), "aa.");
        assert_eq!(list_marker_text(ListStyle::UpperAlpha, 2), "B.");
        assert_eq!(list_marker_text(ListStyle::LowerRoman, 4), "iv.");
        assert_eq!(list_marker_text(ListStyle::UpperRoman, 1949), "MCMXLIX.");
        assert_eq!(list_marker_text(ListStyle::Disc, 5), "");
    }
}
