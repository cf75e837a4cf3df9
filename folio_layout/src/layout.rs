// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The incremental layout engine.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use folio::{
    Alignment, BlockId, BlockRef, Brush, DocObject, Document, DocumentChange, FragmentKind,
    FrameContent, FramePosition, ObjectIndex,
};
use hashbrown::{DefaultHashBuilder, HashMap};
use log::{trace, warn};
use smallvec::SmallVec;

use crate::data::{
    find_y, float_fingerprint, float_margins, BlockSlot, Chrome, FloatRecord, FrameRecord,
    PlacedLine, FIT_EPSILON, PROBE_BAND,
};
use crate::geom::{Point, Rect, Size};
use crate::paint::{HandlerRegistry, InlineObjectHandler};
use crate::shape::{InlineItem, LineBreaker, ShapedLine, StyleRun};

/// Default width of one indentation step, in layout units.
const DEFAULT_INDENT_WIDTH: f32 = 40.0;

/// Incremental layout of a [`Document`].
///
/// The layout tracks one document but holds no reference to it; the document
/// is passed into every operation, together with the [`LineBreaker`] that
/// measures text. Feed every [`DocumentChange`] the document reports into
/// [`document_changed`](Self::document_changed) and the layout revalidates
/// lazily: geometry queries, hit tests and drawing first bring the layout up
/// to date, relaying out only the blocks whose cached lines no longer apply.
///
/// `L` is the line type produced by the breaker. It is a type parameter of
/// the layout (rather than of each call) because cached lines of that type
/// live in the layout between passes.
pub struct DocumentLayout<B: Brush, L: ShapedLine> {
    page_width: f32,
    indent_width: f32,
    pub(crate) frames: HashMap<ObjectIndex, FrameRecord>,
    pub(crate) blocks: HashMap<BlockId, BlockSlot<L>>,
    pub(crate) handlers: HandlerRegistry<B, L>,
    hasher: DefaultHashBuilder,
    size: Size,
    ideal_width: f32,
    dirty: bool,
}

impl<B: Brush, L: ShapedLine> DocumentLayout<B, L> {
    /// Creates a layout for pages `page_width` units wide.
    pub fn new(page_width: f32) -> Self {
        Self {
            page_width,
            indent_width: DEFAULT_INDENT_WIDTH,
            frames: HashMap::new(),
            blocks: HashMap::new(),
            handlers: HandlerRegistry::new(),
            hasher: DefaultHashBuilder::default(),
            size: Size::ZERO,
            ideal_width: 0.0,
            dirty: true,
        }
    }

    /// The page width content is laid out against.
    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    /// Changes the page width and invalidates the whole layout.
    pub fn set_page_width(&mut self, width: f32) {
        if self.page_width != width {
            self.page_width = width;
            self.invalidate_all();
        }
    }

    /// Width of one block indentation step.
    pub fn indent_width(&self) -> f32 {
        self.indent_width
    }

    /// Changes the indentation step width and invalidates the whole layout.
    pub fn set_indent_width(&mut self, width: f32) {
        if self.indent_width != width {
            self.indent_width = width;
            self.invalidate_all();
        }
    }

    /// Registers the handler that measures and draws inline objects whose
    /// character format carries `object_type`.
    ///
    /// Objects of a type without a handler fall back to the width and
    /// height of their frame format and are not drawn.
    pub fn register_handler(
        &mut self,
        object_type: u16,
        handler: Box<dyn InlineObjectHandler<B, L>>,
    ) {
        self.handlers.register(object_type, handler);
        self.invalidate_all();
    }

    /// Records a document change reported by [`Document::take_change`].
    ///
    /// Every frame whose range touches the changed positions is marked for
    /// relayout; everything else keeps its cached geometry.
    pub fn document_changed(&mut self, doc: &Document<B>, change: &DocumentChange) {
        let from = change.from;
        let to = change.from + change.length.max(change.old_length);
        self.dirty = true;
        Self::mark_frame(&mut self.frames, doc, doc.root_frame(), from, to);
    }

    /// Size of the laid-out document, including the root frame margins.
    ///
    /// Valid after [`ensure_layout`](Self::ensure_layout); geometry queries
    /// and drawing revalidate on their own.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Right edge of the widest laid-out line.
    ///
    /// A page at least this wide fits every line without a forced wrap.
    pub fn ideal_width(&self) -> f32 {
        self.ideal_width
    }

    /// Bounding rectangle of a frame, table or floating object.
    ///
    /// `None` until the frame has been laid out.
    pub fn frame_rect(&self, frame: ObjectIndex) -> Option<Rect> {
        self.frames.get(&frame).map(|record| record.rect)
    }

    /// Bounding rectangle of a block.
    ///
    /// `None` until the block has been laid out.
    pub fn block_rect(&self, block: BlockId) -> Option<Rect> {
        self.blocks
            .get(&block)
            .map(|slot| Rect::from_origin_size(slot.position, slot.size))
    }

    /// The laid-out lines of a block, bringing the layout up to date first.
    pub fn block_lines<S>(
        &mut self,
        doc: &Document<B>,
        breaker: &mut S,
        block: BlockId,
    ) -> Option<BlockLines<'_, L>>
    where
        S: LineBreaker<B, Line = L>,
    {
        self.ensure_layout(doc, breaker);
        let slot = self.blocks.get(&block)?;
        Some(BlockLines {
            position: slot.position,
            size: slot.size,
            lines: &slot.lines,
        })
    }

    /// Brings the layout up to date with the document.
    ///
    /// Does nothing when no change has been recorded since the last pass.
    pub fn ensure_layout<S>(&mut self, doc: &Document<B>, breaker: &mut S)
    where
        S: LineBreaker<B, Line = L>,
    {
        if !self.dirty {
            return;
        }
        trace!(
            "layout pass: {} chars at page width {}",
            doc.len(),
            self.page_width
        );
        let root = doc.root_frame();
        let root_format = doc.formats().frame_format(doc.frame(root).format());
        let chrome = Chrome::of(root_format);
        let width = match root_format.width {
            Some(w) => w.max(0.0) + 2.0 * chrome.inset(),
            None => (self.page_width - 2.0 * chrome.margin).max(0.0),
        };
        let mut pass = LayoutPass {
            doc,
            breaker,
            frames: &mut self.frames,
            blocks: &mut self.blocks,
            handlers: &mut self.handlers,
            hasher: &self.hasher,
            indent_width: self.indent_width,
            ideal: 0.0,
            warned: false,
        };
        let height = pass.layout_frame(root, Point::new(chrome.margin, chrome.margin), width);
        let ideal = pass.ideal;
        self.size = Size::new(
            self.page_width.max(width + 2.0 * chrome.margin),
            height + 2.0 * chrome.margin,
        );
        self.ideal_width = ideal + chrome.margin;
        self.dirty = false;
        trace!(
            "layout pass done: {} x {}",
            self.size.width,
            self.size.height
        );
    }

    /// Maps a point to the closest document position.
    pub fn hit_test<S>(&mut self, doc: &Document<B>, breaker: &mut S, point: Point) -> HitResult
    where
        S: LineBreaker<B, Line = L>,
    {
        self.ensure_layout(doc, breaker);
        self.hit_frame(doc, doc.root_frame(), point)
    }

    fn invalidate_all(&mut self) {
        self.dirty = true;
        for record in self.frames.values_mut() {
            record.dirty = true;
        }
    }

    fn mark_frame(
        frames: &mut HashMap<ObjectIndex, FrameRecord>,
        doc: &Document<B>,
        frame: ObjectIndex,
        from: usize,
        to: usize,
    ) {
        let Some(range) = doc.frame_range(frame) else {
            return;
        };
        // Touching a boundary counts: an edit at a frame's edge can change
        // which block carries its sentinel.
        if range.start > to || range.end < from {
            return;
        }
        if let Some(record) = frames.get_mut(&frame) {
            record.dirty = true;
        }
        let Some(object) = doc.object(frame).and_then(DocObject::as_frame) else {
            return;
        };
        for &child in object.children() {
            Self::mark_frame(frames, doc, child, from, to);
        }
    }

    fn hit_frame(&self, doc: &Document<B>, frame: ObjectIndex, point: Point) -> HitResult {
        let Some(record) = self.frames.get(&frame) else {
            return HitResult {
                hit: HitPoint::Before,
                position: 0,
            };
        };
        let first = match doc.frame(frame).begin() {
            Some(begin) => begin + 1,
            None => 0,
        };
        let last = match doc.frame(frame).end() {
            Some(end) => end,
            None => doc.len(),
        };
        if point.y < record.rect.y0 {
            return HitResult {
                hit: HitPoint::Before,
                position: first,
            };
        }
        if point.y >= record.rect.y1 {
            return HitResult {
                hit: HitPoint::After,
                position: last,
            };
        }
        if let Some(geometry) = &record.table {
            // Route through the grid so spans resolve to their owning cell.
            let table = doc.table(frame);
            if table.rows() > 0 && table.columns() > 0 {
                let row = grid_index(&geometry.row_positions, point.y);
                let column = grid_index(&geometry.column_positions, point.x);
                let cell = table.cell_at(row, column);
                return self.hit_frame(doc, cell, point);
            }
            return HitResult {
                hit: HitPoint::Inside,
                position: first,
            };
        }
        if let Some(object) = doc.object(frame).and_then(DocObject::as_frame) {
            for &child in object.children() {
                let Some(child_record) = self.frames.get(&child) else {
                    continue;
                };
                if !child_record.rect.contains(point) {
                    continue;
                }
                if doc.frame(child).is_atomic() {
                    // Inline objects are one character; land just before it.
                    let position = doc.frame(child).begin().unwrap_or(first);
                    return HitResult {
                        hit: HitPoint::Inside,
                        position,
                    };
                }
                return self.hit_frame(doc, child, point);
            }
        }
        let mut position = first;
        for item in doc.frame_content(frame) {
            let FrameContent::Block(block) = item else {
                continue;
            };
            let Some(slot) = self.blocks.get(&block.id()) else {
                continue;
            };
            let top = slot.position.y;
            if point.y < top {
                return HitResult {
                    hit: HitPoint::Inside,
                    position: block.position(),
                };
            }
            if point.y < top + slot.size.height {
                return self.hit_block(&block, slot, point);
            }
            position = block.position() + block.content_len();
        }
        HitResult {
            hit: HitPoint::Inside,
            position,
        }
    }

    fn hit_block(&self, block: &BlockRef<'_, B>, slot: &BlockSlot<L>, point: Point) -> HitResult {
        let factor = block.format().line_height.unwrap_or(1.0).max(0.0);
        let base = block.position();
        let local = point - slot.position;
        for placed in &slot.lines {
            let advance = placed.line.height().max(0.0) * factor;
            let top = placed.origin.y;
            if local.y < top {
                return HitResult {
                    hit: HitPoint::Inside,
                    position: base + placed.line.text_range().start,
                };
            }
            if local.y < top + advance.max(placed.line.height()) {
                let range = placed.line.text_range();
                let leading = placed.origin.x;
                let trailing = leading + placed.line.full_width();
                if local.x < leading {
                    return HitResult {
                        hit: HitPoint::Inside,
                        position: base + range.start,
                    };
                }
                if local.x > trailing {
                    return HitResult {
                        hit: HitPoint::Inside,
                        position: base + range.end,
                    };
                }
                let offset = placed.line.offset_for_x(local.x - leading);
                return HitResult {
                    hit: HitPoint::Exact,
                    position: base + offset.min(range.end),
                };
            }
        }
        HitResult {
            hit: HitPoint::Inside,
            position: base + block.content_len(),
        }
    }
}

impl<B: Brush, L: ShapedLine> fmt::Debug for DocumentLayout<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLayout")
            .field("page_width", &self.page_width)
            .field("size", &self.size)
            .field("frames", &self.frames.len())
            .field("blocks", &self.blocks.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// How precisely a hit test resolved a point.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum HitPoint {
    /// The point was above the laid-out content.
    Before,
    /// The point was below the laid-out content.
    After,
    /// The point was inside the content but not on a character; the
    /// position is the closest edge.
    Inside,
    /// The point was on a character.
    Exact,
}

/// Result of a hit test.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HitResult {
    /// How the point resolved.
    pub hit: HitPoint,
    /// The document position closest to the point.
    pub position: usize,
}

/// A laid-out block's lines and their placement.
#[derive(Debug)]
pub struct BlockLines<'a, L> {
    position: Point,
    size: Size,
    lines: &'a [PlacedLine<L>],
}

impl<'a, L> BlockLines<'a, L> {
    /// Top-left corner of the block in document coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Size of the block's band, margins excluded.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The block's lines, with origins relative to [`position`](Self::position).
    pub fn lines(&self) -> &'a [PlacedLine<L>] {
        self.lines
    }
}

/// Index of the last grid slot starting at or before `value`.
fn grid_index(positions: &[f32], value: f32) -> usize {
    let mut index = 0;
    for (i, &position) in positions.iter().enumerate() {
        if value >= position {
            index = i;
        } else {
            break;
        }
    }
    index
}

/// An inline object that floats instead of sitting in its line.
#[derive(Copy, Clone, Debug)]
struct FloatAnchor {
    /// Content offset of the object's character in its block.
    offset: usize,
    object: ObjectIndex,
    size: Size,
    margin: f32,
    side: FramePosition,
}

/// One layout pass over the frame tree.
///
/// Borrows the caches apart so blocks, frames and handlers can be updated
/// while the document is read.
pub(crate) struct LayoutPass<'a, B: Brush, S: LineBreaker<B>> {
    pub(crate) doc: &'a Document<B>,
    pub(crate) breaker: &'a mut S,
    pub(crate) frames: &'a mut HashMap<ObjectIndex, FrameRecord>,
    pub(crate) blocks: &'a mut HashMap<BlockId, BlockSlot<S::Line>>,
    pub(crate) handlers: &'a mut HandlerRegistry<B, S::Line>,
    pub(crate) hasher: &'a DefaultHashBuilder,
    pub(crate) indent_width: f32,
    /// Right edge of the widest content seen so far.
    pub(crate) ideal: f32,
    /// Degenerate-width warning already emitted this pass.
    pub(crate) warned: bool,
}

impl<B: Brush, S: LineBreaker<B>> LayoutPass<'_, B, S> {
    /// Lays out `frame` with its border box at `origin`, `width` units wide.
    ///
    /// Returns the resulting border box height. A frame whose record is
    /// clean and whose origin and width are unchanged is skipped whole.
    pub(crate) fn layout_frame(&mut self, frame: ObjectIndex, origin: Point, width: f32) -> f32 {
        if let Some(record) = self.frames.get(&frame) {
            if !record.dirty
                && record.rect.x0 == origin.x
                && record.rect.y0 == origin.y
                && (record.rect.width() - width).abs() <= FIT_EPSILON
            {
                return record.rect.height();
            }
        }
        if self
            .doc
            .object(frame)
            .and_then(DocObject::as_table)
            .is_some()
        {
            return self.layout_table(frame, origin, width);
        }
        self.layout_flow(frame, origin, width, 0.0)
    }

    /// Lays out a plain frame's content top to bottom.
    ///
    /// `extra_padding` widens the frame's own padding; table cells use it
    /// to apply the table's cell padding.
    pub(crate) fn layout_flow(
        &mut self,
        frame: ObjectIndex,
        origin: Point,
        width: f32,
        extra_padding: f32,
    ) -> f32 {
        let doc = self.doc;
        let format = doc.formats().frame_format(doc.frame(frame).format());
        let inset = Chrome::of(format).inset() + extra_padding.max(0.0);
        let content_left = origin.x + inset;
        let content_right = (origin.x + width - inset).max(content_left);
        let content_top = origin.y + inset;
        let mut floats: SmallVec<[FloatRecord; 2]> = SmallVec::new();
        let mut y = content_top;
        for item in doc.frame_content(frame) {
            match item {
                FrameContent::Frame(child) => {
                    y = self.flow_child(child, content_left, content_right, y, &mut floats);
                }
                FrameContent::Block(block) => {
                    y = self.flow_block(&block, content_left, content_right, y, &mut floats);
                }
            }
        }
        // The frame reaches past any float still hanging below its text.
        for float in &floats {
            y = y.max(float.rect.y1 + float.margin);
        }
        let content_height = match format.height {
            Some(h) => h.max(0.0),
            None => (y - content_top).max(0.0),
        };
        let height = content_height + 2.0 * inset;
        let record = self.frames.entry(frame).or_default();
        record.rect = Rect::new(origin.x, origin.y, origin.x + width, origin.y + height);
        record.content = Rect::new(
            content_left,
            content_top,
            content_right,
            (origin.y + height - inset).max(content_top),
        );
        record.floats = floats;
        record.table = None;
        record.dirty = false;
        height
    }

    /// Flows one child frame and returns the new y cursor.
    fn flow_child(
        &mut self,
        child: ObjectIndex,
        left: f32,
        right: f32,
        y: f32,
        floats: &mut SmallVec<[FloatRecord; 2]>,
    ) -> f32 {
        let doc = self.doc;
        let format = doc.formats().frame_format(doc.frame(child).format());
        let chrome = Chrome::of(format);
        let margin = chrome.margin;
        let avail = (right - left).max(0.0);
        let width = match format.width {
            Some(w) => w.max(0.0) + 2.0 * chrome.inset(),
            None => (avail - 2.0 * margin).max(0.0),
        };
        match format.position.unwrap_or_default() {
            FramePosition::InFlow => {
                let top = y + margin;
                let height = self.layout_frame(child, Point::new(left + margin, top), width);
                self.bump_ideal(left + margin + width + margin);
                top + height + margin
            }
            side => {
                self.place_float_frame(child, side, width, left, right, y, floats);
                y
            }
        }
    }

    /// Measures a floating child frame and moves it into position.
    fn place_float_frame(
        &mut self,
        child: ObjectIndex,
        side: FramePosition,
        width: f32,
        left: f32,
        right: f32,
        anchor_y: f32,
        floats: &mut SmallVec<[FloatRecord; 2]>,
    ) {
        let doc = self.doc;
        let format = doc.formats().frame_format(doc.frame(child).format());
        let margin = Chrome::of(format).margin;
        // Measure first; the frame's height decides where it fits.
        let height = self.layout_frame(child, Point::ZERO, width);
        let outer_w = width + 2.0 * margin;
        let outer_h = (height + 2.0 * margin).max(PROBE_BAND);
        let y = find_y(floats, anchor_y, outer_w, outer_h, left, right);
        let (l, r) = float_margins(floats, y, outer_h, left, right);
        let x = if side == FramePosition::FloatRight {
            (r - margin - width).max(l + margin)
        } else {
            l + margin
        };
        let target = Point::new(x, y + margin);
        self.move_frame(child, target);
        floats.push(FloatRecord {
            object: child,
            rect: Rect::from_origin_size(target, Size::new(width, height)),
            margin,
            side,
        });
        self.bump_ideal(x + width + margin);
    }

    /// Moves a laid-out frame subtree so its border box starts at `target`.
    pub(crate) fn move_frame(&mut self, frame: ObjectIndex, target: Point) {
        let delta = match self.frames.get(&frame) {
            Some(record) => target - record.rect.origin(),
            None => return,
        };
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        self.shift_subtree(frame, delta);
    }

    fn shift_subtree(&mut self, frame: ObjectIndex, delta: Point) {
        if let Some(record) = self.frames.get_mut(&frame) {
            record.translate(delta);
        }
        let doc = self.doc;
        let Some(object) = doc.object(frame).and_then(DocObject::as_frame) else {
            return;
        };
        for &child in object.children() {
            self.shift_subtree(child, delta);
        }
        for item in doc.frame_content(frame) {
            if let FrameContent::Block(block) = item {
                if let Some(slot) = self.blocks.get_mut(&block.id()) {
                    slot.position += delta;
                }
            }
        }
    }

    /// Flows one block and returns the new y cursor.
    ///
    /// A block whose revision, width and surrounding floats match its
    /// cached slot reuses the cached lines; only its position moves.
    fn flow_block(
        &mut self,
        block: &BlockRef<'_, B>,
        left: f32,
        right: f32,
        y: f32,
        floats: &mut SmallVec<[FloatRecord; 2]>,
    ) -> f32 {
        let doc = self.doc;
        let id = block.id();
        let format = block.format();
        let indent_steps = match format.object_index.and_then(|index| doc.object(index)) {
            Some(DocObject::List(list)) => format
                .indent
                .or(doc.formats().list_format(list.format()).indent)
                .unwrap_or(0),
            _ => format.indent.unwrap_or(0),
        };
        let top = y + format.top_margin.unwrap_or(0.0).max(0.0);
        let bottom_margin = format.bottom_margin.unwrap_or(0.0).max(0.0);
        let base_left =
            (left + format.left_margin.unwrap_or(0.0) + f32::from(indent_steps) * self.indent_width)
                .min(right);
        let base_right = (right - format.right_margin.unwrap_or(0.0)).max(base_left);
        let width = base_right - base_left;
        let origin = Point::new(base_left, top);
        let key = float_fingerprint(self.hasher, floats, top);

        let cached = match self.blocks.get(&id) {
            Some(slot)
                if slot.revision == block.revision()
                    && (slot.width - width).abs() <= FIT_EPSILON
                    && slot.float_key == key =>
            {
                Some((slot.size, slot.natural_width, slot.floats.clone()))
            }
            _ => None,
        };
        if let Some((size, natural, replay)) = cached {
            if let Some(slot) = self.blocks.get_mut(&id) {
                slot.position = origin;
            }
            for (object, rect, margin, side) in replay {
                let rect = rect.translated(origin);
                floats.push(FloatRecord {
                    object,
                    rect,
                    margin,
                    side,
                });
                let record = self.frames.entry(object).or_default();
                record.rect = rect;
                record.content = rect;
                record.dirty = false;
            }
            self.bump_ideal(origin.x + natural);
            return top + size.height + bottom_margin;
        }

        let text = block.text();
        let mut runs: Vec<StyleRun<'_, B>> = Vec::new();
        let mut atoms = Vec::new();
        for run in block.runs() {
            let char_format = doc.formats().char_format(run.format);
            if run.kind == FragmentKind::FrameAtom {
                if let Some(object) = char_format.object_index {
                    atoms.push((run.range.start, object, char_format));
                }
            }
            runs.push(StyleRun {
                range: run.range.clone(),
                format: char_format,
            });
        }
        let mut items: Vec<InlineItem> = Vec::new();
        let mut anchors: Vec<FloatAnchor> = Vec::new();
        for &(offset, object, char_format) in &atoms {
            let frame_format = doc.formats().frame_format(doc.frame(object).format());
            let fallback = Size::new(
                frame_format.width.unwrap_or(0.0).max(0.0),
                frame_format.height.unwrap_or(0.0).max(0.0),
            );
            let size = self.handlers.resolve_size(char_format, fallback);
            match frame_format.position.unwrap_or_default() {
                FramePosition::InFlow => items.push(InlineItem {
                    position: offset,
                    width: size.width,
                    height: size.height,
                }),
                side => {
                    // Floats take no inline space; the band narrows instead.
                    items.push(InlineItem {
                        position: offset,
                        width: 0.0,
                        height: 0.0,
                    });
                    anchors.push(FloatAnchor {
                        offset,
                        object,
                        size,
                        margin: Chrome::of(frame_format).margin,
                        side,
                    });
                }
            }
        }

        let alignment = format.alignment.unwrap_or_default();
        let factor = format.line_height.unwrap_or(1.0).max(0.0);
        self.breaker.begin(&text, &runs, &items);
        let mut lines: Vec<PlacedLine<S::Line>> = Vec::new();
        let mut slot_floats: SmallVec<[(ObjectIndex, Rect, f32, FramePosition); 1]> =
            SmallVec::new();
        let mut next_anchor = 0;
        let mut line_y = top;
        let mut natural = 0.0_f32;
        let mut retries = 0;
        loop {
            let (probe_left, probe_right) =
                float_margins(floats, line_y, PROBE_BAND, base_left, base_right);
            let avail = (probe_right - probe_left).max(0.0);
            if avail <= 0.0 {
                self.warn_degenerate();
            }
            let Some(line) = self.breaker.next_line(avail) else {
                break;
            };
            let range = line.text_range();
            let mut placed = false;
            while next_anchor < anchors.len() && anchors[next_anchor].offset < range.end {
                let anchor = anchors[next_anchor];
                next_anchor += 1;
                self.place_inline_float(anchor, line_y, base_left, base_right, floats);
                self.record_slot_float(anchor, floats, &mut slot_floats, origin);
                placed = true;
            }
            let height = line.height().max(0.0);
            let (l, r) = float_margins(
                floats,
                line_y,
                height.max(PROBE_BAND),
                base_left,
                base_right,
            );
            let band = (r - l).max(0.0);
            if line.width() > band + FIT_EPSILON && retries < floats.len() {
                // The band narrowed under the line, usually because one of
                // its own floats just landed. Re-break the same text.
                retries += 1;
                self.breaker.rewind(range.start);
                if !placed {
                    let cleared = find_y(
                        floats,
                        line_y,
                        line.width().min(width),
                        height.max(PROBE_BAND),
                        base_left,
                        base_right,
                    );
                    if cleared > line_y {
                        line_y = cleared;
                    }
                }
                continue;
            }
            retries = 0;
            let x = l + match alignment {
                Alignment::Start | Alignment::Justified => 0.0,
                Alignment::End => (band - line.width()).max(0.0),
                Alignment::Middle => ((band - line.width()) / 2.0).max(0.0),
            };
            natural = natural.max(x - base_left + line.full_width());
            lines.push(PlacedLine {
                line,
                origin: Point::new(x - origin.x, line_y - origin.y),
            });
            line_y += height * factor;
        }
        // A breaker that stops early leaves anchors unplaced; drop them at
        // the end of the block so their records stay meaningful.
        while next_anchor < anchors.len() {
            let anchor = anchors[next_anchor];
            next_anchor += 1;
            self.place_inline_float(anchor, line_y, base_left, base_right, floats);
            self.record_slot_float(anchor, floats, &mut slot_floats, origin);
        }

        let size = Size::new(width, (line_y - top).max(0.0));
        self.bump_ideal(origin.x + natural);
        self.blocks.insert(
            id,
            BlockSlot {
                revision: block.revision(),
                width,
                float_key: key,
                position: origin,
                size,
                natural_width: natural,
                lines,
                floats: slot_floats,
            },
        );
        top + size.height + bottom_margin
    }

    /// Places a floating inline object into the nearest band that fits.
    fn place_inline_float(
        &mut self,
        anchor: FloatAnchor,
        anchor_y: f32,
        left: f32,
        right: f32,
        floats: &mut SmallVec<[FloatRecord; 2]>,
    ) {
        let outer_w = anchor.size.width + 2.0 * anchor.margin;
        let outer_h = (anchor.size.height + 2.0 * anchor.margin).max(PROBE_BAND);
        let y = find_y(floats, anchor_y, outer_w, outer_h, left, right);
        let (l, r) = float_margins(floats, y, outer_h, left, right);
        let x = if anchor.side == FramePosition::FloatRight {
            (r - anchor.margin - anchor.size.width).max(l + anchor.margin)
        } else {
            l + anchor.margin
        };
        let rect = Rect::from_origin_size(Point::new(x, y + anchor.margin), anchor.size);
        floats.push(FloatRecord {
            object: anchor.object,
            rect,
            margin: anchor.margin,
            side: anchor.side,
        });
        let record = self.frames.entry(anchor.object).or_default();
        record.rect = rect;
        record.content = rect;
        record.floats.clear();
        record.table = None;
        record.dirty = false;
        self.bump_ideal(rect.x1 + anchor.margin);
    }

    /// Remembers where a block's own float landed, relative to the block.
    fn record_slot_float(
        &mut self,
        anchor: FloatAnchor,
        floats: &[FloatRecord],
        slot_floats: &mut SmallVec<[(ObjectIndex, Rect, f32, FramePosition); 1]>,
        block_origin: Point,
    ) {
        let Some(record) = floats.iter().rev().find(|f| f.object == anchor.object) else {
            return;
        };
        slot_floats.push((
            anchor.object,
            record
                .rect
                .translated(Point::new(-block_origin.x, -block_origin.y)),
            anchor.margin,
            anchor.side,
        ));
    }

    pub(crate) fn bump_ideal(&mut self, extent: f32) {
        if extent > self.ideal {
            self.ideal = extent;
        }
    }

    pub(crate) fn warn_degenerate(&mut self) {
        if !self.warned {
            self.warned = true;
            warn!("no horizontal room for content; lines collapse to one character");
        }
    }
}
