// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint traversal.
//!
//! Drawing walks the frame tree in document order: each frame paints its
//! decoration, then its children and blocks. Per block, the engine fills
//! the selection highlight, hands every line to the device and draws the
//! inline objects the line carries. The device never sees document
//! positions; everything it receives is geometry and block-local offsets.

use alloc::vec::Vec;
use core::ops::Range;

use folio::{
    list_marker_text, BlockId, BlockRef, Brush, CharFormat, DocObject, Document, FragmentKind,
    FrameContent, FramePosition, ListStyle, ObjectIndex, VerticalAlignment,
};
use hashbrown::HashMap;

use crate::data::{BlockSlot, FrameRecord, PlacedLine};
use crate::geom::{Point, Rect, Size};
use crate::layout::DocumentLayout;
use crate::paint::{HandlerRegistry, PaintContext, PaintDevice};
use crate::shape::{LineBreaker, ShapedLine};

/// Space between a list marker and the block it labels.
const MARKER_GAP: f32 = 6.0;

/// Side of a shape marker as a fraction of the first line's ascent.
const MARKER_SCALE: f32 = 0.4;

impl<B: Brush, L: ShapedLine> DocumentLayout<B, L> {
    /// Draws the document, bringing the layout up to date first.
    pub fn draw<S, P>(
        &mut self,
        doc: &Document<B>,
        breaker: &mut S,
        device: &mut P,
        ctx: &PaintContext<B>,
    ) where
        S: LineBreaker<B, Line = L>,
        P: PaintDevice<B, L>,
    {
        self.ensure_layout(doc, breaker);
        let mut pass = DrawPass {
            doc,
            frames: &self.frames,
            blocks: &self.blocks,
            handlers: &mut self.handlers,
            ctx,
        };
        pass.draw_frame(device, doc.root_frame());
    }
}

/// One traversal of the laid-out tree against a device.
struct DrawPass<'a, B: Brush, L> {
    doc: &'a Document<B>,
    frames: &'a HashMap<ObjectIndex, FrameRecord>,
    blocks: &'a HashMap<BlockId, BlockSlot<L>>,
    handlers: &'a mut HandlerRegistry<B, L>,
    ctx: &'a PaintContext<B>,
}

impl<B: Brush, L: ShapedLine> DrawPass<'_, B, L> {
    fn clipped_out(&self, rect: Rect) -> bool {
        match &self.ctx.clip {
            Some(clip) => !clip.intersects(&rect),
            None => false,
        }
    }

    fn draw_frame(&mut self, device: &mut dyn PaintDevice<B, L>, frame: ObjectIndex) {
        let doc = self.doc;
        let frames = self.frames;
        let Some(record) = frames.get(&frame) else {
            return;
        };
        if self.clipped_out(record.rect) {
            return;
        }
        let format = doc.formats().frame_format(doc.frame(frame).format());
        if let Some(background) = &format.background {
            device.fill_rect(record.rect, background);
        }
        let border = format.border.unwrap_or(0.0).max(0.0);
        if border > 0.0 {
            let brush = format.border_brush.clone().unwrap_or_default();
            draw_border(device, record.rect, border, &brush);
        }
        if record.table.is_some() {
            self.draw_table(device, frame);
            return;
        }
        for item in doc.frame_content(frame) {
            match item {
                FrameContent::Frame(child) => self.draw_frame(device, child),
                FrameContent::Block(block) => self.draw_block(device, &block),
            }
        }
    }

    /// Draws a table's cell grid and the cells themselves.
    fn draw_table(&mut self, device: &mut dyn PaintDevice<B, L>, frame: ObjectIndex) {
        let doc = self.doc;
        let frames = self.frames;
        let table = doc.table(frame);
        let format = doc.formats().table_format(doc.frame(frame).format());
        let border = format.frame.border.unwrap_or(0.0).max(0.0);
        let brush = format.frame.border_brush.clone().unwrap_or_default();
        for &cell in table.cells() {
            let Some(record) = frames.get(&cell) else {
                continue;
            };
            if self.clipped_out(record.rect) {
                continue;
            }
            if border > 0.0 {
                device.draw_rect(record.rect, &brush);
            }
            self.draw_frame(device, cell);
        }
    }

    fn draw_block(&mut self, device: &mut dyn PaintDevice<B, L>, block: &BlockRef<'_, B>) {
        let doc = self.doc;
        let blocks = self.blocks;
        let ctx = self.ctx;
        let Some(slot) = blocks.get(&block.id()) else {
            return;
        };
        let rect = Rect::from_origin_size(slot.position, slot.size);
        if self.clipped_out(rect) && slot.floats.is_empty() {
            return;
        }
        let format = block.format();
        if let Some(background) = &format.background {
            device.fill_rect(rect, background);
        }
        if format.object_index.is_some() {
            self.draw_marker(device, block, slot);
        }

        let base = block.position();
        let content_len = block.content_len();
        let mut atoms: Vec<(usize, &CharFormat<B>)> = Vec::new();
        for run in block.runs() {
            if run.kind == FragmentKind::FrameAtom {
                atoms.push((run.range.start, doc.formats().char_format(run.format)));
            }
        }
        let mut selections: Vec<(Range<usize>, &B)> = Vec::new();
        for span in &ctx.selections {
            let start = span.range.start.max(base);
            let end = span.range.end.min(base + content_len);
            if start < end {
                selections.push((start - base..end - base, &span.brush));
            }
        }
        let cursor = ctx.cursor_position.and_then(|position| {
            (position >= base && position <= base + content_len).then(|| position - base)
        });

        let last = slot.lines.len().saturating_sub(1);
        for (index, placed) in slot.lines.iter().enumerate() {
            let origin = slot.position + placed.origin;
            let range = placed.line.text_range();
            let height = placed.line.height();
            for (selection, brush) in &selections {
                let start = selection.start.max(range.start);
                let end = selection.end.min(range.end);
                if start < end {
                    let x0 = origin.x + placed.line.x_for_offset(start);
                    let x1 = origin.x + placed.line.x_for_offset(end);
                    device.fill_rect(Rect::new(x0, origin.y, x1, origin.y + height), brush);
                }
            }
            // The caret belongs to the line containing its offset; the end
            // of a wrapped line belongs to the next line.
            let line_cursor = cursor.filter(|&offset| {
                offset >= range.start
                    && (offset < range.end || (index == last && offset == range.end))
            });
            let line_selections: Vec<Range<usize>> = selections
                .iter()
                .filter_map(|(selection, _)| {
                    let start = selection.start.max(range.start);
                    let end = selection.end.min(range.end);
                    (start < end).then(|| start..end)
                })
                .collect();
            device.draw_line(origin, &placed.line, line_cursor, &line_selections);
            for &(offset, char_format) in &atoms {
                if offset >= range.start && offset < range.end {
                    self.draw_inline_object(device, placed, origin, offset, char_format, &selections);
                }
            }
        }

        // Floats anchored in this block draw at their placed rectangles.
        for &(object, relative, _, _) in &slot.floats {
            let float_rect = relative.translated(slot.position);
            if self.clipped_out(float_rect) {
                continue;
            }
            let Some(&(_, char_format)) = atoms
                .iter()
                .find(|(_, f)| f.object_index == Some(object))
            else {
                continue;
            };
            if let Some(handler) = self.handlers.get_mut(char_format.object_type) {
                handler.draw(device, float_rect, char_format, false);
            }
        }
    }

    /// Draws one in-flow inline object sitting in `placed`.
    fn draw_inline_object(
        &mut self,
        device: &mut dyn PaintDevice<B, L>,
        placed: &PlacedLine<L>,
        origin: Point,
        offset: usize,
        format: &CharFormat<B>,
        selections: &[(Range<usize>, &B)],
    ) {
        let doc = self.doc;
        let Some(object) = format.object_index else {
            return;
        };
        let frame_format = doc.formats().frame_format(doc.frame(object).format());
        if frame_format.position.unwrap_or_default() != FramePosition::InFlow {
            return;
        }
        let fallback = Size::new(
            frame_format.width.unwrap_or(0.0).max(0.0),
            frame_format.height.unwrap_or(0.0).max(0.0),
        );
        let size = self.handlers.resolve_size(format, fallback);
        let x = origin.x + placed.line.x_for_offset(offset);
        let height = placed.line.height();
        let ascent = placed.line.ascent();
        let top = match format.vertical_alignment.unwrap_or_default() {
            VerticalAlignment::Baseline => origin.y + ascent - size.height,
            VerticalAlignment::Top => origin.y,
            VerticalAlignment::Middle => origin.y + (height - size.height) / 2.0,
            VerticalAlignment::Bottom => origin.y + height - size.height,
        };
        let rect = Rect::from_origin_size(Point::new(x, top), size);
        let selected = selections.iter().any(|(range, _)| range.contains(&offset));
        if let Some(handler) = self.handlers.get_mut(format.object_type) {
            handler.draw(device, rect, format, selected);
        }
    }

    /// Draws the list marker left of a block's first line.
    fn draw_marker(
        &mut self,
        device: &mut dyn PaintDevice<B, L>,
        block: &BlockRef<'_, B>,
        slot: &BlockSlot<L>,
    ) {
        let doc = self.doc;
        let Some(list_index) = block.format().object_index else {
            return;
        };
        let Some(list) = doc.object(list_index).and_then(DocObject::as_list) else {
            return;
        };
        let style = doc
            .formats()
            .list_format(list.format())
            .style
            .unwrap_or_default();
        let Some(first) = slot.lines.first() else {
            return;
        };
        let origin = slot.position + first.origin;
        let ascent = first.line.ascent().max(0.0);
        let format = doc.formats().char_format(block.char_format_index());
        if style.is_numbered() {
            let number = doc.list_item_number(list_index, block.id()).unwrap_or(1);
            let text = list_marker_text(style, number);
            let size = device.measure_text(&text, format);
            let position = Point::new(origin.x - size.width - MARKER_GAP, origin.y + ascent);
            device.draw_text(position, &text, format);
            return;
        }
        let side = (ascent * MARKER_SCALE).max(1.0);
        let rect = Rect::new(
            origin.x - MARKER_GAP - side,
            origin.y + ascent - side,
            origin.x - MARKER_GAP,
            origin.y + ascent,
        );
        let brush = format.foreground.clone().unwrap_or_default();
        match style {
            ListStyle::Disc => device.draw_ellipse(rect, &brush, true),
            ListStyle::Circle => device.draw_ellipse(rect, &brush, false),
            ListStyle::Square => device.fill_rect(rect, &brush),
            _ => {}
        }
    }
}

/// Strokes a border as four filled strips just inside `rect`.
fn draw_border<B: Brush, L>(
    device: &mut dyn PaintDevice<B, L>,
    rect: Rect,
    width: f32,
    brush: &B,
) {
    device.fill_rect(Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + width), brush);
    device.fill_rect(Rect::new(rect.x0, rect.y1 - width, rect.x1, rect.y1), brush);
    device.fill_rect(
        Rect::new(rect.x0, rect.y0 + width, rect.x0 + width, rect.y1 - width),
        brush,
    );
    device.fill_rect(
        Rect::new(rect.x1 - width, rect.y0 + width, rect.x1, rect.y1 - width),
        brush,
    );
}
