// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The painting contract and per-paint state.
//!
//! Drawing is delegated to a [`PaintDevice`] supplied by the embedder. The
//! engine walks the laid-out document and issues primitive calls in
//! document order; the device decides what a brush, a glyph or a rule
//! actually look like. Inline objects (images and other embedded content)
//! are drawn through [`InlineObjectHandler`]s registered per object type.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use folio::{Brush, CharFormat};
use hashbrown::HashMap;

use crate::geom::{Point, Rect, Size};

/// Everything the engine needs a renderer to do.
///
/// `L` is the line type of the [`LineBreaker`](crate::LineBreaker) driving
/// the layout, so devices receive the very lines the breaker measured.
/// Offset parameters are character offsets local to the block being drawn.
pub trait PaintDevice<B: Brush, L> {
    /// Draws one line of text at `origin` (the line's top-left corner).
    ///
    /// `cursor` is the offset the caret sits at, when it falls on this
    /// line. `selections` are the selected sub-ranges overlapping the
    /// line, for devices that restyle selected glyphs; the engine has
    /// already filled the highlight rectangles behind them.
    fn draw_line(&mut self, origin: Point, line: &L, cursor: Option<usize>, selections: &[Range<usize>]);

    /// Fills a rectangle.
    fn fill_rect(&mut self, rect: Rect, brush: &B);

    /// Strokes a rectangle outline.
    fn draw_rect(&mut self, rect: Rect, brush: &B);

    /// Draws the ellipse inscribed in `rect`, filled or outlined.
    fn draw_ellipse(&mut self, rect: Rect, brush: &B, filled: bool);

    /// Fills the polygon spanned by `points`.
    fn draw_polygon(&mut self, points: &[Point], brush: &B);

    /// Draws a short standalone string, used for list markers.
    ///
    /// `origin` is the left end of the text's baseline.
    fn draw_text(&mut self, origin: Point, text: &str, format: &CharFormat<B>);

    /// Measures the string `draw_text` would draw.
    fn measure_text(&mut self, text: &str, format: &CharFormat<B>) -> Size;
}

/// A selected range and the brush to highlight it with.
#[derive(Clone, Debug)]
pub struct SelectionSpan<B> {
    /// Selected document positions.
    pub range: Range<usize>,
    /// Brush used to fill the highlight behind the range.
    pub brush: B,
}

/// Per-paint state handed to [`DocumentLayout::draw`](crate::DocumentLayout::draw).
#[derive(Clone, Debug)]
pub struct PaintContext<B> {
    /// Document position of the caret, if one should be shown.
    pub cursor_position: Option<usize>,
    /// Active selections, in document positions.
    pub selections: Vec<SelectionSpan<B>>,
    /// Only content intersecting this rectangle is drawn, when set.
    pub clip: Option<Rect>,
}

impl<B> Default for PaintContext<B> {
    fn default() -> Self {
        Self {
            cursor_position: None,
            selections: Vec::new(),
            clip: None,
        }
    }
}

/// Measures and draws inline objects of one consumer-defined type.
///
/// Handlers are registered on the layout with the `object_type` value the
/// document stores in the object's character format. An object without a
/// handler falls back to the width and height of its frame format and is
/// not drawn.
pub trait InlineObjectHandler<B: Brush, L> {
    /// Natural size of an object carrying `format`.
    fn intrinsic_size(&mut self, format: &CharFormat<B>) -> Size;

    /// Draws the object into `rect`.
    fn draw(
        &mut self,
        device: &mut dyn PaintDevice<B, L>,
        rect: Rect,
        format: &CharFormat<B>,
        selected: bool,
    );
}

/// Inline object handlers keyed by object type.
pub(crate) struct HandlerRegistry<B: Brush, L> {
    handlers: HashMap<u16, Box<dyn InlineObjectHandler<B, L>>>,
}

impl<B: Brush, L> HandlerRegistry<B, L> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub(crate) fn register(
        &mut self,
        object_type: u16,
        handler: Box<dyn InlineObjectHandler<B, L>>,
    ) {
        self.handlers.insert(object_type, handler);
    }

    pub(crate) fn get_mut(
        &mut self,
        object_type: Option<u16>,
    ) -> Option<&mut dyn InlineObjectHandler<B, L>> {
        let handler = self.handlers.get_mut(&object_type?)?;
        Some(handler.as_mut())
    }

    /// Resolves an object's size: handler first, frame format second.
    pub(crate) fn resolve_size(
        &mut self,
        format: &CharFormat<B>,
        fallback: Size,
    ) -> Size {
        match self.get_mut(format.object_type) {
            Some(handler) => handler.intrinsic_size(format),
            None => fallback,
        }
    }
}

impl<B: Brush, L> fmt::Debug for HandlerRegistry<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.handlers.len())
            .finish_non_exhaustive()
    }
}
