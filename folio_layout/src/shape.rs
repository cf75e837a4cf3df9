// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The line breaking contract between the engine and a text stack.
//!
//! Folio does not shape or measure text itself. The engine hands each
//! block's content to a [`LineBreaker`] and consumes the lines it produces,
//! deciding before every line how much horizontal room is available. This
//! keeps the engine independent of any particular font or shaping stack:
//! anything that can segment styled text into measured lines can drive it.
//!
//! All offsets exchanged across this boundary are character offsets into
//! the block's content, matching the document model's position units.

use core::ops::Range;

use folio::{Brush, CharFormat};

/// A maximal run of characters sharing one character format.
#[derive(Clone, Debug)]
pub struct StyleRun<'a, B: Brush> {
    /// Content offsets covered by the run.
    pub range: Range<usize>,
    /// Format of every character in the run.
    pub format: &'a CharFormat<B>,
}

/// An inline object occupying a single character position.
///
/// The engine resolves the object's size (through its handler registry or
/// the owning frame's format) before line breaking starts; the breaker only
/// has to reserve the advance and grow the line if needed. Floated objects
/// are passed with zero extent so that offsets keep lining up while the
/// object itself is taken out of the flow.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct InlineItem {
    /// Content offset of the object character.
    pub position: usize,
    /// Horizontal space the object occupies on the line.
    pub width: f32,
    /// Vertical space the object needs.
    pub height: f32,
}

/// One laid-out line of a block, as measured by the breaker.
pub trait ShapedLine {
    /// Content offsets covered by the line.
    fn text_range(&self) -> Range<usize>;

    /// Advance of the line's content without trailing whitespace.
    fn width(&self) -> f32;

    /// Advance of the line's content including trailing whitespace.
    fn full_width(&self) -> f32;

    /// Height of the line.
    fn height(&self) -> f32;

    /// Distance from the line's top to its baseline.
    fn ascent(&self) -> f32;

    /// Horizontal offset of `offset` from the line's leading edge.
    ///
    /// `offset` is clamped into the line's range; the end offset maps to
    /// the trailing edge.
    fn x_for_offset(&self, offset: usize) -> f32;

    /// Content offset nearest to horizontal offset `x`.
    fn offset_for_x(&self, x: f32) -> usize;
}

/// Breaks one block's content into measured lines.
///
/// A breaker is re-armed with [`begin`](Self::begin) for every block and
/// then queried line by line. The sequence is lazy so the engine can adjust
/// the available width between lines when floats narrow the band.
pub trait LineBreaker<B: Brush> {
    /// The line type produced by this breaker.
    type Line: ShapedLine;

    /// Arms the breaker with a block's content.
    ///
    /// `runs` partitions `text` by character format and `items` lists the
    /// inline objects embedded in it. Implementations must copy whatever
    /// they need; none of the borrows outlive the call.
    fn begin(&mut self, text: &str, runs: &[StyleRun<'_, B>], items: &[InlineItem]);

    /// Produces the next line, at most `max_width` wide.
    ///
    /// Returns `None` once the content is exhausted. A line must consume at
    /// least one character even when `max_width` is zero or too small, so
    /// that layout always terminates. Empty content yields exactly one
    /// empty line, giving empty blocks their natural height.
    fn next_line(&mut self, max_width: f32) -> Option<Self::Line>;

    /// Repositions the breaker so the next line starts at `offset`.
    ///
    /// The engine rewinds after discovering that a produced line no longer
    /// fits, typically because a float claimed part of its band, and asks
    /// for the same text again at a smaller width.
    fn rewind(&mut self, offset: usize);
}
