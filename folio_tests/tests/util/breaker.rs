// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A line breaker with fixed per-character metrics.
//!
//! Every character is [`ADVANCE`] units wide and lines are [`LINE_HEIGHT`]
//! tall, so tests can predict geometry exactly. Breaking is greedy with a
//! preference for the last space on the line, like a real shaper but without
//! fonts.

use core::ops::Range;

use folio::Brush;
use folio_layout::{InlineItem, LineBreaker, ShapedLine, StyleRun};

/// Horizontal advance of every character.
pub(crate) const ADVANCE: f32 = 8.0;
/// Height of a line of text.
pub(crate) const LINE_HEIGHT: f32 = 16.0;
/// Distance from the top of a line to its baseline.
pub(crate) const ASCENT: f32 = 12.0;

/// A line produced by [`FixedBreaker`].
#[derive(Clone, Debug)]
pub(crate) struct FixedLine {
    range: Range<usize>,
    advances: Vec<f32>,
    width: f32,
    full_width: f32,
    height: f32,
}

impl ShapedLine for FixedLine {
    fn text_range(&self) -> Range<usize> {
        self.range.clone()
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn full_width(&self) -> f32 {
        self.full_width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn ascent(&self) -> f32 {
        ASCENT
    }

    fn x_for_offset(&self, offset: usize) -> f32 {
        let end = offset.clamp(self.range.start, self.range.end) - self.range.start;
        self.advances[..end].iter().sum()
    }

    fn offset_for_x(&self, x: f32) -> usize {
        let mut edge = 0.0;
        for (i, advance) in self.advances.iter().enumerate() {
            if x < edge + advance / 2.0 {
                return self.range.start + i;
            }
            edge += advance;
        }
        self.range.end
    }
}

/// Greedy word-wrapping breaker over fixed-width characters.
///
/// Inline objects override the advance (and may raise the height) of the
/// character at their position.
#[derive(Clone, Default, Debug)]
pub(crate) struct FixedBreaker {
    chars: Vec<char>,
    advances: Vec<f32>,
    heights: Vec<f32>,
    cursor: usize,
    done: bool,
}

impl FixedBreaker {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl<B: Brush> LineBreaker<B> for FixedBreaker {
    type Line = FixedLine;

    fn begin(&mut self, text: &str, _runs: &[StyleRun<'_, B>], items: &[InlineItem]) {
        self.chars = text.chars().collect();
        self.advances = vec![ADVANCE; self.chars.len()];
        self.heights = vec![LINE_HEIGHT; self.chars.len()];
        for item in items {
            if let Some(slot) = self.advances.get_mut(item.position) {
                *slot = item.width.max(0.0);
            }
            if let Some(slot) = self.heights.get_mut(item.position) {
                *slot = item.height.max(LINE_HEIGHT);
            }
        }
        self.cursor = 0;
        self.done = false;
    }

    fn next_line(&mut self, max_width: f32) -> Option<FixedLine> {
        if self.done {
            return None;
        }
        if self.chars.is_empty() {
            self.done = true;
            return Some(FixedLine {
                range: 0..0,
                advances: Vec::new(),
                width: 0.0,
                full_width: 0.0,
                height: LINE_HEIGHT,
            });
        }
        if self.cursor >= self.chars.len() {
            self.done = true;
            return None;
        }
        let start = self.cursor;
        let mut end = start;
        let mut used = 0.0;
        let mut after_space = None;
        while end < self.chars.len() {
            let advance = self.advances[end];
            // Never emit an empty line; the first character always fits.
            if end > start && used + advance > max_width + 1e-3 {
                break;
            }
            used += advance;
            end += 1;
            if self.chars[end - 1] == ' ' {
                after_space = Some(end);
            }
        }
        if end < self.chars.len() {
            if let Some(space_end) = after_space {
                end = space_end;
            }
        }
        let advances: Vec<f32> = self.advances[start..end].to_vec();
        let full_width: f32 = advances.iter().sum();
        // Trailing spaces hang off the line end.
        let mut trimmed = end;
        while trimmed > start && self.chars[trimmed - 1] == ' ' {
            trimmed -= 1;
        }
        let width: f32 = self.advances[start..trimmed].iter().sum();
        let height = self.heights[start..end]
            .iter()
            .fold(LINE_HEIGHT, |tallest, h| tallest.max(*h));
        self.cursor = end;
        Some(FixedLine {
            range: start..end,
            advances,
            width,
            full_width,
            height,
        })
    }

    fn rewind(&mut self, offset: usize) {
        self.cursor = offset.min(self.chars.len());
        self.done = false;
    }
}
