// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A paint device that records every call instead of rasterizing.

use core::ops::Range;

use folio::CharFormat;
use folio_layout::{PaintDevice, Point, Rect, ShapedLine, Size};

use super::breaker::{ADVANCE, LINE_HEIGHT};
use super::TestBrush;

/// One recorded paint call.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum PaintEvent {
    Line {
        origin: Point,
        range: Range<usize>,
        cursor: Option<usize>,
        selections: Vec<Range<usize>>,
    },
    FillRect {
        rect: Rect,
        brush: TestBrush,
    },
    StrokeRect {
        rect: Rect,
        brush: TestBrush,
    },
    Ellipse {
        rect: Rect,
        brush: TestBrush,
        filled: bool,
    },
    Polygon {
        corners: usize,
        brush: TestBrush,
    },
    Text {
        origin: Point,
        text: String,
    },
}

/// Paint device for assertions; text measures at the breaker's fixed metrics.
#[derive(Clone, Default, Debug)]
pub(crate) struct RecordingDevice {
    pub(crate) events: Vec<PaintEvent>,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The recorded lines as `(origin, text range)`, in paint order.
    pub(crate) fn lines(&self) -> Vec<(Point, Range<usize>)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PaintEvent::Line { origin, range, .. } => Some((*origin, range.clone())),
                _ => None,
            })
            .collect()
    }

    /// The recorded rectangle fills as `(rect, brush)`, in paint order.
    pub(crate) fn fills(&self) -> Vec<(Rect, TestBrush)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PaintEvent::FillRect { rect, brush } => Some((*rect, *brush)),
                _ => None,
            })
            .collect()
    }

    /// The recorded standalone texts as `(origin, text)`, in paint order.
    pub(crate) fn texts(&self) -> Vec<(Point, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PaintEvent::Text { origin, text } => Some((*origin, text.clone())),
                _ => None,
            })
            .collect()
    }
}

impl<L: ShapedLine> PaintDevice<TestBrush, L> for RecordingDevice {
    fn draw_line(
        &mut self,
        origin: Point,
        line: &L,
        cursor: Option<usize>,
        selections: &[Range<usize>],
    ) {
        self.events.push(PaintEvent::Line {
            origin,
            range: line.text_range(),
            cursor,
            selections: selections.to_vec(),
        });
    }

    fn fill_rect(&mut self, rect: Rect, brush: &TestBrush) {
        self.events.push(PaintEvent::FillRect {
            rect,
            brush: *brush,
        });
    }

    fn draw_rect(&mut self, rect: Rect, brush: &TestBrush) {
        self.events.push(PaintEvent::StrokeRect {
            rect,
            brush: *brush,
        });
    }

    fn draw_ellipse(&mut self, rect: Rect, brush: &TestBrush, filled: bool) {
        self.events.push(PaintEvent::Ellipse {
            rect,
            brush: *brush,
            filled,
        });
    }

    fn draw_polygon(&mut self, points: &[Point], brush: &TestBrush) {
        self.events.push(PaintEvent::Polygon {
            corners: points.len(),
            brush: *brush,
        });
    }

    fn draw_text(&mut self, origin: Point, text: &str, _format: &CharFormat<TestBrush>) {
        self.events.push(PaintEvent::Text {
            origin,
            text: text.to_owned(),
        });
    }

    fn measure_text(&mut self, text: &str, _format: &CharFormat<TestBrush>) -> Size {
        Size::new(text.chars().count() as f32 * ADVANCE, LINE_HEIGHT)
    }
}
