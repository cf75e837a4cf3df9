// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions and types shared across tests.

mod breaker;
mod device;

pub(crate) use breaker::{FixedBreaker, FixedLine, ADVANCE, ASCENT, LINE_HEIGHT};
pub(crate) use device::{PaintEvent, RecordingDevice};

use folio::Document;
use folio_layout::DocumentLayout;

/// Brush type used throughout the tests; distinct values stand in for colors.
pub(crate) type TestBrush = u32;

/// A document holding `text`, inserted with the default character format.
pub(crate) fn doc_with(text: &str) -> Document<TestBrush> {
    let mut doc = Document::new();
    let format = doc.default_char_format();
    doc.insert(0, text, format);
    doc
}

/// Lays `doc` out at `page_width` and returns the layout and its breaker.
pub(crate) fn laid_out(
    doc: &Document<TestBrush>,
    page_width: f32,
) -> (DocumentLayout<TestBrush, FixedLine>, FixedBreaker) {
    let mut layout = DocumentLayout::new(page_width);
    let mut breaker = FixedBreaker::new();
    layout.ensure_layout(doc, &mut breaker);
    (layout, breaker)
}

/// Asserts two layout coordinates are equal up to rounding noise.
#[track_caller]
pub(crate) fn assert_near(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 1e-3,
        "expected {expected}, got {actual}"
    );
}
