// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint traversal: line order, highlights, markers, objects and borders.

use crate::util::{
    doc_with, laid_out, FixedBreaker, FixedLine, PaintEvent, RecordingDevice, TestBrush, ADVANCE,
    ASCENT, LINE_HEIGHT,
};
use folio::{
    BlockFormat, CharFormat, Document, Format, FormatChangeMode, FrameFormat, FramePosition,
    ListFormat, ListStyle,
};
use folio_layout::{
    DocumentLayout, InlineObjectHandler, PaintContext, PaintDevice, Point, Rect, SelectionSpan,
    Size,
};

/// A 10 x 10 object that paints a fill and a triangle through the device.
struct Badge;

impl InlineObjectHandler<TestBrush, FixedLine> for Badge {
    fn intrinsic_size(&mut self, _format: &CharFormat<TestBrush>) -> Size {
        Size::new(10.0, 10.0)
    }

    fn draw(
        &mut self,
        device: &mut dyn PaintDevice<TestBrush, FixedLine>,
        rect: Rect,
        _format: &CharFormat<TestBrush>,
        _selected: bool,
    ) {
        device.fill_rect(rect, &42);
        device.draw_polygon(
            &[
                rect.origin(),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
            ],
            &42,
        );
    }
}

fn draw_plain(doc: &Document<TestBrush>, page_width: f32) -> RecordingDevice {
    let (mut layout, mut breaker) = laid_out(doc, page_width);
    let mut device = RecordingDevice::new();
    layout.draw(doc, &mut breaker, &mut device, &PaintContext::default());
    device
}

#[test]
fn draw_lines_follow_block_order() {
    let doc = doc_with("ab\ncd");
    let device = draw_plain(&doc, 200.0);
    let lines = device.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], (Point::new(0.0, 0.0), 0..2));
    assert_eq!(lines[1], (Point::new(0.0, LINE_HEIGHT), 0..2));
}

#[test]
fn draw_block_background_precedes_its_lines() {
    let mut doc = doc_with("ab");
    let tinted = BlockFormat {
        background: Some(7),
        ..BlockFormat::default()
    };
    doc.set_block_format(0, 1, &tinted, FormatChangeMode::Merge);

    let device = draw_plain(&doc, 100.0);
    let fill = device
        .events
        .iter()
        .position(|event| matches!(event, PaintEvent::FillRect { brush: 7, .. }))
        .expect("background fill missing");
    let line = device
        .events
        .iter()
        .position(|event| matches!(event, PaintEvent::Line { .. }))
        .expect("line missing");
    assert!(fill < line, "the background must go under the text");
    assert_eq!(
        device.fills()[0],
        (Rect::new(0.0, 0.0, 100.0, LINE_HEIGHT), 7)
    );
}

#[test]
fn draw_selections_highlight_and_reach_the_device() {
    let doc = doc_with("abcd");
    let (mut layout, mut breaker) = laid_out(&doc, 100.0);
    let mut device = RecordingDevice::new();
    let ctx = PaintContext {
        cursor_position: Some(2),
        selections: vec![SelectionSpan {
            range: 1..3,
            brush: 9,
        }],
        clip: None,
    };
    layout.draw(&doc, &mut breaker, &mut device, &ctx);

    // A highlight band behind characters 1..3.
    assert!(device
        .fills()
        .contains(&(Rect::new(ADVANCE, 0.0, 3.0 * ADVANCE, LINE_HEIGHT), 9)));

    let (cursor, selections) = device
        .events
        .iter()
        .find_map(|event| match event {
            PaintEvent::Line {
                cursor, selections, ..
            } => Some((*cursor, selections.clone())),
            _ => None,
        })
        .expect("line missing");
    assert_eq!(cursor, Some(2));
    assert_eq!(selections, vec![1..3]);
}

#[test]
fn draw_numbered_list_markers_count_their_items() {
    let mut doc = doc_with("item\nnext");
    let list = doc.create_object(Format::List(ListFormat {
        style: Some(ListStyle::Decimal),
        indent: Some(1),
        ..ListFormat::default()
    }));
    let member = BlockFormat {
        object_index: Some(list),
        ..BlockFormat::default()
    };
    doc.set_block_format(0, 0, &member, FormatChangeMode::Merge);
    doc.set_block_format(5, 0, &member, FormatChangeMode::Merge);

    let device = draw_plain(&doc, 200.0);
    assert_eq!(
        device.texts(),
        vec![
            (Point::new(18.0, ASCENT), "1.".to_owned()),
            (Point::new(18.0, LINE_HEIGHT + ASCENT), "2.".to_owned()),
        ]
    );
}

#[test]
fn draw_disc_markers_fill_an_ellipse() {
    let mut doc = doc_with("item");
    let list = doc.create_object(Format::List(ListFormat {
        style: Some(ListStyle::Disc),
        indent: Some(1),
        ..ListFormat::default()
    }));
    let member = BlockFormat {
        object_index: Some(list),
        ..BlockFormat::default()
    };
    doc.set_block_format(0, 0, &member, FormatChangeMode::Merge);

    let device = draw_plain(&doc, 200.0);
    let side = (ASCENT * 0.4_f32).max(1.0);
    let rect = Rect::new(40.0 - 6.0 - side, ASCENT - side, 40.0 - 6.0, ASCENT);
    assert!(device.events.contains(&PaintEvent::Ellipse {
        rect,
        brush: 0,
        filled: true,
    }));
}

#[test]
fn draw_inline_objects_use_their_handler() {
    let mut doc = doc_with("ab");
    doc.insert_inline_object(
        2,
        FrameFormat::default(),
        CharFormat {
            object_type: Some(5),
            ..CharFormat::default()
        },
    );

    let mut layout: DocumentLayout<TestBrush, FixedLine> = DocumentLayout::new(100.0);
    layout.register_handler(5, Box::new(Badge));
    let mut breaker = FixedBreaker::new();
    let mut device = RecordingDevice::new();
    layout.draw(&doc, &mut breaker, &mut device, &PaintContext::default());

    // Baseline aligned: the bottom of the object sits on the baseline.
    let expected = Rect::new(16.0, ASCENT - 10.0, 26.0, ASCENT);
    assert!(device.fills().contains(&(expected, 42)));
    assert!(device.events.contains(&PaintEvent::Polygon {
        corners: 3,
        brush: 42,
    }));
}

#[test]
fn draw_floats_paint_at_their_placed_rects() {
    let mut doc = doc_with(&"a".repeat(8));
    doc.insert_inline_object(
        0,
        FrameFormat {
            position: Some(FramePosition::FloatLeft),
            ..FrameFormat::default()
        },
        CharFormat {
            object_type: Some(5),
            ..CharFormat::default()
        },
    );

    let mut layout: DocumentLayout<TestBrush, FixedLine> = DocumentLayout::new(200.0);
    layout.register_handler(5, Box::new(Badge));
    let mut breaker = FixedBreaker::new();
    let mut device = RecordingDevice::new();
    layout.draw(&doc, &mut breaker, &mut device, &PaintContext::default());

    // The handler sizes the float and draws it where it was placed.
    assert!(device.fills().contains(&(Rect::new(0.0, 0.0, 10.0, 10.0), 42)));
}

#[test]
fn draw_frame_borders_stroke_four_strips() {
    let mut doc = doc_with("ab");
    doc.insert_frame(
        0,
        2,
        FrameFormat {
            border: Some(2.0),
            border_brush: Some(3),
            ..FrameFormat::default()
        },
    )
    .unwrap();

    let device = draw_plain(&doc, 100.0);
    let strips: Vec<Rect> = device
        .events
        .iter()
        .filter_map(|event| match event {
            PaintEvent::FillRect { rect, brush: 3 } => Some(*rect),
            _ => None,
        })
        .collect();
    // The border box is 20 tall: 16 of content plus the border itself.
    assert_eq!(strips.len(), 4);
    assert!(strips.contains(&Rect::new(0.0, 0.0, 100.0, 2.0)));
    assert!(strips.contains(&Rect::new(0.0, 18.0, 100.0, 20.0)));
    assert!(strips.contains(&Rect::new(0.0, 2.0, 2.0, 18.0)));
    assert!(strips.contains(&Rect::new(98.0, 2.0, 100.0, 18.0)));
}

#[test]
fn draw_clip_skips_blocks_outside() {
    let doc = doc_with("a\nb\nc");
    let (mut layout, mut breaker) = laid_out(&doc, 100.0);
    let mut device = RecordingDevice::new();
    let ctx = PaintContext {
        clip: Some(Rect::new(0.0, 0.0, 100.0, 10.0)),
        ..PaintContext::default()
    };
    layout.draw(&doc, &mut breaker, &mut device, &ctx);
    assert_eq!(device.lines().len(), 1);
}
