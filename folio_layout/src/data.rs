// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached layout state: frame geometry, block line caches and float math.

use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash, Hasher};

use folio::{Brush, FrameFormat, FramePosition, ObjectIndex};
use hashbrown::DefaultHashBuilder;
use smallvec::SmallVec;

use crate::geom::{Point, Rect, Size};

/// Tolerance when comparing measured advances against available widths.
pub(crate) const FIT_EPSILON: f32 = 0.01;

/// Height of the probe band used to query float margins before a line's
/// real height is known.
pub(crate) const PROBE_BAND: f32 = 1.0;

/// Resolved box chrome of a frame: margin, border and padding widths.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct Chrome {
    pub(crate) margin: f32,
    pub(crate) border: f32,
    pub(crate) padding: f32,
}

impl Chrome {
    pub(crate) fn of<B: Brush>(format: &FrameFormat<B>) -> Self {
        Self {
            margin: format.margin.unwrap_or(0.0).max(0.0),
            border: format.border.unwrap_or(0.0).max(0.0),
            padding: format.padding.unwrap_or(0.0).max(0.0),
        }
    }

    /// Distance from the border box edge to the content box edge.
    pub(crate) fn inset(&self) -> f32 {
        self.border + self.padding
    }
}

/// A float placed inside a frame, in absolute document coordinates.
#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) struct FloatRecord {
    pub(crate) object: ObjectIndex,
    pub(crate) rect: Rect,
    /// The float's own margin; content keeps this distance from it.
    pub(crate) margin: f32,
    pub(crate) side: FramePosition,
}

/// Computed geometry of one frame, in absolute document coordinates.
#[derive(Clone, Debug, Default)]
pub(crate) struct FrameRecord {
    /// Border box of the frame.
    pub(crate) rect: Rect,
    /// Content box, inside border and padding.
    pub(crate) content: Rect,
    /// Set between [`document_changed`](crate::DocumentLayout::document_changed)
    /// and the next layout pass touching the frame.
    pub(crate) dirty: bool,
    /// Floats laid out inside this frame.
    pub(crate) floats: SmallVec<[FloatRecord; 2]>,
    /// Grid geometry, present on table frames.
    pub(crate) table: Option<TableGeometry>,
}

impl FrameRecord {
    pub(crate) fn translate(&mut self, delta: Point) {
        self.rect = self.rect.translated(delta);
        self.content = self.content.translated(delta);
        for float in &mut self.floats {
            float.rect = float.rect.translated(delta);
        }
        if let Some(table) = &mut self.table {
            table.translate(delta);
        }
    }
}

/// Column and row geometry of a laid-out table.
#[derive(Clone, Debug, Default)]
pub(crate) struct TableGeometry {
    /// Absolute x of each column's left edge.
    pub(crate) column_positions: Vec<f32>,
    pub(crate) column_widths: Vec<f32>,
    /// Absolute y of each row's top edge.
    pub(crate) row_positions: Vec<f32>,
    pub(crate) row_heights: Vec<f32>,
}

impl TableGeometry {
    pub(crate) fn translate(&mut self, delta: Point) {
        for x in &mut self.column_positions {
            *x += delta.x;
        }
        for y in &mut self.row_positions {
            *y += delta.y;
        }
    }
}

/// One line of a block, positioned relative to the block's origin.
///
/// Keeping line origins block-relative is what lets a clean block shift
/// vertically without re-breaking its text.
#[derive(Clone, Debug)]
pub struct PlacedLine<L> {
    /// The measured line.
    pub line: L,
    /// Top-left corner relative to the block's own origin.
    pub origin: Point,
}

/// Cached layout of one block, keyed by the state it was built from.
#[derive(Clone, Debug)]
pub(crate) struct BlockSlot<L> {
    /// Block revision the lines were built from.
    pub(crate) revision: u64,
    /// Width constraint the lines were built for.
    pub(crate) width: f32,
    /// Fingerprint of the surrounding float state at build time.
    pub(crate) float_key: u64,
    /// Absolute origin of the block box. Updated on every pass.
    pub(crate) position: Point,
    /// Extent of the block box (margins excluded).
    pub(crate) size: Size,
    /// Widest line, trailing whitespace included.
    pub(crate) natural_width: f32,
    pub(crate) lines: Vec<PlacedLine<L>>,
    /// Floats anchored in this block, block-relative, for replay when the
    /// cached lines are reused.
    pub(crate) floats: SmallVec<[(ObjectIndex, Rect, f32, FramePosition); 1]>,
}

/// Left and right content limits after clipping a band against floats.
///
/// The band is `[top, top + height)`; `left` and `right` are the limits
/// before float avoidance.
pub(crate) fn float_margins(
    floats: &[FloatRecord],
    top: f32,
    height: f32,
    left: f32,
    right: f32,
) -> (f32, f32) {
    let mut left = left;
    let mut right = right;
    let bottom = top + height;
    for float in floats {
        let outer = float.rect.inflated(float.margin);
        if outer.y1 <= top || outer.y0 >= bottom {
            continue;
        }
        match float.side {
            FramePosition::FloatLeft => left = left.max(outer.x1),
            FramePosition::FloatRight => right = right.min(outer.x0),
            FramePosition::InFlow => {}
        }
    }
    (left, right)
}

/// First y at or below `y` where at least `required` width is available.
///
/// Each probe either fits or skips past the bottom of an obstructing
/// float, so the search is bounded by the number of floats. If nothing
/// fits, the original band is returned and the caller lays out clamped.
pub(crate) fn find_y(
    floats: &[FloatRecord],
    y: f32,
    required: f32,
    height: f32,
    left: f32,
    right: f32,
) -> f32 {
    let mut probe = y;
    for _ in 0..=floats.len() {
        let (l, r) = float_margins(floats, probe, height, left, right);
        if r - l >= required - FIT_EPSILON {
            return probe;
        }
        let mut next = None::<f32>;
        for float in floats {
            let outer = float.rect.inflated(float.margin);
            if outer.y1 > probe && outer.y0 < probe + height {
                next = Some(match next {
                    Some(n) => n.min(outer.y1),
                    None => outer.y1,
                });
            }
        }
        match next {
            Some(bottom) if bottom > probe => probe = bottom,
            _ => return y,
        }
    }
    y
}

/// Fingerprint of the float state a block was laid out against.
///
/// Zero when no floats are in play; otherwise it mixes every float's
/// geometry with the block's own top edge, since avoidance depends on
/// where the block sits relative to the floats.
pub(crate) fn float_fingerprint(
    hasher: &DefaultHashBuilder,
    floats: &[FloatRecord],
    block_top: f32,
) -> u64 {
    if floats.is_empty() {
        return 0;
    }
    let mut state = hasher.build_hasher();
    floats.len().hash(&mut state);
    block_top.to_bits().hash(&mut state);
    for float in floats {
        float.object.as_u32().hash(&mut state);
        float.rect.x0.to_bits().hash(&mut state);
        float.rect.y0.to_bits().hash(&mut state);
        float.rect.x1.to_bits().hash(&mut state);
        float.rect.y1.to_bits().hash(&mut state);
        float.margin.to_bits().hash(&mut state);
    }
    state.finish().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(x0: f32, y0: f32, x1: f32, y1: f32, side: FramePosition) -> FloatRecord {
        FloatRecord {
            object: folio::Document::<u8>::new().root_frame(),
            rect: Rect::new(x0, y0, x1, y1),
            margin: 0.0,
            side,
        }
    }

    #[test]
    fn margins_clip_against_overlapping_floats_only() {
        let floats = [
            float(0.0, 0.0, 50.0, 50.0, FramePosition::FloatLeft),
            float(150.0, 80.0, 200.0, 120.0, FramePosition::FloatRight),
        ];
        assert_eq!(float_margins(&floats, 0.0, 16.0, 0.0, 200.0), (50.0, 200.0));
        assert_eq!(
            float_margins(&floats, 90.0, 16.0, 0.0, 200.0),
            (0.0, 150.0)
        );
        assert_eq!(float_margins(&floats, 60.0, 16.0, 0.0, 200.0), (0.0, 200.0));
    }

    #[test]
    fn float_margin_widens_the_exclusion() {
        let mut f = float(0.0, 0.0, 50.0, 50.0, FramePosition::FloatLeft);
        f.margin = 4.0;
        assert_eq!(float_margins(&[f], 0.0, 16.0, 0.0, 200.0), (54.0, 200.0));
        // The margin also extends the vertical span.
        assert_eq!(float_margins(&[f], 52.0, 16.0, 0.0, 200.0), (54.0, 200.0));
        assert_eq!(float_margins(&[f], 55.0, 16.0, 0.0, 200.0), (0.0, 200.0));
    }

    #[test]
    fn find_y_steps_past_obstructions() {
        let floats = [
            float(0.0, 0.0, 120.0, 40.0, FramePosition::FloatLeft),
            float(0.0, 40.0, 80.0, 90.0, FramePosition::FloatLeft),
        ];
        // 100 units fit only below the first float.
        assert_eq!(find_y(&floats, 0.0, 100.0, 16.0, 0.0, 200.0), 40.0);
        // 150 units fit only below both.
        assert_eq!(find_y(&floats, 0.0, 150.0, 16.0, 0.0, 200.0), 90.0);
        // Nothing ever fits: give up at the original position.
        assert_eq!(find_y(&floats, 0.0, 300.0, 16.0, 0.0, 200.0), 0.0);
    }

    #[test]
    fn fingerprint_is_zero_only_without_floats() {
        let hasher = DefaultHashBuilder::default();
        assert_eq!(float_fingerprint(&hasher, &[], 10.0), 0);
        let f = [float(0.0, 0.0, 50.0, 50.0, FramePosition::FloatLeft)];
        let a = float_fingerprint(&hasher, &f, 10.0);
        let b = float_fingerprint(&hasher, &f, 10.0);
        assert_ne!(a, 0);
        assert_eq!(a, b);
        assert_ne!(a, float_fingerprint(&hasher, &f, 26.0));
    }
}
