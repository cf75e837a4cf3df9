// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Table layout.
//!
//! Tables are laid out in two steps. Every cell's flow is first measured
//! at its column width against a provisional origin; row heights are the
//! maxima of the measured cells. The cells are then moved to their final
//! grid positions and stretched to their rows.

use alloc::vec::Vec;

use folio::{Brush, ObjectIndex};
use hashbrown::HashMap;

use crate::data::{Chrome, TableGeometry};
use crate::geom::{Point, Rect};
use crate::layout::LayoutPass;
use crate::shape::LineBreaker;

/// One measured cell, keyed by its owning grid slot.
#[derive(Copy, Clone, Debug)]
struct CellMeasure {
    cell: ObjectIndex,
    row: usize,
    column: usize,
    row_span: usize,
    column_span: usize,
    /// Border box width, spanned columns and the gaps between them.
    width: f32,
    /// Measured border box height of the cell's content.
    height: f32,
    /// Distance from the cell border box to its content box.
    inset: f32,
}

impl<B: Brush, S: LineBreaker<B>> LayoutPass<'_, B, S> {
    /// Lays out a table frame and returns its border box height.
    pub(crate) fn layout_table(&mut self, index: ObjectIndex, origin: Point, width: f32) -> f32 {
        let doc = self.doc;
        let table = doc.table(index);
        let format = doc.formats().table_format(doc.frame(index).format());
        let inset = Chrome::of(&format.frame).inset();
        let spacing = format.cell_spacing.unwrap_or(0.0).max(0.0);
        let padding = format.cell_padding.unwrap_or(0.0).max(0.0);
        let rows = table.rows();
        let columns = table.columns();
        let cells = table.cells();

        let content_left = origin.x + inset;
        let content_width = (width - 2.0 * inset).max(0.0);
        let (positions, widths) = column_layout(content_left, content_width, columns, spacing);

        // Owning slot of each cell, first in reading order.
        let mut ordinals: HashMap<ObjectIndex, usize> = HashMap::with_capacity(cells.len());
        for (ordinal, &cell) in cells.iter().enumerate() {
            ordinals.entry(cell).or_insert(ordinal);
        }
        let mut owners: Vec<Option<(usize, usize)>> = alloc::vec![None; cells.len()];
        for row in 0..rows {
            for column in 0..columns {
                let cell = table.cell_at(row, column);
                if let Some(&ordinal) = ordinals.get(&cell) {
                    if owners[ordinal].is_none() {
                        owners[ordinal] = Some((row, column));
                    }
                }
            }
        }

        let mut measures: Vec<CellMeasure> = Vec::with_capacity(cells.len());
        let mut row_heights = alloc::vec![0.0_f32; rows];
        for (ordinal, &cell) in cells.iter().enumerate() {
            // Cells squeezed out of the grid by overlapping spans are skipped.
            let Some((row, column)) = owners[ordinal] else {
                continue;
            };
            let cell_format = doc.formats().frame_format(doc.frame(cell).format());
            let column_span = cell_format.column_span_or_default().min(columns - column);
            let row_span = cell_format.row_span_or_default().min(rows - row);
            let mut cell_width = spacing * (column_span as f32 - 1.0);
            for w in &widths[column..column + column_span] {
                cell_width += w;
            }
            let height = self.layout_flow(cell, Point::ZERO, cell_width, padding);
            if row_span == 1 {
                row_heights[row] = row_heights[row].max(height);
            }
            measures.push(CellMeasure {
                cell,
                row,
                column,
                row_span,
                column_span,
                width: cell_width,
                height,
                inset: Chrome::of(cell_format).inset() + padding,
            });
        }

        let content_top = origin.y + inset;
        let mut row_positions = alloc::vec![0.0_f32; rows];
        let mut cursor = content_top + spacing;
        for row in 0..rows {
            row_positions[row] = cursor;
            cursor += row_heights[row] + spacing;
        }
        let content_height = cursor - content_top;

        for measure in &measures {
            let x = positions[measure.column];
            let y = row_positions[measure.row];
            let mut covered = spacing * (measure.row_span as f32 - 1.0);
            for h in &row_heights[measure.row..measure.row + measure.row_span] {
                covered += h;
            }
            self.move_frame(measure.cell, Point::new(x, y));
            // Stretch the cell to its rows. A spanning cell taller than the
            // rows it covers overflows them.
            let stretched = covered.max(measure.height);
            if let Some(record) = self.frames.get_mut(&measure.cell) {
                record.rect.y1 = record.rect.y0 + stretched;
                record.content.y1 = record.rect.y1 - measure.inset;
            }
        }

        let height = content_height + 2.0 * inset;
        let record = self.frames.entry(index).or_default();
        record.rect = Rect::new(origin.x, origin.y, origin.x + width, origin.y + height);
        record.content = Rect::new(
            content_left,
            content_top,
            content_left + content_width,
            origin.y + height - inset,
        );
        record.floats.clear();
        record.table = Some(TableGeometry {
            column_positions: positions,
            column_widths: widths,
            row_positions,
            row_heights,
        });
        record.dirty = false;
        self.bump_ideal(origin.x + width);
        height
    }
}

/// Positions and widths of `columns` equal columns inside
/// `[left, left + width]`, separated and surrounded by `spacing`.
///
/// The widths are computed with a running remainder so they always sum to
/// the space the gaps leave over.
pub(crate) fn column_layout(
    left: f32,
    width: f32,
    columns: usize,
    spacing: f32,
) -> (Vec<f32>, Vec<f32>) {
    let columns = columns.max(1);
    let mut remaining = (width - spacing * (columns as f32 + 1.0)).max(0.0);
    let mut positions = Vec::with_capacity(columns);
    let mut widths = Vec::with_capacity(columns);
    let mut x = left + spacing;
    for index in 0..columns {
        let share = remaining / (columns - index) as f32;
        positions.push(x);
        widths.push(share);
        x += share + spacing;
        remaining -= share;
    }
    (positions, widths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_split_the_width_evenly() {
        let (positions, widths) = column_layout(0.0, 320.0, 3, 5.0);
        assert_eq!(widths, alloc::vec![100.0, 100.0, 100.0]);
        assert_eq!(positions, alloc::vec![5.0, 110.0, 215.0]);
    }

    #[test]
    fn column_widths_cover_the_usable_space() {
        let (_, widths) = column_layout(10.0, 100.0, 3, 0.0);
        let total: f32 = widths.iter().sum();
        assert!(
            (total - 100.0).abs() < 1e-4,
            "widths {widths:?} must sum to the full usable width"
        );
    }

    #[test]
    fn degenerate_width_collapses_all_columns() {
        let (positions, widths) = column_layout(0.0, 4.0, 2, 5.0);
        assert_eq!(widths, alloc::vec![0.0, 0.0]);
        assert_eq!(positions, alloc::vec![5.0, 10.0]);
    }
}
