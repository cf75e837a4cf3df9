// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deduplicating storage for formats.

use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash, Hasher};

use hashbrown::{DefaultHashBuilder, HashMap};
use smallvec::SmallVec;

use crate::style::{Brush, Format};

/// Index of an interned format in a document's [`FormatCollection`].
///
/// Indices are only meaningful for the collection that produced them. Looking
/// up an index that was never returned by the owning collection is a
/// programming error and panics.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FormatIndex(pub(crate) u32);

impl FormatIndex {
    /// Returns the raw index value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Append-only, deduplicating format storage.
///
/// Interning the same format value twice yields the same index, so format
/// equality elsewhere in the document reduces to an index comparison. Formats
/// are never removed; a document accumulates at most one entry per distinct
/// format value ever used.
#[derive(Clone, Debug, Default)]
pub struct FormatCollection<B: Brush> {
    formats: Vec<Format<B>>,
    // Hash buckets are a prefilter only; brushes do not contribute to the
    // hash, so equality always confirms a candidate.
    buckets: HashMap<u64, SmallVec<[u32; 2]>>,
    hasher: DefaultHashBuilder,
}

impl<B: Brush> FormatCollection<B> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct formats interned so far.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns `true` if no format has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Interns `format`, returning the index of the existing entry if an
    /// equal format is already stored.
    pub fn intern(&mut self, format: Format<B>) -> FormatIndex {
        let hash = self.hash_of(&format);
        if let Some(bucket) = self.buckets.get(&hash) {
            for &index in bucket {
                if self.formats[index as usize] == format {
                    return FormatIndex(index);
                }
            }
        }
        let index = u32::try_from(self.formats.len()).expect("more than u32::MAX formats");
        self.buckets.entry(hash).or_default().push(index);
        self.formats.push(format);
        FormatIndex(index)
    }

    /// Returns the format stored at `index`.
    pub fn format(&self, index: FormatIndex) -> &Format<B> {
        &self.formats[index.0 as usize]
    }

    /// Returns the character format at `index`.
    ///
    /// Panics if `index` does not refer to a character format.
    pub fn char_format(&self, index: FormatIndex) -> &crate::style::CharFormat<B> {
        match self.format(index) {
            Format::Char(f) => f,
            other => panic!("format {} is not a character format: {other:?}", index.0),
        }
    }

    /// Returns the block format at `index`.
    ///
    /// Panics if `index` does not refer to a block format.
    pub fn block_format(&self, index: FormatIndex) -> &crate::style::BlockFormat<B> {
        match self.format(index) {
            Format::Block(f) => f,
            other => panic!("format {} is not a block format: {other:?}", index.0),
        }
    }

    /// Returns the frame attributes at `index`.
    ///
    /// Table formats answer with their embedded frame attributes. Panics if
    /// `index` refers to neither a frame nor a table format.
    pub fn frame_format(&self, index: FormatIndex) -> &crate::style::FrameFormat<B> {
        match self.format(index).as_frame() {
            Some(f) => f,
            None => panic!("format {} is not a frame format", index.0),
        }
    }

    /// Returns the table format at `index`.
    ///
    /// Panics if `index` does not refer to a table format.
    pub fn table_format(&self, index: FormatIndex) -> &crate::style::TableFormat<B> {
        match self.format(index) {
            Format::Table(f) => f,
            other => panic!("format {} is not a table format: {other:?}", index.0),
        }
    }

    /// Returns the list format at `index`.
    ///
    /// Panics if `index` does not refer to a list format.
    pub fn list_format(&self, index: FormatIndex) -> &crate::style::ListFormat {
        match self.format(index) {
            Format::List(f) => f,
            other => panic!("format {} is not a list format: {other:?}", index.0),
        }
    }

    fn hash_of(&self, format: &Format<B>) -> u64 {
        let mut state = self.hasher.build_hasher();
        hash_format(format, &mut state);
        state.finish()
    }
}

// Brush-typed fields only contribute their presence to the hash: `Brush` does
// not require `Hash`, and two formats differing only in a brush value simply
// share a bucket until equality separates them.
fn hash_format<B: Brush, H: Hasher>(format: &Format<B>, state: &mut H) {
    fn opt_f32<H: Hasher>(v: Option<f32>, state: &mut H) {
        v.map(f32::to_bits).hash(state);
    }
    fn opt_brush<B: Brush, H: Hasher>(v: &Option<B>, state: &mut H) {
        v.is_some().hash(state);
    }

    match format {
        Format::Char(f) => {
            0_u8.hash(state);
            f.font_family.hash(state);
            opt_f32(f.font_size, state);
            f.font_weight.map(|w| w.value().to_bits()).hash(state);
            f.font_style.map(|s| s as u8).hash(state);
            opt_brush(&f.foreground, state);
            opt_brush(&f.background, state);
            f.underline.hash(state);
            f.strikethrough.hash(state);
            f.vertical_alignment.map(|v| v as u8).hash(state);
            f.object_index.hash(state);
            f.object_type.hash(state);
        }
        Format::Block(f) => {
            1_u8.hash(state);
            f.alignment.map(|a| a as u8).hash(state);
            opt_f32(f.top_margin, state);
            opt_f32(f.bottom_margin, state);
            opt_f32(f.left_margin, state);
            opt_f32(f.right_margin, state);
            f.indent.hash(state);
            opt_f32(f.line_height, state);
            opt_brush(&f.background, state);
            f.object_index.hash(state);
        }
        Format::Frame(f) => {
            2_u8.hash(state);
            hash_frame(f, state);
        }
        Format::Table(f) => {
            3_u8.hash(state);
            hash_frame(&f.frame, state);
            f.columns.hash(state);
            opt_f32(f.cell_spacing, state);
            opt_f32(f.cell_padding, state);
        }
        Format::List(f) => {
            4_u8.hash(state);
            f.style.map(|s| s as u8).hash(state);
            f.indent.hash(state);
            f.object_index.hash(state);
        }
    }
}

fn hash_frame<B: Brush, H: Hasher>(f: &crate::style::FrameFormat<B>, state: &mut H) {
    fn opt_f32<H: Hasher>(v: Option<f32>, state: &mut H) {
        v.map(f32::to_bits).hash(state);
    }
    f.position.map(|p| p as u8).hash(state);
    opt_f32(f.margin, state);
    opt_f32(f.border, state);
    opt_f32(f.padding, state);
    opt_f32(f.width, state);
    opt_f32(f.height, state);
    f.background.is_some().hash(state);
    f.border_brush.is_some().hash(state);
    f.row_span.hash(state);
    f.column_span.hash(state);
    f.object_index.hash(state);
}
