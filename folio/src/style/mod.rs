// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Format descriptions for characters, blocks and structural objects.
//!
//! Formats are sparse: every attribute is optional, and an unset attribute
//! means "inherit whatever the consumer's default is". Sparseness is what
//! makes [`merge`](CharFormat::merge) meaningful and is also what lets the
//! format collection deduplicate aggressively.

mod brush;
mod font;

pub use brush::Brush;
pub use font::{FontStyle, FontWeight};

use alloc::string::String;

use crate::object::ObjectIndex;

/// Horizontal alignment of lines inside a block.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum Alignment {
    /// Aligns lines towards the leading edge of the block.
    #[default]
    Start,
    /// Aligns lines towards the trailing edge of the block.
    End,
    /// Aligns the centers of lines with the center of the block.
    Middle,
    /// Spreads the content of each line to fill the block width.
    ///
    /// How (and whether) spreading happens is up to the line breaker; a
    /// breaker without justification support lays these out like `Start`.
    Justified,
}

/// Vertical alignment of an inline object relative to the line it sits on.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum VerticalAlignment {
    /// The object's bottom edge sits on the text baseline.
    #[default]
    Baseline,
    /// The object's top edge aligns with the line's top.
    Top,
    /// The object's center aligns with the line's center.
    Middle,
    /// The object's bottom edge aligns with the line's bottom.
    Bottom,
}

/// How a frame participates in its parent's content flow.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum FramePosition {
    /// The frame occupies its own band of vertical space.
    #[default]
    InFlow,
    /// The frame hugs the left content edge and text flows around it.
    FloatLeft,
    /// The frame hugs the right content edge and text flows around it.
    FloatRight,
}

/// Marker style of a list.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum ListStyle {
    /// A filled circle.
    #[default]
    Disc,
    /// A hollow circle.
    Circle,
    /// A filled square.
    Square,
    /// Decimal numbering: 1. 2. 3.
    Decimal,
    /// Lower-case alphabetic numbering: a. b. c.
    LowerAlpha,
    /// Upper-case alphabetic numbering: A. B. C.
    UpperAlpha,
    /// Lower-case roman numbering: i. ii. iii.
    LowerRoman,
    /// Upper-case roman numbering: I. II. III.
    UpperRoman,
}

impl ListStyle {
    /// Returns `true` if markers of this style are text rather than shapes.
    pub fn is_numbered(self) -> bool {
        !matches!(self, Self::Disc | Self::Circle | Self::Square)
    }
}

/// Formatting attributes that apply to a run of characters.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct CharFormat<B: Brush> {
    /// Requested font family name.
    pub font_family: Option<String>,
    /// Font size in layout units.
    pub font_size: Option<f32>,
    /// Font weight.
    pub font_weight: Option<FontWeight>,
    /// Font style.
    pub font_style: Option<FontStyle>,
    /// Brush used to draw the glyphs.
    pub foreground: Option<B>,
    /// Brush used to fill behind the run.
    pub background: Option<B>,
    /// Whether the run is underlined.
    pub underline: Option<bool>,
    /// Whether the run is struck through.
    pub strikethrough: Option<bool>,
    /// Vertical placement of an inline object carrying this format.
    pub vertical_alignment: Option<VerticalAlignment>,
    /// The structural object this run belongs to, if any.
    ///
    /// On a frame sentinel this points at the frame; on an inline object
    /// character it points at the atomic frame that describes the object.
    pub object_index: Option<ObjectIndex>,
    /// Consumer-defined kind tag for inline objects.
    ///
    /// The layout engine uses this to pick the handler that measures and
    /// draws the object.
    pub object_type: Option<u16>,
}

impl<B: Brush> CharFormat<B> {
    /// Overlays `other` onto `self`: attributes set in `other` win.
    pub fn merge(&mut self, other: &Self) {
        if other.font_family.is_some() {
            self.font_family.clone_from(&other.font_family);
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.font_weight.is_some() {
            self.font_weight = other.font_weight;
        }
        if other.font_style.is_some() {
            self.font_style = other.font_style;
        }
        if other.foreground.is_some() {
            self.foreground.clone_from(&other.foreground);
        }
        if other.background.is_some() {
            self.background.clone_from(&other.background);
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.strikethrough.is_some() {
            self.strikethrough = other.strikethrough;
        }
        if other.vertical_alignment.is_some() {
            self.vertical_alignment = other.vertical_alignment;
        }
        if other.object_index.is_some() {
            self.object_index = other.object_index;
        }
        if other.object_type.is_some() {
            self.object_type = other.object_type;
        }
    }

    /// Returns a copy of `self` with `other` overlaid.
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

/// Formatting attributes that apply to a whole block.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct BlockFormat<B: Brush> {
    /// Horizontal alignment of the block's lines.
    pub alignment: Option<Alignment>,
    /// Extra space above the block, in layout units.
    pub top_margin: Option<f32>,
    /// Extra space below the block.
    pub bottom_margin: Option<f32>,
    /// Extra space on the leading side.
    pub left_margin: Option<f32>,
    /// Extra space on the trailing side.
    pub right_margin: Option<f32>,
    /// Indentation level. Each level shifts the block by one indent step.
    pub indent: Option<u16>,
    /// Line height multiplier applied to the natural line height.
    pub line_height: Option<f32>,
    /// Brush used to fill the block's background band.
    pub background: Option<B>,
    /// The block group (for example a list) this block belongs to, if any.
    pub object_index: Option<ObjectIndex>,
}

impl<B: Brush> BlockFormat<B> {
    /// Overlays `other` onto `self`: attributes set in `other` win.
    pub fn merge(&mut self, other: &Self) {
        if other.alignment.is_some() {
            self.alignment = other.alignment;
        }
        if other.top_margin.is_some() {
            self.top_margin = other.top_margin;
        }
        if other.bottom_margin.is_some() {
            self.bottom_margin = other.bottom_margin;
        }
        if other.left_margin.is_some() {
            self.left_margin = other.left_margin;
        }
        if other.right_margin.is_some() {
            self.right_margin = other.right_margin;
        }
        if other.indent.is_some() {
            self.indent = other.indent;
        }
        if other.line_height.is_some() {
            self.line_height = other.line_height;
        }
        if other.background.is_some() {
            self.background.clone_from(&other.background);
        }
        if other.object_index.is_some() {
            self.object_index = other.object_index;
        }
    }

    /// Returns a copy of `self` with `other` overlaid.
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

/// Formatting attributes of a frame.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct FrameFormat<B: Brush> {
    /// Placement of the frame in its parent's flow.
    pub position: Option<FramePosition>,
    /// Space between the frame border and surrounding content.
    pub margin: Option<f32>,
    /// Width of the border stroke. Zero or unset means no border.
    pub border: Option<f32>,
    /// Space between the border and the frame's own content.
    pub padding: Option<f32>,
    /// Fixed content width. Unset frames size to their parent's width.
    pub width: Option<f32>,
    /// Fixed content height. Unset frames size to their content.
    pub height: Option<f32>,
    /// Brush used to fill the frame's background.
    pub background: Option<B>,
    /// Brush used to stroke the border.
    pub border_brush: Option<B>,
    /// Number of table rows this frame covers when used as a cell.
    pub row_span: Option<u16>,
    /// Number of table columns this frame covers when used as a cell.
    pub column_span: Option<u16>,
    /// The frame object this format describes, if attached to one.
    pub object_index: Option<ObjectIndex>,
}

impl<B: Brush> FrameFormat<B> {
    /// Row span of a table cell carrying this format. Defaults to 1.
    pub fn row_span_or_default(&self) -> usize {
        self.row_span.map(usize::from).unwrap_or(1).max(1)
    }

    /// Column span of a table cell carrying this format. Defaults to 1.
    pub fn column_span_or_default(&self) -> usize {
        self.column_span.map(usize::from).unwrap_or(1).max(1)
    }
}

/// Formatting attributes of a table frame.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct TableFormat<B: Brush> {
    /// The table is also a frame; these are its frame attributes.
    pub frame: FrameFormat<B>,
    /// Number of columns in the table grid.
    pub columns: Option<u16>,
    /// Space between neighboring cells.
    pub cell_spacing: Option<f32>,
    /// Space between a cell's edge and its content.
    pub cell_padding: Option<f32>,
}

/// Formatting attributes of a list.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct ListFormat {
    /// Marker style of the list.
    pub style: Option<ListStyle>,
    /// Indentation level of the list's blocks.
    pub indent: Option<u16>,
    /// The list object this format describes, if attached to one.
    pub object_index: Option<ObjectIndex>,
}

/// Any format a document can store.
///
/// Formats are interned into the document's format collection and referred to
/// by [`FormatIndex`](crate::FormatIndex) everywhere else.
#[derive(Clone, PartialEq, Debug)]
pub enum Format<B: Brush> {
    /// A character format.
    Char(CharFormat<B>),
    /// A block format.
    Block(BlockFormat<B>),
    /// A frame format.
    Frame(FrameFormat<B>),
    /// A table format.
    Table(TableFormat<B>),
    /// A list format.
    List(ListFormat),
}

impl<B: Brush> Format<B> {
    /// Returns the character format, if this is one.
    pub fn as_char(&self) -> Option<&CharFormat<B>> {
        match self {
            Self::Char(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the block format, if this is one.
    pub fn as_block(&self) -> Option<&BlockFormat<B>> {
        match self {
            Self::Block(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the frame format, if this is one.
    ///
    /// Table formats answer with their embedded frame attributes, so frame
    /// geometry code can treat tables uniformly.
    pub fn as_frame(&self) -> Option<&FrameFormat<B>> {
        match self {
            Self::Frame(f) => Some(f),
            Self::Table(t) => Some(&t.frame),
            _ => None,
        }
    }

    /// Returns the table format, if this is one.
    pub fn as_table(&self) -> Option<&TableFormat<B>> {
        match self {
            Self::Table(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the list format, if this is one.
    pub fn as_list(&self) -> Option<&ListFormat> {
        match self {
            Self::List(f) => Some(f),
            _ => None,
        }
    }

    /// The structural object this format is attached to, if any.
    pub fn object_index(&self) -> Option<ObjectIndex> {
        match self {
            Self::Char(f) => f.object_index,
            Self::Block(f) => f.object_index,
            Self::Frame(f) => f.object_index,
            Self::Table(f) => f.frame.object_index,
            Self::List(f) => f.object_index,
        }
    }

    /// Attaches this format to a structural object.
    pub fn set_object_index(&mut self, index: ObjectIndex) {
        match self {
            Self::Char(f) => f.object_index = Some(index),
            Self::Block(f) => f.object_index = Some(index),
            Self::Frame(f) => f.object_index = Some(index),
            Self::Table(f) => f.frame.object_index = Some(index),
            Self::List(f) => f.object_index = Some(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_merge_overlays_set_fields() {
        let mut base: CharFormat<()> = CharFormat {
            font_size: Some(12.0),
            underline: Some(false),
            ..Default::default()
        };
        let bold = CharFormat {
            font_weight: Some(FontWeight::BOLD),
            underline: Some(true),
            ..Default::default()
        };
        base.merge(&bold);
        assert_eq!(base.font_size, Some(12.0));
        assert_eq!(base.font_weight, Some(FontWeight::BOLD));
        assert_eq!(base.underline, Some(true));
    }

    #[test]
    fn merge_ignores_unset_fields() {
        let mut base: BlockFormat<()> = BlockFormat {
            alignment: Some(Alignment::Middle),
            ..Default::default()
        };
        base.merge(&BlockFormat::default());
        assert_eq!(base.alignment, Some(Alignment::Middle));
    }

    #[test]
    fn table_formats_answer_as_frames() {
        let table: Format<()> = Format::Table(TableFormat {
            frame: FrameFormat {
                border: Some(2.0),
                ..Default::default()
            },
            columns: Some(3),
            ..Default::default()
        });
        assert_eq!(table.as_frame().unwrap().border, Some(2.0));
    }
}
