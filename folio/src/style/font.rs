// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font attributes stored in character formats.

/// Visual weight class of a font, on a scale from 1.0 to 1000.0.
///
/// The document model stores the requested weight verbatim; matching it to an
/// available face is the job of whatever shapes the text.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FontWeight(f32);

impl FontWeight {
    /// Weight value of 100.
    pub const THIN: Self = Self(100.0);
    /// Weight value of 300.
    pub const LIGHT: Self = Self(300.0);
    /// Weight value of 400.
    pub const NORMAL: Self = Self(400.0);
    /// Weight value of 500.
    pub const MEDIUM: Self = Self(500.0);
    /// Weight value of 600.
    pub const SEMI_BOLD: Self = Self(600.0);
    /// Weight value of 700.
    pub const BOLD: Self = Self(700.0);
    /// Weight value of 900.
    pub const BLACK: Self = Self(900.0);

    /// Creates a new weight attribute with the given value.
    pub const fn new(weight: f32) -> Self {
        Self(weight)
    }

    /// Returns the underlying weight value.
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Visual style or "slope" of a font.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum FontStyle {
    /// An upright or "roman" style.
    #[default]
    Normal,
    /// A style that is typically drawn with a custom italic face.
    Italic,
    /// A slanted style derived from the upright face.
    Oblique,
}
