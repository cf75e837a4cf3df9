// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt::Debug;

/// Trait for types that represent the color of text or decorations.
///
/// The document model never inspects brushes; it stores them in character and
/// block formats, deduplicates formats by comparing them, and hands them back
/// out to whatever paints the document. Any clonable, comparable type with a
/// sensible default works.
pub trait Brush: Clone + PartialEq + Default + Debug {}

impl<T: Clone + PartialEq + Default + Debug> Brush for T {}
