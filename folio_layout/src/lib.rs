// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame, table and flow layout for [folio] documents.
//!
//! This crate turns a [`Document`](folio::Document) into geometry: lines
//! placed in blocks, blocks stacked in frames, frames nested in their
//! parents, tables laid out on grids and floating frames pushed to the
//! page edges with text flowing around them. The result can be hit tested
//! and painted.
//!
//! Text measurement is not part of the engine. A [`LineBreaker`] supplied
//! by the caller breaks each block's content into [`ShapedLine`]s; the
//! engine decides only where those lines go. Painting likewise targets a
//! caller-supplied [`PaintDevice`]. Both traits are small on purpose, so
//! the engine works against anything from a real text stack to the fixed
//! metric fakes used in tests.
//!
//! Layout is incremental. [`DocumentLayout`] caches lines per block and
//! geometry per frame, keyed by the block revisions the document tracks;
//! feeding every [`DocumentChange`](folio::DocumentChange) into
//! [`DocumentLayout::document_changed`] keeps the caches honest, and a
//! pass only rebuilds what the edit invalidated.
//!
//! ## Features
//!
//! - `std` (enabled by default): Get floating point functions from the standard library
//!   (likely using your target's libc).
//! - `libm`: Use floating point implementations from [core_maths].
//!
//! At least one of `std` and `libm` is required; `std` overrides `libm`.
// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("folio_layout requires either the `std` or `libm` feature to be enabled");

extern crate alloc;

mod data;
mod draw;
mod geom;
mod layout;
mod paint;
mod shape;
mod table;

pub use crate::data::PlacedLine;
pub use crate::geom::{Point, Rect, Size};
pub use crate::layout::{BlockLines, DocumentLayout, HitPoint, HitResult};
pub use crate::paint::{InlineObjectHandler, PaintContext, PaintDevice, SelectionSpan};
pub use crate::shape::{InlineItem, LineBreaker, ShapedLine, StyleRun};
