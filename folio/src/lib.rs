// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A rich text document model.
//!
//! Folio stores a document as a piece table over an append-only character
//! buffer. On top of the character store sit blocks (paragraphs), interned
//! sparse formats, structural objects (frames, tables and lists delimited by
//! sentinel characters) and an undo log. [`Document`] ties it all together;
//! layout and painting live in the companion `folio_layout` crate.
//!
//! Text styling is generic over a [`Brush`], which describes how content is
//! colored or filled. The document never interprets brushes; it only stores
//! and compares them.
//!
//! ## Features
//!
//! - `std` (enabled by default): This is currently unused and is provided for forward compatibility.
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
#![no_std]

extern crate alloc;

mod block;
mod cursor;
mod document;
mod error;
mod format;
mod fragment;
mod history;
mod object;
mod style;
mod tree;

pub use crate::block::BlockId;
pub use crate::cursor::{CursorId, Operation};
pub use crate::document::{
    BlockRef, Blocks, Document, DocumentChange, FormatChangeMode, FrameContent, FrameIter, TextRun,
    TextRuns,
};
pub use crate::error::{Error, ErrorKind};
pub use crate::format::{FormatCollection, FormatIndex};
pub use crate::fragment::FragmentKind;
pub use crate::history::CustomUndo;
pub use crate::object::{list_marker_text, DocObject, Frame, List, ObjectIndex, Table};
pub use crate::style::{
    Alignment, BlockFormat, Brush, CharFormat, FontStyle, FontWeight, Format, FrameFormat,
    FramePosition, ListFormat, ListStyle, TableFormat, VerticalAlignment,
};
