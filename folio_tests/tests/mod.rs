// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `folio` and `folio_layout`.
//!
//! - The `util` module contains the fixed-metric line breaker and the recording
//!   paint device that the layout and draw tests run against, plus shared
//!   helpers needed by different test methods.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests. The reason we chose this design is that it makes it
//!   easier to define shared utility functions needed by different tests.
//! - If you want to add new tests, try to follow these guidelines:
//!   - If your test can be classified to a clear "topic" (e.g. editing, tables, etc.), put
//!     it into the corresponding module, or create a new one in case it doesn't exist yet.
//!   - For test naming, try to put the "topic" of the test at the start of the name instead of
//!     the end. For example, if your test case is about undo grouping, `undo_groups_typing`
//!     is better than `typing_groups_undo`. This keeps the output sorted by topic.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod draw;
mod util;
