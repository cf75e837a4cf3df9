// Copyright 2026 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors that can occur when editing a document.

/// Errors that can occur when editing a document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::FrameNesting { start, end } => {
                write!(
                    f,
                    "frame range {start}..{end} crosses the boundary of an existing frame"
                )
            }
        }
    }
}

impl core::error::Error for Error {}

/// A list of the types of errors that can occur when editing a document.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A frame was requested over a range whose endpoints lie in different
    /// frames.
    ///
    /// Frames must nest: the start and end of a new frame have to sit inside
    /// the same innermost existing frame.
    FrameNesting {
        /// Requested start position.
        start: usize,
        /// Requested end position.
        end: usize,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
