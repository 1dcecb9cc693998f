// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the shared buffer lifetime protocol.

use std::io;

use thiserror::Error;

use crate::element::ElementType;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by shared buffer operations.
///
/// Segment close failures never appear here: they are logged and the
/// protocol carries on.
#[derive(Error, Debug)]
pub enum Error {
    /// A payload or flag segment could not be created.
    /// Any segment created before the failure has already been closed.
    #[error("failed to allocate shared segment `{name}`: {source}")]
    AllocationFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A payload or flag segment could not be opened by name.
    #[error("failed to open shared segment `{name}`: {source}")]
    OpenFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The buffer's release flag already reads `true`.
    #[error("buffer {id} has already been released and cannot be transferred")]
    InvalidTransfer { id: String },

    /// A received buffer id is not a valid segment token.
    #[error("invalid buffer id `{0}`")]
    InvalidId(String),

    /// Typed access with a type that does not match the buffer's element type.
    #[error("element type mismatch: buffer holds {actual:?}, requested {expected:?}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    /// The requested layout does not fit in the payload segment.
    #[error("{requested} bytes requested but the segment holds {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}
