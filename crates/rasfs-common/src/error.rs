//! Error types for rasfs-common.

use thiserror::Error;

/// Common error type for rasfs operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// A NUL-terminated string ran off the end of the buffer.
    #[error("string starting at offset {position} is missing its NUL terminator")]
    MissingNullTerminator { position: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
