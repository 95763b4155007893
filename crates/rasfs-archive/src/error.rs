//! Error types for the RAS archive crate.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Errors that can occur when working with RAS archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] rasfs_common::Error),

    /// The file does not start with the RAS signature.
    #[error("unsupported format: expected signature {expected:#010x}, got {actual:#010x}")]
    UnsupportedFormat { expected: u32, actual: u32 },

    /// The byte source ended before a declared length was satisfied.
    #[error("archive truncated while reading {section}: needed {needed} bytes")]
    Truncated { section: &'static str, needed: u64 },

    /// Structural violation in the decoded index.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// Lookup miss.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The path names a directory where a file was required.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Seek at or beyond the end of an entry.
    #[error("seek to {position} is past the end of a {size} byte entry")]
    PastEof { position: u64, size: u64 },

    /// Any mutating call; RAS archives are immutable.
    #[error("archive is read-only")]
    ReadOnly,

    /// An allocation sized from archive data could not be satisfied.
    #[error("out of memory reserving {requested} bytes")]
    OutOfMemory { requested: usize },
}

impl Error {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptArchive(message.into())
    }

    pub(crate) fn out_of_memory(requested: usize, _source: TryReserveError) -> Self {
        Self::OutOfMemory { requested }
    }

    /// The closest `std::io::ErrorKind` for this error.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            Self::NotFound(_) => io::ErrorKind::NotFound,
            Self::ReadOnly => io::ErrorKind::PermissionDenied,
            Self::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            Self::PastEof { .. } | Self::NotAFile(_) => io::ErrorKind::InvalidInput,
            Self::UnsupportedFormat { .. } | Self::CorruptArchive(_) | Self::Common(_) => {
                io::ErrorKind::InvalidData
            }
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

/// Result type for RAS operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: io::Error = Error::ReadOnly.into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let err: io::Error = Error::PastEof {
            position: 10,
            size: 10,
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("past the end"));
    }

    #[test]
    fn test_io_error_round_trips_unwrapped() {
        let original = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let err: io::Error = Error::Io(original).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
