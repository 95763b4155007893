//! Common utilities for rasfs.
//!
//! This crate provides the foundational pieces shared by the rasfs crates:
//!
//! - [`BinaryReader`] - Bounds-checked binary reading from byte slices
//! - [`Error`] - The error raised when a read would overrun its buffer

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Re-export memchr for byte searching
pub use memchr;
