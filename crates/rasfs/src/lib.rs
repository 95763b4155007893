//! rasfs - Max Payne 2 RAS archive decoding library.
//!
//! This crate provides a unified interface to the rasfs crates.
//!
//! # Crates
//!
//! - [`rasfs_common`] - Common utilities (bounds-checked binary reading)
//! - [`rasfs_archive`] - RAS archive reading (keystream cipher, record
//!   decoding, directory index, bounded read views)
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//!
//! use rasfs::prelude::*;
//!
//! let archive = RasArchive::open("MaxPayne2.ras")?;
//!
//! for path in archive.walk("") {
//!     let stat = archive.stat(&path)?;
//!     if stat.kind == EntryKind::File {
//!         let mut view = archive.open_read(&path)?;
//!         let mut data = Vec::new();
//!         view.read_to_end(&mut data)?;
//!         println!("{path}: {} bytes", data.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use rasfs_archive as archive;
pub use rasfs_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use rasfs_archive::{
        ArchiveOptions, Archiver, ByteSource, Entry, EntryKind, RasArchive, RasBuilder, ReadView,
        Stat,
    };
    pub use rasfs_common::BinaryReader;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
