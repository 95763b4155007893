//! RAS archive reader for Max Payne 2 game files.
//!
//! RAS is the container format Max Payne 2 ships its assets in. An archive
//! holds:
//!
//! - An 8-byte preamble: signature and a signed 32-bit seed
//! - A 36-byte section header, obscured with a seed-driven keystream
//! - An encrypted blob of file records and one of directory records
//! - Raw file payloads, back to back in file declaration order
//!
//! Opening an archive decodes the records into a directory tree with a
//! hashed path lookup. Files are read through bounded [`ReadView`]s, each
//! with its own handle onto the archive bytes.
//!
//! The keystream is obfuscation, not encryption, and offers no security.
//!
//! # Example
//!
//! ```no_run
//! use rasfs_archive::RasArchive;
//!
//! let archive = RasArchive::open("MaxPayne2.ras")?;
//!
//! for name in archive.enumerate("data") {
//!     println!("{name}");
//! }
//!
//! let stat = archive.stat("data/item.bin")?;
//! let data = archive.read("data/item.bin")?;
//! assert_eq!(data.len() as u64, stat.size);
//! # Ok::<(), rasfs_archive::Error>(())
//! ```

mod archive;
mod backend;
mod builder;
mod entry;
mod error;
mod index;
mod source;
mod view;

pub mod cipher;
pub mod header;
pub mod path;
pub mod records;

pub use archive::{ArchiveOptions, RasArchive};
pub use backend::{Archiver, ArchiverInfo};
pub use builder::RasBuilder;
pub use entry::{Entry, EntryId, EntryKind, Stat};
pub use error::{Error, Result};
pub use header::{ArchiveHeader, SectionHeader};
pub use index::ArchiveIndex;
pub use source::{ByteSource, FileSource, MemorySource, MmapSource, SliceSource};
pub use view::ReadView;
