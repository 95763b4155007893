//! Archive backend registration contract.
//!
//! A host virtual filesystem mounts archives through an [`Archiver`]: it
//! identifies the backend by its [`ArchiverInfo`], opens a byte source and
//! then forwards path operations to the handle.

use crate::entry::Stat;
use crate::source::ByteSource;
use crate::view::ReadView;
use crate::{ArchiveOptions, Error, RasArchive, Result};

/// Static description of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiverInfo {
    /// File extension handled, without the dot.
    pub extension: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub url: &'static str,
    pub supports_symlinks: bool,
}

/// Operations a host calls on a mounted archive.
pub trait Archiver: Sized {
    /// Backend description.
    const INFO: ArchiverInfo;

    /// Open an archive from a byte source.
    ///
    /// `for_writing` requests a writable mount, which read-only backends
    /// refuse.
    fn open_archive(source: Box<dyn ByteSource>, for_writing: bool) -> Result<Self>;

    /// Base names of a directory's children; empty when the path is not a directory.
    fn enumerate(&self, path: &str) -> Vec<String>;

    /// Metadata for a path.
    fn stat(&self, path: &str) -> Result<Stat>;

    /// Open a file for reading.
    fn open_read(&self, path: &str) -> Result<ReadView>;

    /// Open a file for writing.
    fn open_write(&self, path: &str) -> Result<ReadView>;

    /// Open a file for appending.
    fn open_append(&self, path: &str) -> Result<ReadView>;

    /// Delete a path.
    fn remove(&self, path: &str) -> Result<()>;

    /// Create a directory.
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Unmount, releasing all resources.
    fn close(self);
}

impl Archiver for RasArchive {
    const INFO: ArchiverInfo = ArchiverInfo {
        extension: "RAS",
        description: "Max Payne 2 format",
        author: "Johannes Hackel",
        url: "https://icculus.org/physfs/",
        supports_symlinks: false,
    };

    fn open_archive(source: Box<dyn ByteSource>, for_writing: bool) -> Result<Self> {
        if for_writing {
            return Err(Error::ReadOnly);
        }
        RasArchive::from_source(source, ArchiveOptions::default())
    }

    fn enumerate(&self, path: &str) -> Vec<String> {
        RasArchive::enumerate(self, path)
    }

    fn stat(&self, path: &str) -> Result<Stat> {
        RasArchive::stat(self, path)
    }

    fn open_read(&self, path: &str) -> Result<ReadView> {
        RasArchive::open_read(self, path)
    }

    fn open_write(&self, path: &str) -> Result<ReadView> {
        RasArchive::open_write(self, path)
    }

    fn open_append(&self, path: &str) -> Result<ReadView> {
        RasArchive::open_append(self, path)
    }

    fn remove(&self, path: &str) -> Result<()> {
        RasArchive::remove(self, path)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        RasArchive::mkdir(self, path)
    }

    fn close(self) {
        RasArchive::close(self)
    }
}
