//! RAS archive handle.
//!
//! Opening an archive reads the header, decrypts both index blobs with the
//! base seed, decodes the records and builds the directory index in one
//! synchronous pass. The handle is read-only afterwards.

use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::entry::{Entry, EntryId, EntryKind, Stat};
use crate::header::{ArchiveHeader, SectionHeader};
use crate::index::ArchiveIndex;
use crate::source::{read_block, ByteSource, FileSource, MmapSource};
use crate::view::ReadView;
use crate::{cipher, records};
use crate::{Error, Result};

/// Options controlling how an archive is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Promote entries to the front of their hash chain on lookup.
    pub move_to_front: bool,
    /// Memory-map archive files instead of reading through a file handle.
    pub memory_map: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            move_to_front: true,
            memory_map: true,
        }
    }
}

impl ArchiveOptions {
    /// Set lookup promotion.
    pub fn move_to_front(mut self, enabled: bool) -> Self {
        self.move_to_front = enabled;
        self
    }

    /// Set memory mapping.
    pub fn memory_map(mut self, enabled: bool) -> Self {
        self.memory_map = enabled;
        self
    }
}

/// An open RAS archive.
///
/// Lookups are serialized internally, so a handle can be shared between
/// threads. Each [`ReadView`] it hands out owns a separate byte source.
pub struct RasArchive {
    source: Box<dyn ByteSource>,
    name: String,
    header: ArchiveHeader,
    index: ArchiveIndex,
}

impl RasArchive {
    /// Open an archive file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ArchiveOptions::default())
    }

    /// Open an archive file.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ArchiveOptions) -> Result<Self> {
        let path = path.as_ref();
        let source: Box<dyn ByteSource> = if options.memory_map {
            Box::new(MmapSource::open(path)?)
        } else {
            Box::new(FileSource::open(path)?)
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut archive = Self::from_source(source, options)?;
        archive.name = name;
        Ok(archive)
    }

    /// Decode an archive from any byte source.
    ///
    /// The source is read from offset zero and kept for later reads.
    pub fn from_source(mut source: Box<dyn ByteSource>, options: ArchiveOptions) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let header = ArchiveHeader::read(&mut source)?;
        let sections = header.sections;

        let available = source.length()?;
        if sections.payload_start() > available {
            return Err(Error::Truncated {
                section: "index blobs",
                needed: sections.payload_start(),
            });
        }

        debug!(
            seed = header.seed,
            files = sections.file_count,
            dirs = sections.dir_count,
            file_info_len = sections.file_info_len,
            dir_info_len = sections.dir_info_len,
            "read RAS header"
        );

        let mut file_blob = read_block(&mut source, sections.file_info_len, "file records")?;
        cipher::decrypt_in_place(&mut file_blob, header.seed);
        let mut dir_blob = read_block(&mut source, sections.dir_info_len, "directory records")?;
        cipher::decrypt_in_place(&mut dir_blob, header.seed);

        let records = records::decode(&sections, &file_blob, &dir_blob)?;
        let index = ArchiveIndex::build(&records, options.move_to_front)?;

        Ok(Self {
            source,
            name: String::from("memory"),
            header,
            index,
        })
    }

    /// Archive name (file name when opened from disk).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seed and decrypted section header.
    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Decrypted section header.
    #[inline]
    pub fn sections(&self) -> &SectionHeader {
        &self.header.sections
    }

    /// The directory index.
    #[inline]
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Number of entries, not counting the root.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.index.len() - 1
    }

    /// Iterate over every entry except the root, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.index.iter().skip(1)
    }

    /// Find an entry by path.
    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.index.find(path)
    }

    /// Whether a path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.index.lookup(path).is_some()
    }

    /// Base names of the direct children of a directory.
    ///
    /// An empty path names the root. Paths that are missing or name a file
    /// yield an empty list rather than an error.
    pub fn enumerate(&self, path: &str) -> Vec<String> {
        match self.index.lookup(path) {
            Some(id) => self
                .index
                .children(id)
                .map(|child| child.name().to_string())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every path below `path`, depth first, directories before their contents.
    pub fn walk(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let Some(start) = self.index.lookup(path).and_then(|id| self.index.get(id)) else {
            return out;
        };

        let mut stack: Vec<EntryId> = start.children().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.index.get(id) {
                out.push(entry.path().to_string());
                stack.extend(entry.children().iter().rev().copied());
            }
        }
        out
    }

    /// Metadata for a path.
    pub fn stat(&self, path: &str) -> Result<Stat> {
        self.index
            .find(path)
            .map(Entry::stat)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Open a file for reading.
    pub fn open_read(&self, path: &str) -> Result<ReadView> {
        let entry = self
            .index
            .find(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        if entry.kind() != EntryKind::File {
            return Err(Error::NotAFile(path.to_string()));
        }

        ReadView::new(
            self.source.duplicate()?,
            Arc::from(entry.path()),
            entry.offset(),
            entry.size(),
        )
    }

    /// Read a whole file into memory.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.open_read(path)?.read_to_vec()
    }

    /// Always fails; archives are read-only.
    pub fn open_write(&self, _path: &str) -> Result<ReadView> {
        Err(Error::ReadOnly)
    }

    /// Always fails; archives are read-only.
    pub fn open_append(&self, _path: &str) -> Result<ReadView> {
        Err(Error::ReadOnly)
    }

    /// Always fails; archives are read-only.
    pub fn remove(&self, _path: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// Always fails; archives are read-only.
    pub fn mkdir(&self, _path: &str) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// Release the index and the byte source together.
    ///
    /// Views opened earlier keep their own sources and stay readable.
    pub fn close(self) {
        debug!(name = %self.name, entries = self.index.len(), "closing RAS archive");
    }
}

impl std::fmt::Debug for RasArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasArchive")
            .field("name", &self.name)
            .field("seed", &self.header.seed)
            .field("entries", &self.index.len())
            .finish()
    }
}
