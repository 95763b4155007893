//! RAS index entries.

use crate::path;

/// Stable handle to an entry inside an [`ArchiveIndex`](crate::ArchiveIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u32);

impl EntryId {
    /// The root directory.
    pub const ROOT: EntryId = EntryId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntryKind {
    File,
    Directory,
}

/// A node of the archive's directory tree.
///
/// Directories own the ids of their direct children; files carry the
/// payload extent.
#[derive(Debug, Clone)]
pub struct Entry {
    path: String,
    kind: EntryKind,
    offset: u64,
    size: u64,
    uncompressed_size: u64,
    children: Vec<EntryId>,
}

impl Entry {
    pub(crate) fn directory(path: String) -> Self {
        Self {
            path,
            kind: EntryKind::Directory,
            offset: 0,
            size: 0,
            uncompressed_size: 0,
            children: Vec::new(),
        }
    }

    pub(crate) fn file(path: String, offset: u64, size: u64, uncompressed_size: u64) -> Self {
        Self {
            path,
            kind: EntryKind::File,
            offset,
            size,
            uncompressed_size,
            children: Vec::new(),
        }
    }

    /// Overwrite the payload extent of a file entry.
    pub(crate) fn set_extent(&mut self, offset: u64, size: u64, uncompressed_size: u64) {
        self.offset = offset;
        self.size = size;
        self.uncompressed_size = uncompressed_size;
    }

    pub(crate) fn push_child(&mut self, child: EntryId) {
        self.children.push(child);
    }

    /// Full normalized path; empty for the root.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component.
    #[inline]
    pub fn name(&self) -> &str {
        path::basename(&self.path)
    }

    /// Entry kind.
    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Check if this entry is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Absolute payload offset within the archive.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Payload size in bytes; zero for directories.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Uncompressed size as declared by the record; informational only.
    #[inline]
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Ids of the direct children, in insertion order.
    #[inline]
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }

    /// Metadata as reported by [`RasArchive::stat`](crate::RasArchive::stat).
    pub fn stat(&self) -> Stat {
        Stat {
            kind: self.kind,
            size: self.size,
            read_only: true,
            create_time: 0,
            modify_time: 0,
            access_time: 0,
        }
    }
}

/// File metadata.
///
/// The format stores no timestamps, so all times are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    pub kind: EntryKind,
    /// Payload size; zero for directories.
    pub size: u64,
    /// Always true.
    pub read_only: bool,
    pub create_time: i64,
    pub modify_time: i64,
    pub access_time: i64,
}
