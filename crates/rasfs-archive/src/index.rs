//! Path-addressable directory tree with a hashed lookup cache.
//!
//! Entries live in a single arena owned by [`ArchiveIndex`] and are addressed
//! by [`EntryId`]. A fixed set of hash buckets maps paths to ids; each bucket
//! is a chain searched front to back, and a successful lookup moves the hit
//! to the front of its chain.
//!
//! The tree is immutable once built. Chain reordering is the only mutation
//! a lookup performs and it happens under the bucket lock, so lookups from
//! several threads are serialized rather than racing on the chains.

use std::hash::Hasher;

use parking_lot::Mutex;
use rustc_hash::FxHasher;
use tracing::{debug, warn};

use crate::entry::{Entry, EntryId, EntryKind};
use crate::path;
use crate::records::FileRecord;
use crate::{Error, Result};

/// Records per hash bucket, used to size the table once.
const ENTRIES_PER_BUCKET: usize = 5;

/// String hash used for bucket selection.
fn hash_path(key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// Hash buckets holding entry ids, most recently found first.
#[derive(Debug)]
struct HashChains {
    buckets: Vec<Vec<EntryId>>,
    move_to_front: bool,
}

impl HashChains {
    fn new(bucket_count: usize, move_to_front: bool) -> Self {
        Self {
            buckets: vec![Vec::new(); bucket_count.max(1)],
            move_to_front,
        }
    }

    #[inline]
    fn bucket_of(&self, key: &str) -> usize {
        (hash_path(key) % self.buckets.len() as u64) as usize
    }

    fn insert(&mut self, key: &str, id: EntryId) {
        let bucket = self.bucket_of(key);
        self.buckets[bucket].insert(0, id);
    }

    fn find(&mut self, entries: &[Entry], key: &str) -> Option<EntryId> {
        let bucket = self.bucket_of(key);
        let chain = &mut self.buckets[bucket];
        let at = chain
            .iter()
            .position(|id| entries[id.index()].path() == key)?;

        let id = chain[at];
        if self.move_to_front && at > 0 {
            chain.remove(at);
            chain.insert(0, id);
        }
        Some(id)
    }
}

/// The decoded directory tree of one archive.
#[derive(Debug)]
pub struct ArchiveIndex {
    entries: Vec<Entry>,
    chains: Mutex<HashChains>,
}

impl ArchiveIndex {
    /// Build the tree from file records in declaration order.
    ///
    /// Records whose raw path ends in a separator declare directories.
    /// Missing ancestors are created as empty directories. A path declared
    /// twice with the same kind keeps the later record's extent; a path
    /// declared as both a file and a directory is corrupt.
    pub fn build(records: &[FileRecord], move_to_front: bool) -> Result<Self> {
        let mut builder = IndexBuilder::new(records.len(), move_to_front)?;
        for record in records {
            builder.add(record)?;
        }

        let index = builder.finish();
        debug!(
            entries = index.entries.len(),
            buckets = index.bucket_count(),
            "built archive index"
        );
        Ok(index)
    }

    /// Number of entries, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds only the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Number of hash buckets, fixed at build time.
    pub fn bucket_count(&self) -> usize {
        self.chains.lock().buckets.len()
    }

    /// The root directory.
    #[inline]
    pub fn root(&self) -> &Entry {
        &self.entries[EntryId::ROOT.index()]
    }

    /// Get an entry by id.
    #[inline]
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.index())
    }

    /// Iterate over all entries in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter()
    }

    /// Direct children of a directory entry.
    pub fn children(&self, id: EntryId) -> impl Iterator<Item = &Entry> + '_ {
        self.entries
            .get(id.index())
            .map(Entry::children)
            .unwrap_or_default()
            .iter()
            .map(|child| &self.entries[child.index()])
    }

    /// Resolve a path to an entry id.
    ///
    /// The path is normalized first; an empty path names the root.
    pub fn lookup(&self, path: &str) -> Option<EntryId> {
        let key = path::normalize(path);
        if key.is_empty() {
            return Some(EntryId::ROOT);
        }
        self.chains.lock().find(&self.entries, &key)
    }

    /// Resolve a path to an entry.
    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.lookup(path).and_then(|id| self.get(id))
    }

    /// Paths in the hash chain that `path` falls into, front first.
    ///
    /// Diagnostic view; does not reorder the chain.
    pub fn bucket_chain(&self, path: &str) -> Vec<&str> {
        let key = path::normalize(path);
        let chains = self.chains.lock();
        let bucket = chains.bucket_of(&key);
        chains.buckets[bucket]
            .iter()
            .map(|id| self.entries[id.index()].path())
            .collect()
    }
}

/// Single-pass construction state. Dropping it releases every entry.
struct IndexBuilder {
    entries: Vec<Entry>,
    chains: HashChains,
}

impl IndexBuilder {
    fn new(record_count: usize, move_to_front: bool) -> Result<Self> {
        let mut entries = Vec::new();
        let wanted = record_count.saturating_add(1);
        entries.try_reserve(wanted).map_err(|e| {
            Error::out_of_memory(wanted.saturating_mul(std::mem::size_of::<Entry>()), e)
        })?;
        entries.push(Entry::directory(String::new()));

        Ok(Self {
            entries,
            chains: HashChains::new(record_count / ENTRIES_PER_BUCKET, move_to_front),
        })
    }

    fn finish(self) -> ArchiveIndex {
        ArchiveIndex {
            entries: self.entries,
            chains: Mutex::new(self.chains),
        }
    }

    fn add(&mut self, record: &FileRecord) -> Result<()> {
        let kind = if path::is_dir_marker(&record.path) {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let key = path::normalize(&record.path);

        if key.is_empty() {
            return match kind {
                EntryKind::Directory => Ok(()),
                EntryKind::File => Err(Error::corrupt(format!(
                    "file record {:?} has an empty path",
                    record.path
                ))),
            };
        }

        if let Some(id) = self.chains.find(&self.entries, &key) {
            let existing = &mut self.entries[id.index()];
            if existing.kind() != kind {
                return Err(Error::corrupt(format!(
                    "{key} is declared as both a file and a directory"
                )));
            }
            if kind == EntryKind::File {
                warn!(
                    path = %key,
                    old_offset = existing.offset(),
                    new_offset = record.offset,
                    "duplicate file record, keeping the later one"
                );
                existing.set_extent(
                    record.offset,
                    u64::from(record.size),
                    u64::from(record.uncompressed_size),
                );
            }
            return Ok(());
        }

        let parent = self.ensure_dir(path::parent(&key).unwrap_or_default())?;
        let entry = match kind {
            EntryKind::Directory => Entry::directory(key),
            EntryKind::File => Entry::file(
                key,
                record.offset,
                u64::from(record.size),
                u64::from(record.uncompressed_size),
            ),
        };
        self.insert(parent, entry)?;
        Ok(())
    }

    /// Find or create the directory at `key`, creating ancestors first.
    fn ensure_dir(&mut self, key: &str) -> Result<EntryId> {
        if key.is_empty() {
            return Ok(EntryId::ROOT);
        }

        if let Some(id) = self.chains.find(&self.entries, key) {
            return match self.entries[id.index()].kind() {
                EntryKind::Directory => Ok(id),
                EntryKind::File => Err(Error::corrupt(format!(
                    "{key} is used as a directory but declared as a file"
                ))),
            };
        }

        let parent = self.ensure_dir(path::parent(key).unwrap_or_default())?;
        self.insert(parent, Entry::directory(key.to_string()))
    }

    fn insert(&mut self, parent: EntryId, entry: Entry) -> Result<EntryId> {
        let id = u32::try_from(self.entries.len())
            .map(EntryId)
            .map_err(|_| Error::corrupt("too many entries"))?;
        self.entries
            .try_reserve(1)
            .map_err(|e| Error::out_of_memory(std::mem::size_of::<Entry>(), e))?;

        self.chains.insert(entry.path(), id);
        self.entries.push(entry);
        self.entries[parent.index()].push_child(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, offset: u64, size: u32) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            uncompressed_size: size,
            size,
            dir_index: 0,
            offset,
        }
    }

    fn child_names(index: &ArchiveIndex, path: &str) -> Vec<String> {
        let id = index.lookup(path).unwrap();
        index.children(id).map(|e| e.name().to_string()).collect()
    }

    #[test]
    fn test_single_file_in_directory() {
        let index = ArchiveIndex::build(&[record("data/item.bin", 72, 10)], true).unwrap();

        assert_eq!(index.len(), 3);
        let dir = index.find("data").unwrap();
        assert_eq!(dir.kind(), EntryKind::Directory);
        assert_eq!(dir.size(), 0);

        let file = index.find("data/item.bin").unwrap();
        assert_eq!(file.kind(), EntryKind::File);
        assert_eq!((file.offset(), file.size()), (72, 10));

        assert_eq!(child_names(&index, ""), vec!["data"]);
        assert_eq!(child_names(&index, "data"), vec!["item.bin"]);
    }

    #[test]
    fn test_ancestors_are_materialized_once() {
        let records = [
            record("a/b/c/one.txt", 0, 1),
            record("a/b/two.txt", 1, 1),
            record("a/b/c/three.txt", 2, 1),
        ];
        let index = ArchiveIndex::build(&records, true).unwrap();

        // root, a, a/b, a/b/c and three files
        assert_eq!(index.len(), 7);
        assert_eq!(child_names(&index, "a"), vec!["b"]);
        assert_eq!(child_names(&index, "a/b"), vec!["c", "two.txt"]);
        assert_eq!(child_names(&index, "a/b/c"), vec!["one.txt", "three.txt"]);
    }

    #[test]
    fn test_last_write_wins() {
        let records = [record("x/dup.bin", 100, 4), record("x/dup.bin", 200, 9)];
        let index = ArchiveIndex::build(&records, true).unwrap();

        let entry = index.find("x/dup.bin").unwrap();
        assert_eq!((entry.offset(), entry.size()), (200, 9));
        assert_eq!(child_names(&index, "x"), vec!["dup.bin"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_directory_marker_records() {
        let records = [record("empty/", 0, 0), record("data/", 0, 0), record("data/f", 0, 3)];
        let index = ArchiveIndex::build(&records, true).unwrap();

        assert_eq!(index.find("empty").unwrap().kind(), EntryKind::Directory);
        assert_eq!(child_names(&index, "empty"), Vec::<String>::new());
        assert_eq!(child_names(&index, ""), vec!["empty", "data"]);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_kind_conflicts_are_corrupt() {
        let err = ArchiveIndex::build(&[record("a", 0, 1), record("a/", 0, 0)], true).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));

        let err = ArchiveIndex::build(&[record("a", 0, 1), record("a/b", 0, 1)], true).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));

        let err = ArchiveIndex::build(&[record("a/b", 0, 1), record("a", 0, 1)], true).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));
    }

    #[test]
    fn test_empty_file_path_is_corrupt() {
        let err = ArchiveIndex::build(&[record("", 0, 1)], true).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));

        let index = ArchiveIndex::build(&[record("/", 0, 0)], true).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_bucket_count() {
        let few: Vec<_> = (0..4).map(|i| record(&format!("f{i}"), 0, 0)).collect();
        assert_eq!(ArchiveIndex::build(&few, true).unwrap().bucket_count(), 1);

        let many: Vec<_> = (0..23).map(|i| record(&format!("f{i}"), 0, 0)).collect();
        assert_eq!(ArchiveIndex::build(&many, true).unwrap().bucket_count(), 4);
    }

    #[test]
    fn test_lookup_normalizes_queries() {
        let index = ArchiveIndex::build(&[record("data/item.bin", 0, 1)], true).unwrap();

        assert!(index.find(r"\data\item.bin").is_some());
        assert!(index.find("/data//item.bin").is_some());
        assert!(index.find("data/").is_some());
        assert_eq!(index.lookup(""), Some(EntryId::ROOT));
        assert!(index.find("data/missing").is_none());
    }

    #[test]
    fn test_move_to_front() {
        // Fewer than ten records keeps everything in one bucket.
        let records = [record("a", 0, 1), record("b", 1, 1), record("c", 2, 1)];
        let index = ArchiveIndex::build(&records, true).unwrap();
        assert_eq!(index.bucket_count(), 1);

        // New entries are chained at the front.
        assert_eq!(index.bucket_chain("a"), vec!["c", "b", "a"]);

        index.lookup("a");
        assert_eq!(index.bucket_chain("a"), vec!["a", "c", "b"]);

        index.lookup("b");
        index.lookup("a");
        assert_eq!(index.bucket_chain("a"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_plain_chain_order() {
        let records = [record("a", 0, 1), record("b", 1, 1), record("c", 2, 1)];
        let index = ArchiveIndex::build(&records, false).unwrap();

        index.lookup("a");
        index.lookup("b");
        assert_eq!(index.bucket_chain("a"), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_index_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArchiveIndex>();

        let records: Vec<_> = (0..50).map(|i| record(&format!("d/f{i}"), i, 1)).collect();
        let index = ArchiveIndex::build(&records, true).unwrap();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let index = &index;
                scope.spawn(move || {
                    for i in 0..50 {
                        let path = format!("d/f{}", (i * (t + 1)) % 50);
                        assert!(index.find(&path).is_some());
                    }
                });
            }
        });
        assert_eq!(index.len(), 52);
    }
}
