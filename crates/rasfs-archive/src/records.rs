//! File and directory record decoding.
//!
//! Both index blobs are a packed run of records, each a NUL-terminated name
//! followed by a fixed trailer:
//!
//! ```text
//! directory: name\0  reserved[16]
//! file:      name\0  uncompressed_size:u32  size:u32  reserved:u32  dir_index:u32  reserved[24]
//! ```
//!
//! Payload offsets are not stored. File data is laid out back to back in
//! declaration order starting right after the directory blob.
//!
//! Names are raw bytes with no declared encoding. Each byte maps to the
//! char with the same value, so distinct names stay distinct.

use rasfs_common::BinaryReader;
use tracing::trace;

use crate::header::SectionHeader;
use crate::{Error, Result};

/// Bytes following a directory name's NUL.
pub const DIR_RECORD_TRAILER_LEN: usize = 16;

/// Bytes following a file name's NUL, including the interpreted fields.
pub const FILE_RECORD_TRAILER_LEN: usize = 40;

const UNCOMPRESSED_SIZE_AT: usize = 0;
const SIZE_AT: usize = 4;
const DIR_INDEX_AT: usize = 12;

/// A decoded directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    /// Name with the leading separator stripped and `\` turned into `/`.
    pub name: String,
}

/// A decoded file record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Parent directory name followed directly by the file's own name.
    pub path: String,
    /// Uncompressed size as declared; informational.
    pub uncompressed_size: u32,
    /// Declared size; the authoritative extent of the payload.
    pub size: u32,
    /// Index into the directory records.
    pub dir_index: u32,
    /// Absolute payload offset, assigned from declaration order.
    pub offset: u64,
}

/// Decode a raw record name one byte per char, turning `\` into `/`.
pub fn decode_name(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| if b == b'\\' { '/' } else { char::from(b) })
        .collect()
}

/// Encode a name back to its raw bytes; `None` if a char is above U+00FF.
pub fn encode_name(name: &str) -> Option<Vec<u8>> {
    name.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Normalize a directory name as stored in the archive.
pub fn normalize_dir_name(raw: &[u8]) -> String {
    decode_name(raw.strip_prefix(b"\\").unwrap_or(raw))
}

fn guard_count(count: u32, blob_len: usize, min_record: usize, what: &str) -> Result<usize> {
    let count = count as usize;
    if count > blob_len / min_record {
        return Err(Error::corrupt(format!(
            "{count} {what} records cannot fit in a {blob_len} byte blob"
        )));
    }
    Ok(count)
}

fn with_capacity<T>(count: usize) -> Result<Vec<T>> {
    let mut records = Vec::new();
    records
        .try_reserve_exact(count)
        .map_err(|e| Error::out_of_memory(count.saturating_mul(std::mem::size_of::<T>()), e))?;
    Ok(records)
}

fn record_error(what: &str, index: usize, err: rasfs_common::Error) -> Error {
    Error::corrupt(format!("{what} record {index}: {err}"))
}

/// Decode exactly `count` directory records from a decrypted blob.
///
/// Bytes after the last record are ignored.
pub fn decode_dirs(blob: &[u8], count: u32) -> Result<Vec<DirRecord>> {
    let count = guard_count(count, blob.len(), DIR_RECORD_TRAILER_LEN + 1, "directory")?;
    let mut dirs = with_capacity(count)?;
    let mut reader = BinaryReader::new(blob);

    for index in 0..count {
        let raw = reader
            .read_cstring()
            .map_err(|e| record_error("directory", index, e))?;
        reader
            .skip(DIR_RECORD_TRAILER_LEN)
            .map_err(|e| record_error("directory", index, e))?;

        let name = normalize_dir_name(raw);
        trace!(index, name = %name, "decoded directory record");
        dirs.push(DirRecord { name });
    }

    Ok(dirs)
}

/// Decode exactly `count` file records from a decrypted blob.
///
/// `payload_start` seeds the running offset cursor.
pub fn decode_files(
    blob: &[u8],
    count: u32,
    dirs: &[DirRecord],
    payload_start: u64,
) -> Result<Vec<FileRecord>> {
    let count = guard_count(count, blob.len(), FILE_RECORD_TRAILER_LEN + 1, "file")?;
    let mut files = with_capacity(count)?;
    let mut reader = BinaryReader::new(blob);
    let mut offset = payload_start;

    for index in 0..count {
        let raw = reader
            .read_cstring()
            .map_err(|e| record_error("file", index, e))?;

        let field = |at| {
            reader
                .peek_u32_at(at)
                .map_err(|e| record_error("file", index, e))
        };
        let uncompressed_size = field(UNCOMPRESSED_SIZE_AT)?;
        let size = field(SIZE_AT)?;
        let dir_index = field(DIR_INDEX_AT)?;
        reader
            .skip(FILE_RECORD_TRAILER_LEN)
            .map_err(|e| record_error("file", index, e))?;

        let dir = dirs.get(dir_index as usize).ok_or_else(|| {
            Error::corrupt(format!(
                "file record {index} names directory {dir_index} but only {} exist",
                dirs.len()
            ))
        })?;

        let path = format!("{}{}", dir.name, decode_name(raw));
        trace!(index, path = %path, offset, size, "decoded file record");

        files.push(FileRecord {
            path,
            uncompressed_size,
            size,
            dir_index,
            offset,
        });
        offset += u64::from(size);
    }

    Ok(files)
}

/// Decode both decrypted blobs into file records in declaration order.
pub fn decode(
    sections: &SectionHeader,
    file_blob: &[u8],
    dir_blob: &[u8],
) -> Result<Vec<FileRecord>> {
    let dirs = decode_dirs(dir_blob, sections.dir_count)?;
    decode_files(
        file_blob,
        sections.file_count,
        &dirs,
        sections.payload_start(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_blob(names: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for name in names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.extend_from_slice(&[0xEE; DIR_RECORD_TRAILER_LEN]);
        }
        out
    }

    fn file_blob(files: &[(&str, u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, size, dir) in files {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            let mut trailer = [0u8; FILE_RECORD_TRAILER_LEN];
            trailer[0..4].copy_from_slice(&(size * 2).to_le_bytes());
            trailer[4..8].copy_from_slice(&size.to_le_bytes());
            trailer[8..12].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
            trailer[12..16].copy_from_slice(&dir.to_le_bytes());
            out.extend_from_slice(&trailer);
        }
        out
    }

    #[test]
    fn test_normalize_dir_name() {
        assert_eq!(normalize_dir_name(br"\data\"), "data/");
        assert_eq!(normalize_dir_name(br"\data\maps\"), "data/maps/");
        assert_eq!(normalize_dir_name(br"\"), "");
        assert_eq!(normalize_dir_name(br"plain\"), "plain/");
        // Only a single leading separator is stripped.
        assert_eq!(normalize_dir_name(br"\\x\"), "/x/");
    }

    #[test]
    fn test_decode_dirs_stops_at_count() {
        let mut blob = dir_blob(&[r"\data\", r"\sound\"]);
        blob.extend_from_slice(b"trailing garbage that is never decoded");

        let dirs = decode_dirs(&blob, 2).unwrap();
        assert_eq!(
            dirs,
            vec![
                DirRecord { name: "data/".into() },
                DirRecord { name: "sound/".into() }
            ]
        );
    }

    #[test]
    fn test_decode_files_assigns_sequential_offsets() {
        let dirs = decode_dirs(&dir_blob(&[r"\", r"\data\"]), 2).unwrap();
        let blob = file_blob(&[("a.txt", 10, 0), ("b.bin", 5, 1), ("c.bin", 0, 1)]);

        let files = decode_files(&blob, 3, &dirs, 100).unwrap();
        let summary: Vec<_> = files
            .iter()
            .map(|f| (f.path.as_str(), f.offset, f.size, f.uncompressed_size))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.txt", 100, 10, 20),
                ("data/b.bin", 110, 5, 10),
                ("data/c.bin", 115, 0, 0),
            ]
        );
    }

    #[test]
    fn test_out_of_range_dir_index() {
        let dirs = decode_dirs(&dir_blob(&[r"\data\"]), 1).unwrap();
        let blob = file_blob(&[("x", 1, 1)]);

        let err = decode_files(&blob, 1, &dirs, 0).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));
    }

    #[test]
    fn test_count_exceeding_blob() {
        let blob = file_blob(&[("x", 1, 0)]);
        let dirs = vec![DirRecord { name: String::new() }];

        assert!(matches!(
            decode_files(&blob, 2, &dirs, 0),
            Err(Error::CorruptArchive(_))
        ));
        assert!(matches!(
            decode_dirs(&[], 1),
            Err(Error::CorruptArchive(_))
        ));
        assert!(matches!(
            decode_files(&blob, u32::MAX, &dirs, 0),
            Err(Error::CorruptArchive(_))
        ));
    }

    #[test]
    fn test_truncated_trailer() {
        let mut blob = file_blob(&[("long-enough-name", 1, 0)]);
        blob.truncate(blob.len() - 1);
        let dirs = vec![DirRecord { name: String::new() }];

        assert!(matches!(
            decode_files(&blob, 1, &dirs, 0),
            Err(Error::CorruptArchive(_))
        ));
    }

    #[test]
    fn test_decode_uses_header_counts() {
        let sections = SectionHeader {
            file_count: 1,
            dir_count: 1,
            file_info_len: 49,
            dir_info_len: 23,
            reserved: [0; 5],
        };
        let dirs = dir_blob(&[r"\data\"]);
        let files = file_blob(&[("item.bin", 10, 0)]);
        assert_eq!((files.len(), dirs.len()), (49, 23));

        let records = decode(&sections, &files, &dirs).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "data/item.bin");
        assert_eq!(records[0].offset, 44 + 49 + 23);
        assert_eq!(records[0].size, 10);
    }

    #[test]
    fn test_names_decode_one_byte_per_char() {
        assert_eq!(decode_name(b"caf\xe9.txt"), "caf\u{e9}.txt");
        assert_ne!(decode_name(b"caf\xe9.txt"), decode_name(b"caf\xe8.txt"));
        assert_eq!(decode_name(b"a\\b\xff"), "a/b\u{ff}");
        assert_eq!(encode_name("caf\u{e9}.txt").unwrap(), b"caf\xe9.txt");
        assert_eq!(encode_name("\u{540d}"), None);
    }

    #[test]
    fn test_non_utf8_names_stay_distinct() {
        let dirs = decode_dirs(&dir_blob(&[r"\data\"]), 1).unwrap();
        let mut blob = Vec::new();
        for (name, size) in [(&b"caf\xe9.txt"[..], 3u32), (&b"caf\xe8.txt"[..], 5)] {
            blob.extend_from_slice(name);
            blob.push(0);
            let mut trailer = [0u8; FILE_RECORD_TRAILER_LEN];
            trailer[4..8].copy_from_slice(&size.to_le_bytes());
            blob.extend_from_slice(&trailer);
        }

        let files = decode_files(&blob, 2, &dirs, 0).unwrap();
        assert_eq!(files[0].path, "data/caf\u{e9}.txt");
        assert_eq!(files[1].path, "data/caf\u{e8}.txt");
        assert_eq!((files[1].offset, files[1].size), (3, 5));
    }
}
