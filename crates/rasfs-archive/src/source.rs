//! Seekable byte sources backing an archive.
//!
//! A [`ByteSource`] is what the decoder reads raw archive bytes from. Every
//! [`ReadView`](crate::ReadView) owns its own duplicate so cursors are never
//! shared between readers.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use crate::{Error, Result};

/// A seekable, duplicatable source of archive bytes.
///
/// Closing a source is dropping it.
pub trait ByteSource: Read + Seek + Send + Sync + fmt::Debug {
    /// Total length in bytes.
    fn length(&mut self) -> io::Result<u64>;

    /// Open an independent handle onto the same bytes.
    ///
    /// The duplicate has its own cursor, starting at zero.
    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>>;
}

impl ByteSource for Box<dyn ByteSource> {
    fn length(&mut self) -> io::Result<u64> {
        (**self).length()
    }

    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>> {
        (**self).duplicate()
    }
}

/// A cursor over shared, immutable bytes.
///
/// Duplicates share the buffer and only copy the position.
pub struct SliceSource<B> {
    data: Arc<B>,
    position: u64,
}

/// Byte source over a memory-mapped file.
pub type MmapSource = SliceSource<Mmap>;

/// Byte source over an owned buffer.
pub type MemorySource = SliceSource<Vec<u8>>;

impl<B: AsRef<[u8]>> SliceSource<B> {
    /// Wrap a buffer.
    pub fn new(data: B) -> Self {
        Self::from_shared(Arc::new(data))
    }

    /// Wrap an already shared buffer.
    pub fn from_shared(data: Arc<B>) -> Self {
        Self { data, position: 0 }
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        (*self.data).as_ref()
    }
}

impl MmapSource {
    /// Memory-map a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // The mapping is read-only; the archive must not be truncated while open.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::new(mmap))
    }
}

impl<B: AsRef<[u8]>> Read for SliceSource<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.as_slice();
        let start = usize::try_from(self.position).unwrap_or(usize::MAX).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }
}

impl<B: AsRef<[u8]>> Seek for SliceSource<B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.as_slice().len() as u64;
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of source")
        })?;
        self.position = target;
        Ok(target)
    }
}

impl<B> ByteSource for SliceSource<B>
where
    B: AsRef<[u8]> + Send + Sync + 'static,
{
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.as_slice().len() as u64)
    }

    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>> {
        Ok(Box::new(Self::from_shared(Arc::clone(&self.data))))
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for SliceSource<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceSource")
            .field("len", &self.as_slice().len())
            .field("position", &self.position)
            .finish()
    }
}

/// Byte source over a plain file handle.
///
/// Duplicates reopen the path; `File::try_clone` would share the cursor.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
}

impl FileSource {
    /// Open a file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { file, path })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ByteSource for FileSource {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn duplicate(&self) -> io::Result<Box<dyn ByteSource>> {
        Ok(Box::new(Self {
            file: File::open(&self.path)?,
            path: self.path.clone(),
        }))
    }
}

/// `read_exact` that reports a short source as [`Error::Truncated`].
pub(crate) fn read_exact_or_truncated<R: Read + ?Sized>(
    source: &mut R,
    buf: &mut [u8],
    section: &'static str,
) -> Result<()> {
    source.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Truncated {
            section,
            needed: buf.len() as u64,
        },
        _ => Error::Io(e),
    })
}

/// Read a block of `len` bytes into a freshly reserved buffer.
pub(crate) fn read_block<R: Read + ?Sized>(
    source: &mut R,
    len: u32,
    section: &'static str,
) -> Result<Vec<u8>> {
    let len = len as usize;
    let mut block = Vec::new();
    block
        .try_reserve_exact(len)
        .map_err(|e| Error::out_of_memory(len, e))?;
    block.resize(len, 0);
    read_exact_or_truncated(source, &mut block, section)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source_read_and_seek() {
        let mut source = MemorySource::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];

        source.seek(SeekFrom::Start(3)).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"3456");

        source.seek(SeekFrom::End(-2)).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(source.read(&mut buf).unwrap(), 0);

        source.seek(SeekFrom::Start(100)).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert!(source.seek(SeekFrom::Current(-1000)).is_err());
    }

    #[test]
    fn test_duplicate_has_independent_cursor() {
        let mut source = MemorySource::new(b"abcdef".to_vec());
        source.seek(SeekFrom::Start(4)).unwrap();

        let mut dup = source.duplicate().unwrap();
        assert_eq!(dup.stream_position().unwrap(), 0);
        assert_eq!(dup.length().unwrap(), 6);

        let mut buf = [0u8; 2];
        dup.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
        assert_eq!(source.stream_position().unwrap(), 4);
    }

    #[test]
    fn test_file_source_duplicate() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"hello world").unwrap();

        let mut source = FileSource::open(tmp.path()).unwrap();
        assert_eq!(source.length().unwrap(), 11);
        source.seek(SeekFrom::Start(6)).unwrap();

        let mut dup = source.duplicate().unwrap();
        let mut buf = [0u8; 5];
        dup.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_read_block_truncated() {
        let mut source = MemorySource::new(vec![1, 2, 3]);
        let err = read_block(&mut source, 8, "file records").unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                section: "file records",
                needed: 8
            }
        ));
    }
}
