//! Bounded read stream over one archived file.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::source::ByteSource;
use crate::{Error, Result};

/// A read-only window of `[0, size)` over one file's payload.
///
/// Each view owns a duplicated byte source positioned at
/// `offset + position`, so separate views can be read concurrently.
#[derive(Debug)]
pub struct ReadView {
    source: Box<dyn ByteSource>,
    path: Arc<str>,
    offset: u64,
    size: u64,
    position: u64,
}

impl ReadView {
    /// Bind a source to `[offset, offset + size)`, seeking it to `offset`.
    pub fn new(
        mut source: Box<dyn ByteSource>,
        path: Arc<str>,
        offset: u64,
        size: u64,
    ) -> Result<Self> {
        source.seek(SeekFrom::Start(offset))?;
        Ok(Self {
            source,
            path,
            offset,
            size,
            position: 0,
        })
    }

    /// Archive path of the file being read.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> u64 {
        self.size
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Logical position within the file.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Bytes left before the end of the file.
    pub fn remaining(&self) -> u64 {
        self.size - self.position
    }

    /// Move to a logical position.
    ///
    /// Positions at or beyond the file size fail with [`Error::PastEof`].
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        if position >= self.size {
            return Err(Error::PastEof {
                position,
                size: self.size,
            });
        }
        self.source.seek(SeekFrom::Start(self.offset + position))?;
        self.position = position;
        Ok(())
    }

    /// Read up to `buf.len()` bytes, never past the end of the file.
    ///
    /// Returns zero at the end of the file. A source that ends before the
    /// declared size yields [`Error::Truncated`].
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let wanted = buf.len().min(usize::try_from(self.remaining()).unwrap_or(usize::MAX));
        if wanted == 0 {
            return Ok(0);
        }

        let count = self.source.read(&mut buf[..wanted])?;
        if count == 0 {
            return Err(Error::Truncated {
                section: "file payload",
                needed: self.remaining(),
            });
        }
        self.position += count as u64;
        Ok(count)
    }

    /// Read the rest of the file.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        let mut out = Vec::new();
        out.try_reserve_exact(remaining)
            .map_err(|e| Error::out_of_memory(remaining, e))?;
        out.resize(remaining, 0);

        let mut filled = 0;
        while filled < out.len() {
            filled += self.read_bytes(&mut out[filled..])?;
        }
        Ok(out)
    }

    /// An independent view of the same file, starting at position zero.
    pub fn duplicate(&self) -> Result<Self> {
        Self::new(
            self.source.duplicate()?,
            Arc::clone(&self.path),
            self.offset,
            self.size,
        )
    }

    /// Always fails; archives are read-only.
    pub fn write_bytes(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::ReadOnly)
    }

    /// Nothing is ever buffered for writing.
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Read for ReadView {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(io::Error::from)
    }
}

impl Seek for ReadView {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.seek_to(target)?;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl Write for ReadView {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        ReadView::flush(self).map_err(io::Error::from)
    }
}
