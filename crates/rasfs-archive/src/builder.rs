//! RAS archive writer.
//!
//! Produces containers the reader accepts: encrypted header and index blobs
//! followed by file payloads in declaration order.

use std::io::{self, Write};

use crate::cipher;
use crate::header::{SectionHeader, RAS_SIGNATURE};
use crate::records::{self, DIR_RECORD_TRAILER_LEN, FILE_RECORD_TRAILER_LEN};

#[derive(Debug, Clone)]
struct PendingFile {
    name: String,
    dir_index: u32,
    data: Vec<u8>,
}

/// Narrow a length to the format's 32-bit field.
fn length_field(len: usize, what: &str) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} of {len} bytes does not fit a 32-bit length field"),
        )
    })
}

fn encode_name(name: &str) -> io::Result<Vec<u8>> {
    records::encode_name(name).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name:?} has characters outside the single-byte range"),
        )
    })
}

/// Builder for RAS archives.
///
/// # Example
///
/// ```
/// use rasfs_archive::RasBuilder;
///
/// let mut builder = RasBuilder::new(42);
/// let data = builder.add_dir(r"\data\");
/// builder.add_file(data, "item.bin", b"0123456789");
/// let bytes = builder.build()?;
/// assert_eq!(&bytes[..4], b"RAS\0");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RasBuilder {
    seed: i32,
    reserved: [u32; 5],
    dirs: Vec<String>,
    files: Vec<PendingFile>,
}

impl RasBuilder {
    /// Create a builder that encrypts with `seed`.
    pub fn new(seed: i32) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Set the uninterpreted header fields.
    pub fn reserved(&mut self, reserved: [u32; 5]) -> &mut Self {
        self.reserved = reserved;
        self
    }

    /// Declare a directory record and return its index.
    ///
    /// Names are stored as given, conventionally `\path\` with a trailing
    /// separator; `\` alone is the root.
    pub fn add_dir(&mut self, name: &str) -> u32 {
        self.dirs.push(name.to_string());
        (self.dirs.len() - 1) as u32
    }

    /// Declare a file inside directory `dir_index`.
    ///
    /// The index is written as given, even if no such directory exists.
    pub fn add_file(&mut self, dir_index: u32, name: &str, data: &[u8]) -> &mut Self {
        self.files.push(PendingFile {
            name: name.to_string(),
            dir_index,
            data: data.to_vec(),
        });
        self
    }

    /// Number of file records declared so far.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn file_blob(&self) -> io::Result<Vec<u8>> {
        let mut blob = Vec::new();
        for file in &self.files {
            blob.extend_from_slice(&encode_name(&file.name)?);
            blob.push(0);

            let size = length_field(file.data.len(), "file payload")?;
            let mut trailer = [0u8; FILE_RECORD_TRAILER_LEN];
            trailer[0..4].copy_from_slice(&size.to_le_bytes());
            trailer[4..8].copy_from_slice(&size.to_le_bytes());
            trailer[12..16].copy_from_slice(&file.dir_index.to_le_bytes());
            blob.extend_from_slice(&trailer);
        }
        Ok(blob)
    }

    fn dir_blob(&self) -> io::Result<Vec<u8>> {
        let mut blob = Vec::new();
        for name in &self.dirs {
            blob.extend_from_slice(&encode_name(name)?);
            blob.push(0);
            blob.extend_from_slice(&[0u8; DIR_RECORD_TRAILER_LEN]);
        }
        Ok(blob)
    }

    /// Write the archive.
    ///
    /// Fails with `InvalidInput` when a name has characters above U+00FF or
    /// a count or length does not fit its 32-bit field.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut file_blob = self.file_blob()?;
        let mut dir_blob = self.dir_blob()?;

        let sections = SectionHeader {
            file_count: length_field(self.files.len(), "file record count")?,
            dir_count: length_field(self.dirs.len(), "directory record count")?,
            file_info_len: length_field(file_blob.len(), "file record blob")?,
            dir_info_len: length_field(dir_blob.len(), "directory record blob")?,
            reserved: self.reserved,
        };
        let mut header = sections.to_le_bytes();

        cipher::encrypt_in_place(&mut header, self.seed);
        cipher::encrypt_in_place(&mut file_blob, self.seed);
        cipher::encrypt_in_place(&mut dir_blob, self.seed);

        writer.write_all(&RAS_SIGNATURE.to_le_bytes())?;
        writer.write_all(&self.seed.to_le_bytes())?;
        writer.write_all(&header)?;
        writer.write_all(&file_blob)?;
        writer.write_all(&dir_blob)?;
        for file in &self.files {
            writer.write_all(&file.data)?;
        }
        Ok(())
    }

    /// Build the archive in memory.
    pub fn build(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}
