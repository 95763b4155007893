//! RAS container header.
//!
//! ```text
//! offset  size  field
//!      0     4  signature ("RAS\0" read as a little-endian u32)
//!      4     4  signed seed
//!      8    36  encrypted section header (nine u32 fields)
//! ```

use std::io::Read;

use rasfs_common::BinaryReader;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::cipher;
use crate::source::read_exact_or_truncated;
use crate::{Error, Result};

/// Signature at the start of every RAS archive.
pub const RAS_SIGNATURE: u32 = 0x0053_4152;

/// Size of the signature plus seed.
pub const PREAMBLE_LEN: u64 = 8;

/// Offset at which the file-record blob starts.
pub const INDEX_START: u64 = PREAMBLE_LEN + SectionHeader::SIZE as u64;

/// Decrypted section header.
///
/// Laid out in file order so it can be read straight out of the decrypted
/// block. The five trailing fields have no known meaning; they are kept so the
/// header can be written back verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct SectionHeader {
    /// Number of file records.
    pub file_count: u32,
    /// Number of directory records.
    pub dir_count: u32,
    /// Byte length of the encrypted file-record blob.
    pub file_info_len: u32,
    /// Byte length of the encrypted directory-record blob.
    pub dir_info_len: u32,
    /// Uninterpreted.
    pub reserved: [u32; 5],
}

impl SectionHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 36;

    /// Absolute offset of the first payload byte.
    pub fn payload_start(&self) -> u64 {
        INDEX_START + u64::from(self.file_info_len) + u64::from(self.dir_info_len)
    }

    /// Decode from an already-decrypted 36-byte block.
    pub fn from_decrypted(block: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(block);
        let header: SectionHeader = reader.read_struct()?;
        Ok(header)
    }

    /// Little-endian encoding of the header before encryption.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let fields = [self.file_count, self.dir_count, self.file_info_len, self.dir_info_len]
            .into_iter()
            .chain(self.reserved);
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// Signature, seed and decrypted section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Base seed for every encrypted block.
    pub seed: i32,
    /// Decrypted section header.
    pub sections: SectionHeader,
}

impl ArchiveHeader {
    /// Read and validate the 44-byte header from the start of a source.
    pub fn read<R: Read + ?Sized>(source: &mut R) -> Result<Self> {
        let mut preamble = [0u8; PREAMBLE_LEN as usize];
        read_exact_or_truncated(source, &mut preamble, "signature")?;

        let mut reader = BinaryReader::new(&preamble);
        let signature = reader.read_u32()?;
        if signature != RAS_SIGNATURE {
            return Err(Error::UnsupportedFormat {
                expected: RAS_SIGNATURE,
                actual: signature,
            });
        }
        let seed = reader.read_i32()?;

        let mut block = [0u8; SectionHeader::SIZE];
        read_exact_or_truncated(source, &mut block, "section header")?;
        cipher::decrypt_in_place(&mut block, seed);

        Ok(Self {
            seed,
            sections: SectionHeader::from_decrypted(&block)?,
        })
    }
}
