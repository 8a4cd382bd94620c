//! Chunk header format
//!
//! # Format
//!
//! ```text
//! +------------------+
//! | Magic: PGCHUNK\0 | 8 bytes
//! | Chunk offset     | 8 bytes (u64 LE)
//! | Chunk size       | 8 bytes (u64 LE)
//! | CRC32            | 4 bytes
//! | Reserved         | 36 bytes (zero)
//! +------------------+
//! ```
//!
//! The header is written last when a chunk is appended, so a chunk whose
//! header does not validate was never made available to the allocator.

use super::{verify_crc, FieldReader};
use crate::error::FormatError;

/// Chunk magic bytes
pub const CHUNK_MAGIC: [u8; 8] = *b"PGCHUNK\0";

/// Size of the chunk header in bytes
pub const CHUNK_HEADER_SIZE: u64 = 64;

/// Growth granularity
pub const PAGE_SIZE: u64 = 4096;

/// First block offset in chunk 0 (after the superblock slots)
pub const FIRST_DATA_OFFSET: u64 = PAGE_SIZE;

/// Default chunk size (16 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Smallest accepted chunk size
pub const MIN_CHUNK_SIZE: u64 = 2 * PAGE_SIZE;

/// Largest accepted chunk size (block sizes are `u32`)
pub const MAX_CHUNK_SIZE: u64 = 1 << 30;

const CRC_AT: usize = 24;

/// Header at the start of every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// File offset of the chunk
    pub offset: u64,
    /// Chunk size in bytes, header included
    pub size: u64,
}

impl ChunkHeader {
    /// Create a header
    pub fn new(offset: u64, size: u64) -> Self {
        ChunkHeader { offset, size }
    }

    /// Offset of the first block in this chunk
    pub fn data_start(&self) -> u64 {
        if self.offset == 0 {
            FIRST_DATA_OFFSET
        } else {
            self.offset + CHUNK_HEADER_SIZE
        }
    }

    /// Offset one past the last byte of this chunk
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; CHUNK_HEADER_SIZE as usize] {
        let mut bytes = [0u8; CHUNK_HEADER_SIZE as usize];
        bytes[0..8].copy_from_slice(&CHUNK_MAGIC);
        bytes[8..16].copy_from_slice(&self.offset.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.size.to_le_bytes());
        let crc = crc32fast::hash(&bytes[..CRC_AT]);
        bytes[CRC_AT..CRC_AT + 4].copy_from_slice(&crc.to_le_bytes());
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        const WHAT: &str = "chunk header";
        if bytes.len() < CHUNK_HEADER_SIZE as usize {
            return Err(FormatError::TooShort { what: WHAT });
        }
        if bytes[0..8] != CHUNK_MAGIC {
            return Err(FormatError::InvalidMagic { what: WHAT });
        }
        verify_crc(bytes, CRC_AT, WHAT)?;

        let mut r = FieldReader::new(&bytes[8..CRC_AT], WHAT);
        let offset = r.u64()?;
        let size = r.u64()?;
        if size < MIN_CHUNK_SIZE || size % PAGE_SIZE != 0 {
            return Err(FormatError::InvalidBlock {
                offset,
                reason: format!("bad chunk size {}", size),
            });
        }
        Ok(ChunkHeader { offset, size })
    }
}

/// Round `n` up to a multiple of `align`
pub fn round_up(n: u64, align: u64) -> u64 {
    (n + align - 1) / align * align
}

/// Size of a new chunk that can hold a block of `block_size` bytes
pub fn chunk_size_for(configured: u64, block_size: u64) -> u64 {
    configured.max(round_up(block_size + CHUNK_HEADER_SIZE, PAGE_SIZE))
}
