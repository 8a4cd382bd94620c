//! Block header format
//!
//! ```text
//! +----------+------+----------+---------------------+
//! | size u32 | kind | reserved | payload ...         |
//! |  4 bytes | 1 B  |  3 bytes | size - 8 bytes      |
//! +----------+------+----------+---------------------+
//! ```
//!
//! `size` includes the header and is a multiple of [`BLOCK_ALIGN`].

use super::chunk::round_up;
use crate::error::FormatError;

/// Size of a block header in bytes
pub const BLOCK_HEADER_SIZE: u64 = 8;

/// Block size granularity
pub const BLOCK_ALIGN: u64 = 16;

/// Smallest block (a split remainder below this is absorbed)
pub const MIN_BLOCK_SIZE: u64 = 16;

/// What a block holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockKind {
    /// Unallocated space
    Free = 0,
    /// Container header record
    Container = 1,
    /// Encoded container body
    Body = 2,
}

impl BlockKind {
    /// Parse a kind byte
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(BlockKind::Free),
            1 => Some(BlockKind::Container),
            2 => Some(BlockKind::Body),
            _ => None,
        }
    }
}

/// Block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block size including this header
    pub size: u32,
    /// Block kind
    pub kind: BlockKind,
}

impl BlockHeader {
    /// Create a header
    pub fn new(size: u32, kind: BlockKind) -> Self {
        BlockHeader { size, kind }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE as usize] {
        let mut bytes = [0u8; BLOCK_HEADER_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.size.to_le_bytes());
        bytes[4] = self.kind as u8;
        bytes
    }

    /// Deserialize from bytes found at `offset`
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self, FormatError> {
        if bytes.len() < BLOCK_HEADER_SIZE as usize {
            return Err(FormatError::TooShort {
                what: "block header",
            });
        }
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let kind = BlockKind::from_u8(bytes[4]).ok_or(FormatError::InvalidTag {
            what: "block header",
            tag: bytes[4],
        })?;
        if u64::from(size) < MIN_BLOCK_SIZE || u64::from(size) % BLOCK_ALIGN != 0 {
            return Err(FormatError::InvalidBlock {
                offset,
                reason: format!("bad block size {}", size),
            });
        }
        Ok(BlockHeader { size, kind })
    }
}

/// Block size needed for a payload of `payload_len` bytes
pub fn block_size_for(payload_len: u64) -> u64 {
    round_up(payload_len + BLOCK_HEADER_SIZE, BLOCK_ALIGN).max(MIN_BLOCK_SIZE)
}
