//! On-disk byte formats for the data file.
//!
//! This module centralizes all serialization of fixed structures. Keeping it
//! separate from the store (how chunks are grown and blocks handed out)
//! keeps format evolution contained.
//!
//! # File Layout
//!
//! ```text
//! chunk 0                                   chunk 1
//! +--------+-------+-------+---------+      +--------+---------------+
//! | chunk  | super | super | padding |      | chunk  | blocks ...    |
//! | header | A     | B     | to 4KiB | ...  | header |               |
//! +--------+-------+-------+---------+      +--------+---------------+
//!  64 B     1 KiB   1 KiB  blocks from 4096  64 B     blocks from +64
//! ```
//!
//! # Module Structure
//!
//! - `chunk`: chunk header
//! - `superblock`: A/B superblock slots in chunk 0
//! - `block`: block header and kinds
//! - `container`: container header record (kind, generation, body pointer)

pub mod block;
pub mod chunk;
pub mod container;
pub mod superblock;

pub use block::{
    block_size_for, BlockHeader, BlockKind, BLOCK_ALIGN, BLOCK_HEADER_SIZE, MIN_BLOCK_SIZE,
};
pub use chunk::{
    chunk_size_for, round_up, ChunkHeader, CHUNK_HEADER_SIZE, CHUNK_MAGIC, DEFAULT_CHUNK_SIZE,
    FIRST_DATA_OFFSET, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, PAGE_SIZE,
};
pub use container::{ContainerRecord, BODY_POINTER_OFFSET, CONTAINER_RECORD_SIZE};
pub use superblock::{
    select_superblock, Superblock, FORMAT_VERSION, SUPERBLOCK_MAGIC, SUPERBLOCK_SLOTS,
    SUPERBLOCK_SLOT_SIZE,
};

use crate::error::FormatError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Little-endian field reader that reports truncation as `FormatError::TooShort`
pub(crate) struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
    what: &'static str,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8], what: &'static str) -> Self {
        FieldReader {
            cursor: Cursor::new(bytes),
            what,
        }
    }

    fn short(&self) -> FormatError {
        FormatError::TooShort { what: self.what }
    }

    pub(crate) fn u8(&mut self) -> Result<u8, FormatError> {
        self.cursor.read_u8().map_err(|_| self.short())
    }

    pub(crate) fn u16(&mut self) -> Result<u16, FormatError> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.short())
    }

    pub(crate) fn u32(&mut self) -> Result<u32, FormatError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.short())
    }

    pub(crate) fn u64(&mut self) -> Result<u64, FormatError> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| self.short())
    }

    pub(crate) fn i64(&mut self) -> Result<i64, FormatError> {
        self.cursor
            .read_i64::<LittleEndian>()
            .map_err(|_| self.short())
    }

    pub(crate) fn f64(&mut self) -> Result<f64, FormatError> {
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| self.short())
    }

    pub(crate) fn bytes<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut buf = [0u8; N];
        self.cursor.read_exact(&mut buf).map_err(|_| self.short())?;
        Ok(buf)
    }

    pub(crate) fn vec(&mut self, len: usize) -> Result<Vec<u8>, FormatError> {
        if len > self.remaining() {
            return Err(self.short());
        }
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(|_| self.short())?;
        Ok(buf)
    }

    pub(crate) fn string(&mut self, len: usize) -> Result<String, FormatError> {
        let what = self.what;
        String::from_utf8(self.vec(len)?).map_err(|_| FormatError::InvalidUtf8 { what })
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), FormatError> {
        if n > self.remaining() {
            return Err(self.short());
        }
        self.cursor.set_position(self.cursor.position() + n as u64);
        Ok(())
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cursor
            .get_ref()
            .len()
            .saturating_sub(self.cursor.position() as usize)
    }
}

/// Verify a trailing CRC32 over `bytes[..crc_at]`
pub(crate) fn verify_crc(
    bytes: &[u8],
    crc_at: usize,
    what: &'static str,
) -> Result<(), FormatError> {
    if bytes.len() < crc_at + 4 {
        return Err(FormatError::TooShort { what });
    }
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&bytes[crc_at..crc_at + 4]);
    let expected = u32::from_le_bytes(stored);
    let computed = crc32fast::hash(&bytes[..crc_at]);
    if expected != computed {
        return Err(FormatError::ChecksumMismatch {
            what,
            expected,
            computed,
        });
    }
    Ok(())
}
