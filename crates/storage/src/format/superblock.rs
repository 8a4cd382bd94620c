//! Superblock format
//!
//! Chunk 0 carries two superblock slots. Writes alternate between them with
//! an incremented sequence number; open picks the valid slot with the highest
//! sequence, so a torn superblock write falls back to the previous state.
//!
//! # Format
//!
//! ```text
//! +--------------------+
//! | Magic: PongoDB\0   | 8 bytes
//! | Format Version     | 4 bytes (u32 LE)
//! | Sequence           | 8 bytes (u64 LE)
//! | Root location      | 8 bytes (u64 LE, 0 = none)
//! | Atoms location     | 8 bytes (u64 LE, 0 = none)
//! | Chunk size         | 8 bytes (u64 LE)
//! | Next generation    | 8 bytes (u64 LE)
//! | Last GC time       | 8 bytes (i64 LE, unix micros, 0 = never)
//! | Last GC pid        | 4 bytes (u32 LE)
//! | Id field length    | 2 bytes (u16 LE)
//! | Id field           | variable (UTF-8)
//! | CRC32              | 4 bytes
//! +--------------------+
//! ```

use super::chunk::CHUNK_HEADER_SIZE;
use super::{verify_crc, FieldReader};
use crate::error::FormatError;
use pongo_core::MAX_ID_FIELD_BYTES;

/// Superblock magic bytes
pub const SUPERBLOCK_MAGIC: [u8; 8] = *b"PongoDB\0";

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

/// Bytes reserved per slot
pub const SUPERBLOCK_SLOT_SIZE: u64 = 1024;

/// File offsets of slot A and slot B
pub const SUPERBLOCK_SLOTS: [u64; 2] = [
    CHUNK_HEADER_SIZE,
    CHUNK_HEADER_SIZE + SUPERBLOCK_SLOT_SIZE,
];

const FIXED_LEN: usize = 8 + 4 + 8 * 6 + 4 + 2;

/// Persistent database-wide state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Format version
    pub format_version: u32,
    /// Monotonic write counter
    pub sequence: u64,
    /// Root namespace container (0 until created)
    pub root: u64,
    /// Atoms container (0 until created)
    pub atoms: u64,
    /// Chunk size used for future growth
    pub chunk_size: u64,
    /// Next container generation to hand out
    pub next_generation: u64,
    /// Last GC run, unix microseconds (0 = never)
    pub gc_time_micros: i64,
    /// Pid of the last GC run
    pub gc_pid: u32,
    /// Configured id field name
    pub id_field: String,
}

impl Superblock {
    /// Create a superblock for a fresh file
    pub fn new(chunk_size: u64) -> Self {
        Superblock {
            format_version: FORMAT_VERSION,
            sequence: 1,
            root: 0,
            atoms: 0,
            chunk_size,
            next_generation: 1,
            gc_time_micros: 0,
            gc_pid: 0,
            id_field: "_id".to_string(),
        }
    }

    /// Slot this superblock is written to
    pub fn slot(&self) -> usize {
        (self.sequence % 2) as usize
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FIXED_LEN + self.id_field.len() + 4);

        bytes.extend_from_slice(&SUPERBLOCK_MAGIC);
        bytes.extend_from_slice(&self.format_version.to_le_bytes());
        bytes.extend_from_slice(&self.sequence.to_le_bytes());
        bytes.extend_from_slice(&self.root.to_le_bytes());
        bytes.extend_from_slice(&self.atoms.to_le_bytes());
        bytes.extend_from_slice(&self.chunk_size.to_le_bytes());
        bytes.extend_from_slice(&self.next_generation.to_le_bytes());
        bytes.extend_from_slice(&self.gc_time_micros.to_le_bytes());
        bytes.extend_from_slice(&self.gc_pid.to_le_bytes());

        // Id field (length-prefixed, truncated to the limit on a char boundary)
        let mut end = self.id_field.len().min(MAX_ID_FIELD_BYTES);
        while !self.id_field.is_char_boundary(end) {
            end -= 1;
        }
        let id = &self.id_field.as_bytes()[..end];
        bytes.extend_from_slice(&(id.len() as u16).to_le_bytes());
        bytes.extend_from_slice(id);

        // CRC32 of all preceding bytes
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());

        bytes
    }

    /// Deserialize from a slot's bytes (trailing slack is ignored)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        const WHAT: &str = "superblock";
        if bytes.len() < FIXED_LEN + 4 {
            return Err(FormatError::TooShort { what: WHAT });
        }
        if bytes[0..8] != SUPERBLOCK_MAGIC {
            return Err(FormatError::InvalidMagic { what: WHAT });
        }

        let mut r = FieldReader::new(&bytes[8..], WHAT);
        let format_version = r.u32()?;
        if format_version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(format_version));
        }
        let sequence = r.u64()?;
        let root = r.u64()?;
        let atoms = r.u64()?;
        let chunk_size = r.u64()?;
        let next_generation = r.u64()?;
        let gc_time_micros = r.i64()?;
        let gc_pid = r.u32()?;
        let id_len = r.u16()? as usize;
        if id_len > MAX_ID_FIELD_BYTES {
            return Err(FormatError::TooShort { what: WHAT });
        }

        // The CRC sits right after the id field
        verify_crc(bytes, FIXED_LEN + id_len, WHAT)?;
        let id_field = r.string(id_len)?;

        Ok(Superblock {
            format_version,
            sequence,
            root,
            atoms,
            chunk_size,
            next_generation,
            gc_time_micros,
            gc_pid,
            id_field,
        })
    }
}

/// Choose the current superblock from the two slot parses
///
/// The valid slot with the highest sequence wins. Returns the error of slot
/// A when neither slot is valid.
pub fn select_superblock(
    a: Result<Superblock, FormatError>,
    b: Result<Superblock, FormatError>,
) -> Result<Superblock, FormatError> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok(if b.sequence > a.sequence { b } else { a }),
        (Ok(a), Err(_)) => Ok(a),
        (Err(_), Ok(b)) => Ok(b),
        (Err(e), Err(_)) => Err(e),
    }
}
