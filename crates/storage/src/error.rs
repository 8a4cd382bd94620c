//! File-format parse errors
//!
//! Parsing of on-disk structures reports a [`FormatError`]. At the store
//! boundary these become `PongoError::Corruption`.

use pongo_core::PongoError;

/// Errors raised while decoding on-disk structures
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Input shorter than the structure requires
    #[error("{what} too short")]
    TooShort {
        /// Structure being decoded
        what: &'static str,
    },

    /// Invalid magic bytes
    #[error("invalid magic bytes in {what}")]
    InvalidMagic {
        /// Structure being decoded
        what: &'static str,
    },

    /// Checksum mismatch
    #[error("checksum mismatch in {what}: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Structure being decoded
        what: &'static str,
        /// CRC32 stored in the file
        expected: u32,
        /// CRC32 computed over the bytes read
        computed: u32,
    },

    /// Format version newer than this build understands
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// Unknown type tag
    #[error("unknown tag {tag:#04x} in {what}")]
    InvalidTag {
        /// Structure being decoded
        what: &'static str,
        /// Tag byte found
        tag: u8,
    },

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 in {what}")]
    InvalidUtf8 {
        /// Structure being decoded
        what: &'static str,
    },

    /// Timestamp outside the representable range
    #[error("timestamp {0} out of range")]
    InvalidTimestamp(i64),

    /// Block header is inconsistent with its surroundings
    #[error("invalid block at offset {offset:#x}: {reason}")]
    InvalidBlock {
        /// Block offset
        offset: u64,
        /// What is wrong with it
        reason: String,
    },
}

impl From<FormatError> for PongoError {
    fn from(e: FormatError) -> Self {
        PongoError::corruption(e.to_string())
    }
}
