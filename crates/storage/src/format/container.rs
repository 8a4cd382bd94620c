//! Container header record
//!
//! The payload of a `Container` block. Its location is the container's
//! identity; the body it points at is replaced on every mutation by
//! rewriting the 8-byte body pointer in place.
//!
//! ```text
//! +-----------+---------+--------------+--------------+
//! | kind tag  | pad     | generation   | body pointer |
//! | 1 byte    | 7 bytes | 8 (u64 LE)   | 8 (u64 LE)   |
//! +-----------+---------+--------------+--------------+
//! ```

use super::FieldReader;
use crate::codec::tags;
use crate::error::FormatError;
use pongo_core::ContainerKind;

/// Payload size of a container record
pub const CONTAINER_RECORD_SIZE: usize = 24;

/// Offset of the body pointer within the payload
pub const BODY_POINTER_OFFSET: u64 = 16;

/// Decoded container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container kind
    pub kind: ContainerKind,
    /// Generation stamp handed out at creation
    pub generation: u64,
    /// Location of the current body block
    pub body: u64,
}

impl ContainerRecord {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; CONTAINER_RECORD_SIZE] {
        let mut bytes = [0u8; CONTAINER_RECORD_SIZE];
        bytes[0] = tags::header_tag(self.kind);
        bytes[8..16].copy_from_slice(&self.generation.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.body.to_le_bytes());
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        const WHAT: &str = "container header";
        let mut r = FieldReader::new(bytes, WHAT);
        let tag = r.u8()?;
        let kind =
            tags::kind_from_header_tag(tag).ok_or(FormatError::InvalidTag { what: WHAT, tag })?;
        r.skip(7)?;
        let generation = r.u64()?;
        let body = r.u64()?;
        Ok(ContainerRecord {
            kind,
            generation,
            body,
        })
    }
}
