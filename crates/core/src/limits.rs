//! Size limits for stored values
//!
//! Violations surface as ordinary `PongoError`s at the point a value is
//! converted or encoded, before anything is written.

use crate::error::{PongoError, PongoResult};

/// Maximum nesting depth of a native tree on assignment
///
/// Also bounds cycles through `Storable` values that return themselves.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Maximum length of the configured `id` field name in bytes
pub const MAX_ID_FIELD_BYTES: usize = 255;

/// Maximum string length in bytes (length prefix is a `u32`)
pub const MAX_STRING_BYTES: usize = u32::MAX as usize;

/// Check a nesting depth against [`MAX_NESTING_DEPTH`]
pub fn check_depth(depth: usize) -> PongoResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(PongoError::NestingTooDeep {
            depth,
            max: MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}

/// Check a string length against [`MAX_STRING_BYTES`]
pub fn check_string(s: &str) -> PongoResult<()> {
    if s.len() > MAX_STRING_BYTES {
        return Err(PongoError::resource_exhausted(format!(
            "string of {} bytes exceeds maximum {}",
            s.len(),
            MAX_STRING_BYTES
        )));
    }
    Ok(())
}
