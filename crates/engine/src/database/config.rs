//! Open-time configuration
//!
//! `OpenOptions` covers what must be known before the data file is touched.
//! Everything tunable afterwards lives in the meta registry
//! (see [`crate::database::meta`]).

use pongo_storage::{DurabilityMode, StoreOptions, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Suffix of the sidecar lock file placed next to the data file.
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Options for [`Database::open_with`](crate::Database::open_with).
///
/// # Example
///
/// ```text
/// use pongo_engine::{Database, OpenOptions, DurabilityMode};
///
/// let options = OpenOptions {
///     durability: DurabilityMode::Relaxed,
///     ..Default::default()
/// };
/// let db = Database::open_with("/tmp/data.pongo", options)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenOptions {
    /// Chunk size for a new file. An existing file keeps its persisted
    /// `chunksize` setting.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Initial `.sync` mode.
    #[serde(default)]
    pub durability: DurabilityMode,
    /// Refuse to grow the file beyond this many bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    /// Take an exclusive advisory lock on `<file>.lock`.
    #[serde(default = "default_lock")]
    pub lock: bool,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_lock() -> bool {
    true
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            chunk_size: default_chunk_size(),
            durability: DurabilityMode::default(),
            max_file_size: None,
            lock: default_lock(),
        }
    }
}

impl OpenOptions {
    pub(crate) fn store_options(&self) -> StoreOptions {
        StoreOptions {
            chunk_size: self.chunk_size,
            durability: self.durability,
            max_file_size: self.max_file_size,
        }
    }
}
