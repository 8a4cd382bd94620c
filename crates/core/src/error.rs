//! Error types for PongoDB
//!
//! Every fallible operation in the workspace returns [`PongoResult`]. The
//! variants mirror the failure kinds callers are expected to branch on
//! (missing keys, bad indices, stale handles) plus the ambient I/O and
//! corruption failures of the storage layer.
//!
//! We use `thiserror` for the `Display` and `Error` implementations.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for PongoDB operations
pub type PongoResult<T> = std::result::Result<T, PongoError>;

/// Error type for every PongoDB operation
#[derive(Debug, Error)]
pub enum PongoError {
    /// Dict or Collection lookup of an absent key
    #[error("key not found: {key}")]
    KeyNotFound {
        /// Rendered key
        key: String,
    },

    /// List index outside `[-len, len - 1]`
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index, before negative resolution
        index: i64,
        /// Current list length
        len: usize,
    },

    /// `remove_value` did not find an equal element
    #[error("value not found in list")]
    ValueNotFound,

    /// Search operator string is not one of `== != < <= > >=`
    #[error("invalid operator: {op:?}")]
    InvalidOperator {
        /// Operator as given
        op: String,
    },

    /// Search field is not a string
    #[error("search field must be a string, got {found}")]
    InvalidFieldType {
        /// Type name of the supplied field
        found: String,
    },

    /// Host value has no storable representation
    #[error("value of type {type_name} cannot be stored")]
    TypeNotStorable {
        /// Name of the offending type
        type_name: String,
    },

    /// `set_path` with `fail_if_exists` hit an existing key
    #[error("key already exists: {key}")]
    KeyExists {
        /// Rendered key
        key: String,
    },

    /// Handle refers to a container that was reclaimed or never existed
    #[error("stale container handle at location {location:#x}")]
    StaleHandle {
        /// File offset the handle points at
        location: u64,
    },

    /// The store could not grow
    #[error("resource exhausted: {reason}")]
    ResourceExhausted {
        /// What ran out
        reason: String,
    },

    /// Operation is not supported for this container kind
    #[error("not implemented: {what}")]
    NotImplemented {
        /// Description of the unsupported operation
        what: String,
    },

    /// A path could not be traversed
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Path as given
        path: String,
        /// Why traversal failed
        reason: String,
    },

    /// A key is unusable for the target container
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Container is not of the kind the operation requires
    #[error("wrong container kind: expected {expected}, found {found}")]
    WrongKind {
        /// Kind(s) the operation accepts
        expected: String,
        /// Kind actually found
        found: String,
    },

    /// Meta setting name is not recognized
    #[error("unknown meta setting: {name:?}")]
    UnknownMeta {
        /// Setting name as given
        name: String,
    },

    /// Meta setting value has the wrong shape
    #[error("invalid value for meta setting {name:?}: {reason}")]
    InvalidMetaValue {
        /// Setting name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Native tree is deeper than the nesting limit (or cyclic)
    #[error("nesting depth {depth} exceeds maximum {max}")]
    NestingTooDeep {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// On-disk data failed validation
    #[error("data corruption: {message}")]
    Corruption {
        /// Details
        message: String,
    },

    /// Another process holds the database lock
    #[error("database is locked: {path}")]
    Locked {
        /// Path of the lock file
        path: String,
    },

    /// The database handle was closed
    #[error("database is closed")]
    Closed,

    /// I/O error from the backing file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse or render error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PongoError {
    /// Create a `KeyNotFound` error
    pub fn key_not_found(key: impl fmt::Display) -> Self {
        PongoError::KeyNotFound {
            key: key.to_string(),
        }
    }

    /// Create an `IndexOutOfRange` error
    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        PongoError::IndexOutOfRange { index, len }
    }

    /// Create a `KeyExists` error
    pub fn key_exists(key: impl fmt::Display) -> Self {
        PongoError::KeyExists {
            key: key.to_string(),
        }
    }

    /// Create an `InvalidPath` error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PongoError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a `WrongKind` error
    pub fn wrong_kind(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        PongoError::WrongKind {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create a `Corruption` error
    pub fn corruption(message: impl Into<String>) -> Self {
        PongoError::Corruption {
            message: message.into(),
        }
    }

    /// Create a `ResourceExhausted` error
    pub fn resource_exhausted(reason: impl Into<String>) -> Self {
        PongoError::ResourceExhausted {
            reason: reason.into(),
        }
    }

    /// Create a `NotImplemented` error
    pub fn not_implemented(what: impl Into<String>) -> Self {
        PongoError::NotImplemented { what: what.into() }
    }

    /// Create a `TypeNotStorable` error
    pub fn type_not_storable(type_name: impl Into<String>) -> Self {
        PongoError::TypeNotStorable {
            type_name: type_name.into(),
        }
    }

    /// Create an `InvalidMetaValue` error
    pub fn invalid_meta_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PongoError::InvalidMetaValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the lookup-miss family (`KeyNotFound`, `IndexOutOfRange`,
    /// `ValueNotFound`)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PongoError::KeyNotFound { .. }
                | PongoError::IndexOutOfRange { .. }
                | PongoError::ValueNotFound
        )
    }

    /// True if the handle used no longer names a live container
    pub fn is_stale(&self) -> bool {
        matches!(self, PongoError::StaleHandle { .. })
    }

    /// True for failures caused by caller input rather than storage state
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PongoError::InvalidOperator { .. }
                | PongoError::InvalidFieldType { .. }
                | PongoError::TypeNotStorable { .. }
                | PongoError::InvalidPath { .. }
                | PongoError::InvalidKey { .. }
                | PongoError::WrongKind { .. }
                | PongoError::UnknownMeta { .. }
                | PongoError::InvalidMetaValue { .. }
                | PongoError::NestingTooDeep { .. }
        )
    }

    /// True for failures of the backing file
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PongoError::Io(_)
                | PongoError::Corruption { .. }
                | PongoError::ResourceExhausted { .. }
        )
    }
}
