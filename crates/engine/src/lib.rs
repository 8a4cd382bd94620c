//! Database engine for PongoDB
//!
//! This crate turns the block store into a document database:
//! - Database: open/close, root namespace, `atoms`, cross-process lock
//! - Container operations: get/set/append/pop/... on Dict, List, Collection
//! - Path resolver: delimited multi-level get/set/delete
//! - Query engine: `search` over a container's children
//! - GC: mark from root and `atoms`, sweep unreachable blocks
//! - Pidcache: per-process handle cache, fork detection
//! - Meta registry: per-database settings (`chunksize`, `id`, `.sync`, ...)
//! - JSON boundary: whole-container and per-member conversion

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod containers;
mod convert;
pub mod database;
pub mod gc;
pub mod json;
pub mod path;
pub mod pidcache;
pub mod query;

pub use database::{
    Database, KeyGenerator, Meta, MetaKey, MetaValue, OpenOptions, UuidClass, UuidFactory,
};
pub use gc::GcStats;
pub use json::json_to_native;
pub use path::DEFAULT_SEPARATOR;
pub use pidcache::{PidCache, PidCacheEntry};
pub use query::{Operator, WILDCARD};

pub use pongo_core::{
    ContainerHandle, ContainerKind, Key, Location, Native, PongoError, PongoResult, Slot,
    Storable, Value,
};
pub use pongo_storage::{DurabilityMode, StoreStats};
