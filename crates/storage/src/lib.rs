//! Storage layer for PongoDB
//!
//! This crate implements the single-file persistent heap:
//! - ChunkStore: chunked data file with block allocation and growth
//! - FreeList: in-memory free extents, rebuilt from block headers at open
//! - Codec: tagged value encoding and container bodies
//! - Format: chunk headers, A/B superblock, block and container headers
//! - DurabilityMode: flush policy for copy-on-write commits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod codec;
pub mod durability;
pub mod error;
pub mod format;
pub mod store;

pub use allocator::FreeList;
pub use codec::{decode_body, encode_body, encode_value, Body};
pub use durability::DurabilityMode;
pub use error::FormatError;
pub use format::{BlockHeader, BlockKind, ContainerRecord, Superblock, DEFAULT_CHUNK_SIZE};
pub use store::{normalize_chunk_size, ChunkStore, StoreOptions, StoreStats};
