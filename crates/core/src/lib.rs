//! Core types for PongoDB
//!
//! This crate defines the foundational types used throughout the workspace:
//! - Value: Stored leaf value or container reference
//! - Key / Slot: Member addressing, including the auto-id sentinel
//! - Location / ContainerKind / ContainerHandle: Container identity
//! - Native / Storable: Host value trees and the conversion capability
//! - PongoError: Error taxonomy
//! - Limits: Nesting and size limits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod native;
pub mod types;
pub mod value;

pub use error::{PongoError, PongoResult};
pub use limits::{MAX_ID_FIELD_BYTES, MAX_NESTING_DEPTH};
pub use native::{resolve_storable, Native, Storable};
pub use types::{parse_index, ContainerHandle, ContainerKind, Key, Location, Slot};
pub use value::Value;
