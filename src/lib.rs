//! PongoDB - embeddable, persistent document store
//!
//! PongoDB keeps nested Dicts, Lists and named Collections of JSON-like
//! values in a single chunked file. Containers are addressed by handles,
//! members by key, index or delimited path.
//!
//! # Quick Start
//!
//! ```ignore
//! use pongodb::{Database, Native, Value};
//!
//! let db = Database::open("/tmp/people.pongo")?;
//! let people = db.create_collection("people")?;
//!
//! // Nested maps and sequences become Dicts and Lists
//! db.set(people, "ada", Native::map([("born", Native::Int(1815))]))?;
//! assert_eq!(db.get_path(people, "ada.born", Value::Null)?, Value::Int(1815));
//!
//! // Query children by field
//! let hits = db.search(people, "born", "<", 1900)?;
//! ```
//!
//! # Architecture
//!
//! - `pongo-core`: values, keys, handles, errors
//! - `pongo-storage`: chunked file, block allocator, codec
//! - `pongo-engine`: the [`Database`] and every container, path, query and
//!   GC operation
//!
//! Storage internals are available under [`storage`] for diagnostics.

pub use pongo_engine::*;

/// Block store and file format
pub mod storage {
    pub use pongo_storage::*;
}
