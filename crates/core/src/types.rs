//! Core addressing types for PongoDB
//!
//! This module defines:
//! - Key: Dict/Collection key or List index (`Int` or `Str`)
//! - Slot: Key or the auto-id sentinel accepted by `set`
//! - Location: Byte offset of a container header block in the data file
//! - ContainerKind: Dict, List or Collection
//! - ContainerHandle: Typed reference to a stored container

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key of a container member
///
/// Dicts and Collections accept both variants. Lists accept `Int` and any
/// `Str` that parses as an integer. Across variants `Int` orders before `Str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    /// Integer key or list index
    Int(i64),
    /// String key
    Str(String),
}

impl Key {
    /// Interpret the key as a list index
    ///
    /// Integer-like strings (optional sign, ASCII digits) are accepted; any
    /// other string returns `None`.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Str(s) => parse_index(s),
        }
    }

    /// String content if this is a `Str` key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    /// Get the variant name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Key::Int(_) => "Int",
            Key::Str(_) => "Str",
        }
    }
}

/// Parse an integer-like path segment
pub fn parse_index(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<u32> for Key {
    fn from(i: u32) -> Self {
        Key::Int(i64::from(i))
    }
}

/// Target of a `set`: a concrete key or a request for a generated id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Explicit key
    Key(Key),
    /// Generate a key with the configured id generator
    AutoId,
}

impl From<Key> for Slot {
    fn from(k: Key) -> Self {
        Slot::Key(k)
    }
}

impl From<&Key> for Slot {
    fn from(k: &Key) -> Self {
        Slot::Key(k.clone())
    }
}

impl From<&str> for Slot {
    fn from(s: &str) -> Self {
        Slot::Key(Key::from(s))
    }
}

impl From<String> for Slot {
    fn from(s: String) -> Self {
        Slot::Key(Key::Str(s))
    }
}

impl From<i64> for Slot {
    fn from(i: i64) -> Self {
        Slot::Key(Key::Int(i))
    }
}

impl From<i32> for Slot {
    fn from(i: i32) -> Self {
        Slot::Key(Key::from(i))
    }
}

/// Byte offset of a container header block inside the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location(pub u64);

impl Location {
    /// Raw file offset
    pub fn offset(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:#x}", self.0)
    }
}

/// Kind of a stored container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Insertion-ordered map with unique keys
    Dict,
    /// Zero-indexed sequence
    List,
    /// Named, explicitly created Dict-like container
    Collection,
}

impl ContainerKind {
    /// Get the kind name as a string
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Dict => "Dict",
            ContainerKind::List => "List",
            ContainerKind::Collection => "Collection",
        }
    }

    /// Dict and Collection share keyed semantics
    pub fn is_dict_like(self) -> bool {
        matches!(self, ContainerKind::Dict | ContainerKind::Collection)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed reference to a stored container
///
/// The handle carries the generation stamped into the container header when
/// it was created. A handle whose generation no longer matches the header
/// (the block was reclaimed and reused) is stale.
///
/// Equality and hashing use the location only: two handles naming the same
/// container compare equal regardless of how they were obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Header block offset
    pub location: Location,
    /// Generation stamp of the header
    pub generation: u64,
    /// Container kind
    pub kind: ContainerKind,
}

impl ContainerHandle {
    /// Build a handle
    pub fn new(location: Location, generation: u64, kind: ContainerKind) -> Self {
        ContainerHandle {
            location,
            generation,
            kind,
        }
    }
}

impl PartialEq for ContainerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for ContainerHandle {}

impl Hash for ContainerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.location)
    }
}
