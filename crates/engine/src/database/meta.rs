//! Meta/config registry
//!
//! Per-open-database settings, read and written by name through
//! [`Database::meta`]. Setting a value returns the previous one.
//!
//! | Name | Value | Default | Persisted |
//! |------|-------|---------|-----------|
//! | `chunksize` | `Int` bytes | 16 MiB | yes (future growth only) |
//! | `id` | `Str` field name | `_id` | yes |
//! | `.sync` | `Int` level (`0` relaxed, `>0` strict) | strict | no |
//! | `.newkey` | `KeyGenerator` | UUID text | no |
//! | `.uuid_class` | `Str` (`hyphenated`, `simple`, `urn`) | `hyphenated` | no |
//! | `.uuid_constructor` | `UuidFactory` | UUID v4 | no |
//!
//! Generators run while the database is locked and must not call back into
//! the same database.

use super::Database;
use pongo_core::{Key, Native, PongoError, PongoResult, MAX_ID_FIELD_BYTES};
use pongo_storage::DurabilityMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Custom id generator; receives the value being inserted
pub type KeyGenerator = Arc<dyn Fn(&Native) -> Key + Send + Sync>;

/// Custom UUID source for the default id generator
pub type UuidFactory = Arc<dyn Fn() -> Uuid + Send + Sync>;

/// Text rendering of generated UUID keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UuidClass {
    /// `67e55044-10b1-426f-9247-bb680e5fe0c8`
    #[default]
    Hyphenated,
    /// `67e5504410b1426f9247bb680e5fe0c8`
    Simple,
    /// `urn:uuid:67e55044-10b1-426f-9247-bb680e5fe0c8`
    Urn,
}

impl UuidClass {
    /// Setting name of the class
    pub fn name(self) -> &'static str {
        match self {
            UuidClass::Hyphenated => "hyphenated",
            UuidClass::Simple => "simple",
            UuidClass::Urn => "urn",
        }
    }

    /// Render a UUID in this class
    pub fn render(self, uuid: Uuid) -> String {
        match self {
            UuidClass::Hyphenated => uuid.hyphenated().to_string(),
            UuidClass::Simple => uuid.simple().to_string(),
            UuidClass::Urn => uuid.urn().to_string(),
        }
    }
}

impl FromStr for UuidClass {
    type Err = PongoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hyphenated" => Ok(UuidClass::Hyphenated),
            "simple" => Ok(UuidClass::Simple),
            "urn" => Ok(UuidClass::Urn),
            other => Err(PongoError::invalid_meta_value(
                ".uuid_class",
                format!("unknown UUID class {:?}", other),
            )),
        }
    }
}

/// Value of a meta setting
#[derive(Clone)]
pub enum MetaValue {
    /// No custom value (built-in behaviour)
    Unset,
    /// Integer setting
    Int(i64),
    /// String setting
    Str(String),
    /// Id generator for `.newkey`
    KeyGenerator(KeyGenerator),
    /// UUID source for `.uuid_constructor`
    UuidFactory(UuidFactory),
}

impl MetaValue {
    /// Integer content
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Wrap a generator closure
    pub fn key_generator(f: impl Fn(&Native) -> Key + Send + Sync + 'static) -> Self {
        MetaValue::KeyGenerator(Arc::new(f))
    }

    /// Wrap a UUID factory closure
    pub fn uuid_factory(f: impl Fn() -> Uuid + Send + Sync + 'static) -> Self {
        MetaValue::UuidFactory(Arc::new(f))
    }
}

impl fmt::Debug for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Unset => f.write_str("Unset"),
            MetaValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            MetaValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            MetaValue::KeyGenerator(_) => f.write_str("KeyGenerator(..)"),
            MetaValue::UuidFactory(_) => f.write_str("UuidFactory(..)"),
        }
    }
}

impl PartialEq for MetaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetaValue::Unset, MetaValue::Unset) => true,
            (MetaValue::Int(a), MetaValue::Int(b)) => a == b,
            (MetaValue::Str(a), MetaValue::Str(b)) => a == b,
            (MetaValue::KeyGenerator(a), MetaValue::KeyGenerator(b)) => Arc::ptr_eq(a, b),
            (MetaValue::UuidFactory(a), MetaValue::UuidFactory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

/// Known setting names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey {
    /// `chunksize`
    ChunkSize,
    /// `id`
    IdField,
    /// `.sync`
    Sync,
    /// `.newkey`
    NewKey,
    /// `.uuid_class`
    UuidClass,
    /// `.uuid_constructor`
    UuidConstructor,
}

impl MetaKey {
    /// Setting name
    pub fn name(self) -> &'static str {
        match self {
            MetaKey::ChunkSize => "chunksize",
            MetaKey::IdField => "id",
            MetaKey::Sync => ".sync",
            MetaKey::NewKey => ".newkey",
            MetaKey::UuidClass => ".uuid_class",
            MetaKey::UuidConstructor => ".uuid_constructor",
        }
    }
}

impl FromStr for MetaKey {
    type Err = PongoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chunksize" => Ok(MetaKey::ChunkSize),
            "id" => Ok(MetaKey::IdField),
            ".sync" => Ok(MetaKey::Sync),
            ".newkey" => Ok(MetaKey::NewKey),
            ".uuid_class" => Ok(MetaKey::UuidClass),
            ".uuid_constructor" => Ok(MetaKey::UuidConstructor),
            other => Err(PongoError::UnknownMeta {
                name: other.to_string(),
            }),
        }
    }
}

/// Current settings of one open database
#[derive(Clone)]
pub struct Meta {
    pub(crate) chunk_size: u64,
    pub(crate) id_field: String,
    pub(crate) durability: DurabilityMode,
    pub(crate) newkey: Option<KeyGenerator>,
    pub(crate) uuid_class: UuidClass,
    pub(crate) uuid_constructor: Option<UuidFactory>,
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("chunk_size", &self.chunk_size)
            .field("id_field", &self.id_field)
            .field("durability", &self.durability)
            .field("newkey", &self.newkey.is_some())
            .field("uuid_class", &self.uuid_class)
            .field("uuid_constructor", &self.uuid_constructor.is_some())
            .finish()
    }
}

impl Meta {
    pub(crate) fn new(chunk_size: u64, id_field: String, durability: DurabilityMode) -> Self {
        Meta {
            chunk_size,
            id_field,
            durability,
            newkey: None,
            uuid_class: UuidClass::default(),
            uuid_constructor: None,
        }
    }

    /// Current value of a setting
    pub fn get(&self, key: MetaKey) -> MetaValue {
        match key {
            MetaKey::ChunkSize => MetaValue::Int(self.chunk_size as i64),
            MetaKey::IdField => MetaValue::Str(self.id_field.clone()),
            MetaKey::Sync => MetaValue::Int(self.durability.level()),
            MetaKey::NewKey => self
                .newkey
                .clone()
                .map_or(MetaValue::Unset, MetaValue::KeyGenerator),
            MetaKey::UuidClass => MetaValue::Str(self.uuid_class.name().to_string()),
            MetaKey::UuidConstructor => self
                .uuid_constructor
                .clone()
                .map_or(MetaValue::Unset, MetaValue::UuidFactory),
        }
    }

    /// Configured id field name
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub(crate) fn key_source(&self) -> KeySource {
        KeySource {
            newkey: self.newkey.clone(),
            uuid_class: self.uuid_class,
            uuid_constructor: self.uuid_constructor.clone(),
        }
    }
}

/// Detached copy of the id generation settings
///
/// Taken out of the meta lock so user generators run without holding it.
pub(crate) struct KeySource {
    newkey: Option<KeyGenerator>,
    uuid_class: UuidClass,
    uuid_constructor: Option<UuidFactory>,
}

impl KeySource {
    pub(crate) fn generate(&self, value: &Native) -> Key {
        if let Some(newkey) = &self.newkey {
            return newkey(value);
        }
        let uuid = match &self.uuid_constructor {
            Some(factory) => factory(),
            None => Uuid::new_v4(),
        };
        Key::Str(self.uuid_class.render(uuid))
    }
}

fn invalid(key: MetaKey, reason: &str) -> PongoError {
    PongoError::invalid_meta_value(key.name(), reason)
}

impl Database {
    /// Get or set a meta setting by name
    ///
    /// With `Some(value)` the setting is changed; either way the value in
    /// effect before the call is returned. Unknown names fail with
    /// `UnknownMeta`.
    pub fn meta(&self, name: &str, value: Option<MetaValue>) -> PongoResult<MetaValue> {
        let key: MetaKey = name.parse()?;
        let mut session = self.session()?;
        let mut meta = self.meta.write();
        let previous = meta.get(key);

        let Some(value) = value else {
            return Ok(previous);
        };

        match key {
            MetaKey::ChunkSize => {
                let size = value
                    .as_int()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(key, "expected a positive integer"))?;
                meta.chunk_size = session.store.set_chunk_size(size as u64)?;
            }
            MetaKey::IdField => {
                let field = value
                    .as_str()
                    .filter(|s| !s.is_empty() && s.len() <= MAX_ID_FIELD_BYTES)
                    .ok_or_else(|| invalid(key, "expected a non-empty string of at most 255 bytes"))?
                    .to_string();
                session
                    .store
                    .update_superblock(|sb| sb.id_field = field.clone())?;
                meta.id_field = field;
            }
            MetaKey::Sync => {
                let level = value
                    .as_int()
                    .ok_or_else(|| invalid(key, "expected an integer level"))?;
                let mode = DurabilityMode::from_level(level);
                session.store.set_durability(mode);
                meta.durability = mode;
                debug!(
                    target: "pongo::db",
                    level,
                    durability = mode.description(),
                    "Changed commit durability"
                );
            }
            MetaKey::NewKey => {
                meta.newkey = match value {
                    MetaValue::KeyGenerator(g) => Some(g),
                    MetaValue::Unset => None,
                    _ => return Err(invalid(key, "expected a key generator")),
                };
            }
            MetaKey::UuidClass => {
                let class = value
                    .as_str()
                    .ok_or_else(|| invalid(key, "expected a class name"))?;
                meta.uuid_class = class.parse()?;
            }
            MetaKey::UuidConstructor => {
                meta.uuid_constructor = match value {
                    MetaValue::UuidFactory(f) => Some(f),
                    MetaValue::Unset => None,
                    _ => return Err(invalid(key, "expected a UUID factory")),
                };
            }
        }

        debug!(target: "pongo::db", setting = key.name(), "Updated meta setting");
        Ok(previous)
    }
}
