//! JSON boundary
//!
//! Whole Dicts and Lists convert to and from JSON text. Collections only
//! convert member by member; whole-Collection conversion is
//! `NotImplemented`.
//!
//! Types JSON lacks are written as single-member objects and read back as
//! the original type:
//!
//! | Value | JSON |
//! |-------|------|
//! | `DateTime` | `{"$datetime": "2024-01-02T03:04:05.000006Z"}` |
//! | `Uuid` | `{"$uuid": "67e55044-10b1-426f-9247-bb680e5fe0c8"}` |
//!
//! Int keys are written as their decimal text. Non-finite floats and
//! integers outside `i64` are not representable.

use crate::database::{Database, Session};
use chrono::{DateTime, SecondsFormat, Utc};
use pongo_core::limits::check_depth;
use pongo_core::{ContainerHandle, ContainerKind, Key, Native, PongoError, PongoResult, Slot, Value};
use pongo_storage::Body;
use serde_json::{Map, Number, Value as Json};
use uuid::Uuid;

/// Object key marking an encoded DateTime
pub const DATETIME_KEY: &str = "$datetime";
/// Object key marking an encoded Uuid
pub const UUID_KEY: &str = "$uuid";

/// Convert parsed JSON into a native tree
pub fn json_to_native(json: Json) -> PongoResult<Native> {
    Ok(match json {
        Json::Null => Native::Null,
        Json::Bool(b) => Native::Bool(b),
        Json::Number(n) => number_to_native(&n)?,
        Json::String(s) => Native::String(s),
        Json::Array(items) => Native::List(
            items
                .into_iter()
                .map(json_to_native)
                .collect::<PongoResult<Vec<_>>>()?,
        ),
        Json::Object(map) => {
            if let Some(native) = extended_scalar(&map) {
                return Ok(native);
            }
            Native::Map(
                map.into_iter()
                    .map(|(k, v)| Ok((Key::Str(k), json_to_native(v)?)))
                    .collect::<PongoResult<Vec<_>>>()?,
            )
        }
    })
}

fn number_to_native(n: &Number) -> PongoResult<Native> {
    if let Some(i) = n.as_i64() {
        return Ok(Native::Int(i));
    }
    if n.is_u64() {
        return Err(PongoError::type_not_storable(format!("integer {} (exceeds i64)", n)));
    }
    n.as_f64()
        .map(Native::Float)
        .ok_or_else(|| PongoError::type_not_storable(format!("number {}", n)))
}

/// `{"$datetime": ..}` / `{"$uuid": ..}` with a parseable payload
fn extended_scalar(map: &Map<String, Json>) -> Option<Native> {
    if map.len() != 1 {
        return None;
    }
    let (key, value) = map.iter().next()?;
    let text = value.as_str()?;
    match key.as_str() {
        DATETIME_KEY => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Native::DateTime(dt.with_timezone(&Utc))),
        UUID_KEY => Uuid::parse_str(text).ok().map(Native::Uuid),
        _ => None,
    }
}

fn single(key: &str, text: String) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), Json::String(text));
    Json::Object(map)
}

fn key_text(key: Key) -> String {
    match key {
        Key::Str(s) => s,
        Key::Int(i) => i.to_string(),
    }
}

impl<'a> Session<'a> {
    /// Render a value; nested Collections are rendered only if `collections`
    fn value_to_json(&mut self, value: Value, collections: bool, depth: usize) -> PongoResult<Json> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Int(i) => Json::Number(i.into()),
            Value::Float(f) => Json::Number(
                Number::from_f64(f)
                    .ok_or_else(|| PongoError::type_not_storable(format!("Float {}", f)))?,
            ),
            Value::String(s) => Json::String(s),
            Value::DateTime(dt) => single(
                DATETIME_KEY,
                dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            Value::Uuid(u) => single(UUID_KEY, u.hyphenated().to_string()),
            Value::Ref(h) => self.container_to_json(h, collections, depth + 1)?,
        })
    }

    fn container_to_json(
        &mut self,
        h: ContainerHandle,
        collections: bool,
        depth: usize,
    ) -> PongoResult<Json> {
        check_depth(depth)?;
        if h.kind == ContainerKind::Collection && !collections {
            return Err(PongoError::not_implemented("JSON conversion of a whole Collection"));
        }
        let (_, body) = self.load(h)?;
        Ok(match body {
            Body::List(items) => Json::Array(
                items
                    .into_iter()
                    .map(|v| self.value_to_json(v, collections, depth))
                    .collect::<PongoResult<Vec<_>>>()?,
            ),
            Body::Map(pairs) => {
                let mut map = Map::with_capacity(pairs.len());
                for (k, v) in pairs {
                    map.insert(key_text(k), self.value_to_json(v, collections, depth)?);
                }
                Json::Object(map)
            }
        })
    }
}

fn parse(text: &str) -> PongoResult<Native> {
    json_to_native(serde_json::from_str(text)?)
}

impl Database {
    /// Serialize a whole Dict or List as JSON text
    pub fn to_json(&self, h: ContainerHandle) -> PongoResult<String> {
        let json = self.session()?.container_to_json(h, false, 0)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Replace the contents of a Dict (from an object) or List (from an
    /// array) with parsed JSON
    pub fn from_json(&self, h: ContainerHandle, text: &str) -> PongoResult<()> {
        if h.kind == ContainerKind::Collection {
            return Err(PongoError::not_implemented("JSON conversion of a whole Collection"));
        }
        let native = parse(text)?;
        self.session()?.replace_contents(h, native)
    }

    /// Serialize one member as JSON text
    pub fn to_json_key(&self, h: ContainerHandle, key: impl Into<Key>) -> PongoResult<String> {
        let mut session = self.session()?;
        let value = session.get(h, &key.into())?;
        let json = session.value_to_json(value, false, 0)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Assign one member from JSON text; returns the key used
    pub fn from_json_key(
        &self,
        h: ContainerHandle,
        key: impl Into<Slot>,
        text: &str,
    ) -> PongoResult<Key> {
        let native = parse(text)?;
        self.session()?.set(h, key.into(), native)
    }

    /// Pretty-printed dump of the whole root namespace, Collections included
    pub fn dump_json(&self) -> PongoResult<String> {
        let json = self.session()?.container_to_json(self.root(), true, 0)?;
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
