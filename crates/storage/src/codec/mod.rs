//! Value and body codec.
//!
//! Every stored value carries a one-byte type tag followed by its payload.
//! Container bodies are `[body tag][count: u32][entries]`, where a List
//! entry is one value and a Dict/Collection entry is a key (encoded as an
//! Int or String value) followed by a value.
//!
//! Bodies are decoded eagerly into a [`Body`]; trailing bytes after the last
//! entry (block padding) are ignored.

pub mod tags;

use crate::error::FormatError;
use crate::format::FieldReader;
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Utc};
use pongo_core::{ContainerHandle, ContainerKind, Key, Location, PongoError, PongoResult, Value};
use uuid::Uuid;

/// Decoded container body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// List members in order
    List(Vec<Value>),
    /// Dict/Collection members in insertion order
    Map(Vec<(Key, Value)>),
}

impl Body {
    /// Empty body for a container kind
    pub fn empty(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::List => Body::List(Vec::new()),
            ContainerKind::Dict | ContainerKind::Collection => Body::Map(Vec::new()),
        }
    }

    /// Number of members
    pub fn len(&self) -> usize {
        match self {
            Body::List(items) => items.len(),
            Body::Map(pairs) => pairs.len(),
        }
    }

    /// True if the body has no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over member values
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Body::List(items) => Box::new(items.iter()),
            Body::Map(pairs) => Box::new(pairs.iter().map(|(_, v)| v)),
        }
    }
}

/// Encode a body for a container of `kind`
pub fn encode_body(kind: ContainerKind, body: &Body) -> PongoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(64);
    out.push(tags::body_tag(kind));
    out.write_u32::<LittleEndian>(count_u32(body.len())?)?;
    match (kind, body) {
        (ContainerKind::List, Body::List(items)) => {
            for v in items {
                encode_value(v, &mut out)?;
            }
        }
        (ContainerKind::Dict | ContainerKind::Collection, Body::Map(pairs)) => {
            for (k, v) in pairs {
                encode_key(k, &mut out)?;
                encode_value(v, &mut out)?;
            }
        }
        (kind, Body::List(_)) => return Err(PongoError::wrong_kind(kind, "List body")),
        (kind, Body::Map(_)) => return Err(PongoError::wrong_kind(kind, "Map body")),
    }
    Ok(out)
}

/// Decode a body, returning the kind recorded in its tag
pub fn decode_body(bytes: &[u8]) -> Result<(ContainerKind, Body), FormatError> {
    const WHAT: &str = "container body";
    let mut r = FieldReader::new(bytes, WHAT);
    let tag = r.u8()?;
    let kind =
        tags::kind_from_body_tag(tag).ok_or(FormatError::InvalidTag { what: WHAT, tag })?;
    let count = r.u32()? as usize;
    // Every entry takes at least one byte
    if count > r.remaining() {
        return Err(FormatError::TooShort { what: WHAT });
    }
    let body = match kind {
        ContainerKind::List => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_value(&mut r)?);
            }
            Body::List(items)
        }
        ContainerKind::Dict | ContainerKind::Collection => {
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let k = decode_key(&mut r)?;
                let v = decode_value(&mut r)?;
                pairs.push((k, v));
            }
            Body::Map(pairs)
        }
    };
    Ok((kind, body))
}

/// Append the tagged encoding of `value` to `out`
pub fn encode_value(value: &Value, out: &mut Vec<u8>) -> PongoResult<()> {
    match value {
        Value::Null => out.push(tags::NULL),
        Value::Bool(b) => {
            out.push(tags::BOOL);
            out.push(u8::from(*b));
        }
        Value::Int(i) => {
            out.push(tags::INT);
            out.write_i64::<LittleEndian>(*i)?;
        }
        Value::Float(f) => {
            out.push(tags::FLOAT);
            out.write_f64::<LittleEndian>(*f)?;
        }
        Value::String(s) => encode_str(s, out)?,
        Value::DateTime(dt) => {
            out.push(tags::DATETIME);
            out.write_i64::<LittleEndian>(dt.timestamp_micros())?;
        }
        Value::Uuid(u) => {
            out.push(tags::UUID);
            out.extend_from_slice(u.as_bytes());
        }
        Value::Ref(h) => {
            out.push(tags::REF);
            out.write_u64::<LittleEndian>(h.location.0)?;
            out.write_u64::<LittleEndian>(h.generation)?;
            out.push(tags::header_tag(h.kind));
        }
    }
    Ok(())
}

fn encode_str(s: &str, out: &mut Vec<u8>) -> PongoResult<()> {
    pongo_core::limits::check_string(s)?;
    out.push(tags::STRING);
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn encode_key(key: &Key, out: &mut Vec<u8>) -> PongoResult<()> {
    match key {
        Key::Int(i) => encode_value(&Value::Int(*i), out),
        Key::Str(s) => encode_str(s, out),
    }
}

fn count_u32(n: usize) -> PongoResult<u32> {
    u32::try_from(n).map_err(|_| {
        PongoError::resource_exhausted(format!("container with {} members is too large", n))
    })
}

/// Decode one tagged value
pub(crate) fn decode_value(r: &mut FieldReader<'_>) -> Result<Value, FormatError> {
    let tag = r.u8()?;
    Ok(match tag {
        tags::NULL => Value::Null,
        tags::BOOL => Value::Bool(r.u8()? != 0),
        tags::INT => Value::Int(r.i64()?),
        tags::FLOAT => Value::Float(r.f64()?),
        tags::STRING => {
            let len = r.u32()? as usize;
            Value::String(r.string(len)?)
        }
        tags::DATETIME => {
            let micros = r.i64()?;
            let dt: DateTime<Utc> = DateTime::from_timestamp_micros(micros)
                .ok_or(FormatError::InvalidTimestamp(micros))?;
            Value::DateTime(dt)
        }
        tags::UUID => Value::Uuid(Uuid::from_bytes(r.bytes::<16>()?)),
        tags::REF => {
            let location = Location(r.u64()?);
            let generation = r.u64()?;
            let kind_tag = r.u8()?;
            let kind = tags::kind_from_header_tag(kind_tag).ok_or(FormatError::InvalidTag {
                what: "reference",
                tag: kind_tag,
            })?;
            Value::Ref(ContainerHandle::new(location, generation, kind))
        }
        other => {
            return Err(FormatError::InvalidTag {
                what: "value",
                tag: other,
            })
        }
    })
}

fn decode_key(r: &mut FieldReader<'_>) -> Result<Key, FormatError> {
    match r.u8()? {
        tags::INT => Ok(Key::Int(r.i64()?)),
        tags::STRING => {
            let len = r.u32()? as usize;
            Ok(Key::Str(r.string(len)?))
        }
        tag => Err(FormatError::InvalidTag { what: "key", tag }),
    }
}
