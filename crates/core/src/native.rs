//! Host-side value trees
//!
//! [`Native`] is what callers hand to `set` and what `to_native` returns: a
//! plain, owned tree of primitives, lists and maps. Nested lists and maps are
//! materialized as stored List/Dict containers on assignment.
//!
//! Host types that are neither primitives nor plain trees implement
//! [`Storable`] and travel as `Native::Opaque`. Conversion asks the value for
//! an explicit storable form first, then for mapping-style pairs, and fails
//! with `TypeNotStorable` otherwise.

use crate::error::{PongoError, PongoResult};
use crate::types::{ContainerHandle, Key};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Capability interface for host values without a built-in mapping
pub trait Storable: fmt::Debug + Send + Sync {
    /// Explicit conversion to a storable tree
    fn to_storable(&self) -> Option<Native> {
        None
    }

    /// Mapping-like view: the value's `(key, value)` pairs
    fn mapping_pairs(&self) -> Option<Vec<(Key, Native)>> {
        None
    }

    /// Name used in `TypeNotStorable` errors
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Owned host value tree
#[derive(Debug, Clone)]
pub enum Native {
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// Sequence, materialized as a List
    List(Vec<Native>),
    /// Ordered pairs, materialized as a Dict
    Map(Vec<(Key, Native)>),
    /// Existing container, stored by reference
    Handle(ContainerHandle),
    /// Host value resolved through [`Storable`]
    Opaque(Arc<dyn Storable>),
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Native::Null, Native::Null) => true,
            (Native::Bool(a), Native::Bool(b)) => a == b,
            (Native::Int(a), Native::Int(b)) => a == b,
            (Native::Float(a), Native::Float(b)) => a == b,
            (Native::String(a), Native::String(b)) => a == b,
            (Native::DateTime(a), Native::DateTime(b)) => a == b,
            (Native::Uuid(a), Native::Uuid(b)) => a == b,
            (Native::List(a), Native::List(b)) => a == b,
            // Map equality ignores pair order
            (Native::Map(a), Native::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.iter().any(|(bk, bv)| bk == k && bv == v))
            }
            (Native::Handle(a), Native::Handle(b)) => a == b,
            (Native::Opaque(a), Native::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Native {
    /// Build a map from pairs
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        V: Into<Native>,
        I: IntoIterator<Item = (K, V)>,
    {
        Native::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list from items
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Native>,
        I: IntoIterator<Item = V>,
    {
        Native::List(items.into_iter().map(Into::into).collect())
    }

    /// Wrap a host value
    pub fn opaque(value: impl Storable + 'static) -> Self {
        Native::Opaque(Arc::new(value))
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &str {
        match self {
            Native::Null => "Null",
            Native::Bool(_) => "Bool",
            Native::Int(_) => "Int",
            Native::Float(_) => "Float",
            Native::String(_) => "String",
            Native::DateTime(_) => "DateTime",
            Native::Uuid(_) => "Uuid",
            Native::List(_) => "List",
            Native::Map(_) => "Map",
            Native::Handle(_) => "Handle",
            Native::Opaque(o) => o.type_name(),
        }
    }

    /// Primitive or reference form, if this node needs no materialization
    pub fn as_value(&self) -> Option<Value> {
        Some(match self {
            Native::Null => Value::Null,
            Native::Bool(b) => Value::Bool(*b),
            Native::Int(i) => Value::Int(*i),
            Native::Float(f) => Value::Float(*f),
            Native::String(s) => Value::String(s.clone()),
            Native::DateTime(dt) => Value::datetime(*dt),
            Native::Uuid(u) => Value::Uuid(*u),
            Native::Handle(h) => Value::Ref(*h),
            Native::List(_) | Native::Map(_) | Native::Opaque(_) => return None,
        })
    }

    /// Look up a string key in a `Map` node
    pub fn map_get(&self, key: &str) -> Option<&Native> {
        match self {
            Native::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Get the items if this is a List node
    pub fn as_list(&self) -> Option<&[Native]> {
        match self {
            Native::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the pairs if this is a Map node, in member order. `==` on
    /// `Native` ignores map order; compare these slices when order matters
    pub fn as_map(&self) -> Option<&[(Key, Native)]> {
        match self {
            Native::Map(pairs) => Some(pairs),
            _ => None,
        }
    }
}

/// Resolve an opaque host value into a plain tree
///
/// `to_storable` wins over `mapping_pairs`. The result may itself contain
/// further `Opaque` nodes; callers resolve those as they descend.
pub fn resolve_storable(value: &dyn Storable) -> PongoResult<Native> {
    if let Some(native) = value.to_storable() {
        return Ok(native);
    }
    if let Some(pairs) = value.mapping_pairs() {
        return Ok(Native::Map(pairs));
    }
    Err(PongoError::type_not_storable(value.type_name()))
}

impl From<Value> for Native {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Native::Null,
            Value::Bool(b) => Native::Bool(b),
            Value::Int(i) => Native::Int(i),
            Value::Float(f) => Native::Float(f),
            Value::String(s) => Native::String(s),
            Value::DateTime(dt) => Native::DateTime(dt),
            Value::Uuid(u) => Native::Uuid(u),
            Value::Ref(h) => Native::Handle(h),
        }
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Native::Bool(b)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Native::Int(i)
    }
}

impl From<i32> for Native {
    fn from(i: i32) -> Self {
        Native::Int(i64::from(i))
    }
}

impl From<f64> for Native {
    fn from(f: f64) -> Self {
        Native::Float(f)
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Native::String(s.to_string())
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Native::String(s)
    }
}

impl From<DateTime<Utc>> for Native {
    fn from(dt: DateTime<Utc>) -> Self {
        Native::DateTime(dt)
    }
}

impl From<Uuid> for Native {
    fn from(u: Uuid) -> Self {
        Native::Uuid(u)
    }
}

impl From<ContainerHandle> for Native {
    fn from(h: ContainerHandle) -> Self {
        Native::Handle(h)
    }
}

impl<T: Into<Native>> From<Vec<T>> for Native {
    fn from(items: Vec<T>) -> Self {
        Native::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Native>> From<Option<T>> for Native {
    fn from(v: Option<T>) -> Self {
        v.map_or(Native::Null, Into::into)
    }
}
