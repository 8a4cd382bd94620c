//! Value types for PongoDB
//!
//! This module defines:
//! - Value: Stored leaf value, or a reference to a container
//!
//! ### Type Rules
//!
//! - `Int(1) != Float(1.0)`: different types are never equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - `DateTime` is UTC with microsecond precision; finer input is truncated
//! - `Ref` equality follows handle equality (location only)
//!
//! Ordering is partial: [`Value::compare`] orders values of one primitive
//! type naturally and lets `Int`/`Float` compare numerically. Everything else
//! is incomparable.

use crate::types::ContainerHandle;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Stored value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// UTC timestamp, microsecond precision
    DateTime(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// Reference to a container
    Ref(ContainerHandle),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            // Same container: a reused location carries a new generation
            (Value::Ref(a), Value::Ref(b)) => a == b && a.generation == b.generation,
            _ => false,
        }
    }
}

impl Value {
    /// Build a `DateTime` value, truncating to microseconds
    pub fn datetime(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt.trunc_subsecs(6))
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::DateTime(_) => "DateTime",
            Value::Uuid(_) => "Uuid",
            Value::Ref(_) => "Ref",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a container reference
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the timestamp if this is a DateTime value
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the UUID if this is a Uuid value
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Get the handle if this is a Ref value
    pub fn as_handle(&self) -> Option<ContainerHandle> {
        match self {
            Value::Ref(h) => Some(*h),
            _ => None,
        }
    }

    /// Partial order used by search
    ///
    /// Same-type primitives order naturally (`false < true`, strings
    /// bytewise). `Int` and `Float` compare numerically. Refs, NaN and
    /// mixed types return `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => compare_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn compare_int_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    // Lossy above 2^53.
    (i as f64).partial_cmp(&f)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::datetime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<ContainerHandle> for Value {
    fn from(h: ContainerHandle) -> Self {
        Value::Ref(h)
    }
}
