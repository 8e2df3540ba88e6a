//! Value types
//!
//! Two enums, one per side of the typecast boundary:
//!
//! - `Value` is the wire primitive: what the blob codec reads and writes.
//!   Exactly four variants (Null, Bool, Int, Str) — datetimes travel as
//!   epoch-second integers, foreign keys as strings.
//! - `AttrValue` is the typed in-memory value held by a record slot. It
//!   adds `Time` (a real `DateTime<Utc>`) and `Float`, which exists only
//!   as a coercion input: typecasting converts or rejects it, so a stored
//!   slot never holds one.
//!
//! Different variants are never equal; there are no implicit coercions at
//! this layer. Coercion is the attribute descriptor's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire primitive for serialized record fields
///
/// The codec round-trips these exactly: integers, strings, booleans, and
/// null survive encode/decode unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// UTF-8 string
    Str(String),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Typed in-memory value held by a record's attribute slot
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float; accepted as coercion input, never stored
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// UTC timestamp
    Time(DateTime<Utc>),
}

impl AttrValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "boolean",
            AttrValue::Int(_) => "integer",
            AttrValue::Float(_) => "float",
            AttrValue::Str(_) => "string",
            AttrValue::Time(_) => "datetime",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Get the integer content, if this is an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string content, if this is a Str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the timestamp content, if this is a Time
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            AttrValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Int(n) => AttrValue::Int(n),
            Value::Str(s) => AttrValue::Str(s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttrValue::Time(value)
    }
}

impl<T> From<Option<T>> for AttrValue
where
    T: Into<AttrValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => AttrValue::Null,
        }
    }
}
