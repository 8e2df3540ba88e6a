//! Attribute descriptors
//!
//! One `Attribute` per declared field: a kind plus a nullability flag.
//! The descriptor owns the three per-field behaviors:
//!
//! - `typecast`: coerce setter input to the declared kind, or fail.
//!   Null always passes through; an already-typed value passes through;
//!   a small set of coercions is accepted (numeric string → integer,
//!   epoch seconds → datetime). Anything else is a mismatch.
//! - `serialize`: map the typed value to its wire primitive. Datetimes
//!   become epoch-second integers.
//! - `validate`: fail closed on Null when the field is non-nullable.
//!
//! Foreign keys are not declared through this table; they ride along with
//! a belongs-to association (see `association::ForeignKey`).

use crate::value::{AttrValue, Value};
use thiserror::Error;

/// Kind of a declared attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// 64-bit signed integer
    Integer,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
    /// UTC timestamp, epoch seconds on the wire
    Datetime,
}

impl AttrKind {
    /// Get the kind name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrKind::Integer => "integer",
            AttrKind::Boolean => "boolean",
            AttrKind::String => "string",
            AttrKind::Datetime => "datetime",
        }
    }
}

/// Typecast failure: the input cannot be coerced to the declared kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {got}")]
pub struct CastError {
    /// Kind the descriptor expects
    pub expected: &'static str,
    /// Kind of the supplied value
    pub got: &'static str,
}

/// Descriptor for one declared attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Declared kind
    pub kind: AttrKind,
    /// Whether Null is a valid stored value
    pub nullable: bool,
}

impl Attribute {
    /// Create a new attribute descriptor
    pub fn new(kind: AttrKind, nullable: bool) -> Self {
        Attribute { kind, nullable }
    }

    /// Coerce setter input to the declared kind
    pub fn typecast(&self, value: AttrValue) -> Result<AttrValue, CastError> {
        if value.is_null() {
            return Ok(AttrValue::Null);
        }
        let got = value.type_name();
        let mismatch = CastError {
            expected: self.kind.type_name(),
            got,
        };
        match self.kind {
            AttrKind::Integer => match value {
                AttrValue::Int(n) => Ok(AttrValue::Int(n)),
                AttrValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(AttrValue::Int(f as i64))
                }
                AttrValue::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(AttrValue::Int)
                    .map_err(|_| mismatch),
                _ => Err(mismatch),
            },
            AttrKind::Boolean => match value {
                AttrValue::Bool(b) => Ok(AttrValue::Bool(b)),
                _ => Err(mismatch),
            },
            AttrKind::String => match value {
                AttrValue::Str(s) => Ok(AttrValue::Str(s)),
                _ => Err(mismatch),
            },
            AttrKind::Datetime => match value {
                AttrValue::Time(t) => Ok(AttrValue::Time(t)),
                AttrValue::Int(secs) => chrono::DateTime::from_timestamp(secs, 0)
                    .map(AttrValue::Time)
                    .ok_or(mismatch),
                AttrValue::Float(f) if f.is_finite() => {
                    let secs = f.div_euclid(1.0) as i64;
                    let nanos = (f.rem_euclid(1.0) * 1_000_000_000.0) as u32;
                    chrono::DateTime::from_timestamp(secs, nanos)
                        .map(AttrValue::Time)
                        .ok_or(mismatch)
                }
                _ => Err(mismatch),
            },
        }
    }

    /// Map a typed value to its wire primitive
    pub fn serialize(&self, value: &AttrValue) -> Value {
        match value {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(n) => Value::Int(*n),
            // Floats exist only as coercion input; a stored slot never
            // holds one (typecast converts or rejects)
            AttrValue::Float(f) => Value::Int(*f as i64),
            AttrValue::Str(s) => Value::Str(s.clone()),
            AttrValue::Time(t) => Value::Int(t.timestamp()),
        }
    }

    /// Check the stored value against nullability; fails closed on Null
    pub fn validate(&self, value: &AttrValue) -> bool {
        !(value.is_null() && !self.nullable)
    }
}
