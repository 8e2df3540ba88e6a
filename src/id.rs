//! Record identifiers
//!
//! Ids are opaque strings assigned once, at a record's first successful
//! save. They participate in key construction (`<model>:id:<id>`), so the
//! key delimiter `:` is forbidden inside them, as is the empty string.
//!
//! Generated ids are v4 UUIDs: 128-bit random, hyphenated, delimiter-free
//! by construction, collision probability negligible.

use crate::key::KEY_DELIMITER;
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error when validating a record id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Id is empty
    #[error("record id cannot be empty")]
    Empty,

    /// Id contains the key delimiter `:`
    #[error("record id cannot contain '{KEY_DELIMITER}'")]
    ContainsDelimiter,
}

/// Opaque unique record identifier
///
/// Never empty, never contains `:`. Assigned on first save and immutable
/// for the life of the stored entry; never reused after destroy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new RecordId, validating the input
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if id.contains(KEY_DELIMITER) {
            return Err(IdError::ContainsDelimiter);
        }
        Ok(RecordId(id))
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_plain_strings() {
        assert!(RecordId::new("abc-123").is_ok());
        assert!(RecordId::new("x").is_ok());
    }

    #[test]
    fn test_record_id_rejects_empty() {
        assert_eq!(RecordId::new(""), Err(IdError::Empty));
    }

    #[test]
    fn test_record_id_rejects_delimiter() {
        assert_eq!(RecordId::new("a:b"), Err(IdError::ContainsDelimiter));
        assert_eq!(RecordId::new(":"), Err(IdError::ContainsDelimiter));
    }

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(RecordId::new(a.as_str()).is_ok());
        assert!(!a.as_str().contains(':'));
    }
}
