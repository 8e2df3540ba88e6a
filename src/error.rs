//! Error types for recmap
//!
//! One crate-wide taxonomy, built with `thiserror`. Declaration-time
//! problems (bad names, duplicate declarations, unresolved association
//! targets) are `Configuration` and are fatal at startup. Everything else
//! is a synchronous, per-call failure surfaced to the caller.
//!
//! Store-level failures propagate unchanged as `Store`; the mapping layer
//! never retries or reinterprets them.

use crate::id::IdError;
use thiserror::Error;

/// Result type alias for recmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the record mapping layer
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or duplicate schema declaration (fatal at startup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Field access for a name the model never declared
    #[error("unknown attribute {name:?} on model {model:?}")]
    UnknownAttribute {
        /// Model the access was made against
        model: String,
        /// Attribute or association name that was requested
        name: String,
    },

    /// Setter input that cannot be coerced to the declared kind
    #[error("type mismatch for {model}.{attribute}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Model owning the field
        model: String,
        /// Field name
        attribute: String,
        /// Kind the descriptor expects
        expected: String,
        /// Kind of the value that was supplied
        got: String,
    },

    /// Validation failure on `save` (no write occurred)
    #[error("record of model {model} is invalid: {}", .failures.join("; "))]
    RecordInvalid {
        /// Model being saved
        model: String,
        /// One message per failed field
        failures: Vec<String>,
    },

    /// Id read or destroy on a record that has never been saved
    /// (or has already been destroyed)
    #[error("record of model {model} is not persisted")]
    RecordNotPersisted {
        /// Model of the offending record
        model: String,
    },

    /// Expected blob absent from the store
    #[error("no {model} record with id {id:?}")]
    RecordNotFound {
        /// Model that was looked up
        model: String,
        /// Id that had no blob
        id: String,
    },

    /// Syntactically invalid record id (empty, or contains the delimiter)
    #[error("invalid record id: {0}")]
    InvalidId(#[from] IdError),

    /// Blob encode/decode failure
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Store-level failure, propagated unchanged
    #[error("store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = Error::Configuration("model name set twice".to_string());
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("set twice"));
    }

    #[test]
    fn test_error_display_type_mismatch() {
        let err = Error::TypeMismatch {
            model: "session".to_string(),
            attribute: "started_at".to_string(),
            expected: "datetime".to_string(),
            got: "string".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("session.started_at"));
        assert!(msg.contains("expected datetime"));
        assert!(msg.contains("got string"));
    }

    #[test]
    fn test_error_display_record_invalid_joins_failures() {
        let err = Error::RecordInvalid {
            model: "foo".to_string(),
            failures: vec!["a may not be null".to_string(), "b is dangling".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("a may not be null; b is dangling"));
    }

    #[test]
    fn test_error_display_record_not_found() {
        let err = Error::RecordNotFound {
            model: "process".to_string(),
            id: "abc".to_string(),
        };
        assert!(err.to_string().contains("no process record"));
    }

    #[test]
    fn test_error_from_id_error() {
        let id_err = IdError::ContainsDelimiter;
        let err: Error = id_err.into();
        assert!(matches!(err, Error::InvalidId(_)));
    }
}
