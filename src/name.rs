//! Validated identifier types
//!
//! Three string newtypes cover every name the schema layer accepts:
//!
//! - `ModelName`: the key-namespace prefix of a model. Lowercase
//!   snake-case, e.g. `"session"`, `"audit_event"`.
//! - `AttrName`: an attribute or association name. Same snake-case rules.
//! - `TargetName`: a capitalized, `::`-separated type path used to name an
//!   association target, e.g. `"Session"` or `"Billing::Invoice"`.
//!
//! ## Validation
//!
//! Snake-case names must match `[a-z][a-z0-9]*(_[a-z][a-z0-9]*)*`: every
//! underscore-separated segment starts with a letter. Target paths must
//! match `[A-Z][A-Za-z0-9]*(::[A-Z][A-Za-z0-9]*)*`.
//!
//! Validation is a plain character walk; no pattern engine involved.

use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Error when validating a model, attribute, or target name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Name is empty
    #[error("name cannot be empty")]
    Empty,

    /// A segment is empty (leading, trailing, or doubled separator)
    #[error("name has an empty segment at position {position}")]
    EmptySegment {
        /// Byte offset of the offending separator
        position: usize,
    },

    /// A segment starts with a character the pattern forbids
    #[error("invalid segment start '{char}' at position {position}")]
    InvalidStart {
        /// The offending character
        char: char,
        /// Byte offset of the character
        position: usize,
    },

    /// Name contains a character outside the allowed set
    #[error("invalid character '{char}' at position {position}")]
    InvalidChar {
        /// The offending character
        char: char,
        /// Byte offset of the character
        position: usize,
    },
}

/// Validate a snake-case name: `[a-z][a-z0-9]*(_[a-z][a-z0-9]*)*`
pub fn validate_snake(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let mut segment_start = true;
    for (position, char) in name.char_indices() {
        if segment_start {
            if char == '_' {
                return Err(NameError::EmptySegment { position });
            }
            if !char.is_ascii_lowercase() {
                return Err(NameError::InvalidStart { char, position });
            }
            segment_start = false;
        } else if char == '_' {
            segment_start = true;
        } else if !char.is_ascii_lowercase() && !char.is_ascii_digit() {
            return Err(NameError::InvalidChar { char, position });
        }
    }
    if segment_start {
        // Trailing underscore leaves an open segment
        return Err(NameError::EmptySegment {
            position: name.len() - 1,
        });
    }
    Ok(())
}

/// Validate a target type path: `[A-Z][A-Za-z0-9]*(::[A-Z][A-Za-z0-9]*)*`
pub fn validate_target(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let mut position = 0;
    for segment in name.split("::") {
        if segment.is_empty() {
            return Err(NameError::EmptySegment { position });
        }
        for (offset, char) in segment.char_indices() {
            if offset == 0 {
                if !char.is_ascii_uppercase() {
                    return Err(NameError::InvalidStart {
                        char,
                        position: position + offset,
                    });
                }
            } else if !char.is_ascii_alphanumeric() {
                return Err(NameError::InvalidChar {
                    char,
                    position: position + offset,
                });
            }
        }
        position += segment.len() + 2;
    }
    Ok(())
}

/// Snake-case model name, the key-namespace prefix for a record type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelName(String);

impl ModelName {
    /// Create a new ModelName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_snake(&name)?;
        Ok(ModelName(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Snake-case attribute or association name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrName(String);

impl AttrName {
    /// Create a new AttrName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_snake(&name)?;
        Ok(AttrName(name))
    }

    /// Wrap a name already known to satisfy the snake-case pattern
    pub(crate) fn new_unchecked(name: impl Into<String>) -> Self {
        AttrName(name.into())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for AttrName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Capitalized `::`-separated type path naming an association target
///
/// Targets are resolved to models by snake-casing the final path segment:
/// `"Billing::Invoice"` resolves to the model named `"invoice"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetName(String);

impl TargetName {
    /// Create a new TargetName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_target(&name)?;
        Ok(TargetName(name))
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Snake-cased final segment, the key into the model registry
    pub fn model_key(&self) -> String {
        let last = self.0.rsplit("::").next().unwrap_or(&self.0);
        let mut out = String::with_capacity(last.len() + 4);
        for (offset, char) in last.char_indices() {
            if char.is_ascii_uppercase() {
                if offset > 0 {
                    out.push('_');
                }
                out.push(char.to_ascii_lowercase());
            } else {
                out.push(char);
            }
        }
        out
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
