//! Key layout
//!
//! The colon-delimited key scheme is the on-the-wire contract with the
//! store and must be reproduced exactly by any compatible implementation:
//!
//! - `<model>:id:<id>` — the record blob (encoded field map)
//! - `<model>:all` — set of all live ids for the model
//! - `<model>:id:<id>:<has_many>` — reverse index: ids of records whose
//!   belongs-to foreign key points at this owner
//!
//! Model names and ids are validated elsewhere to never contain the
//! delimiter, so keys parse unambiguously.

use crate::id::RecordId;
use crate::name::{AttrName, ModelName};

/// Delimiter separating key components; forbidden inside names and ids
pub const KEY_DELIMITER: char = ':';

/// Key of a record's serialized blob: `<model>:id:<id>`
pub fn blob_key(model: &ModelName, id: &RecordId) -> String {
    format!("{model}:id:{id}")
}

/// Key of a model's full-set index: `<model>:all`
pub fn all_key(model: &ModelName) -> String {
    format!("{model}:all")
}

/// Key of an owner's reverse-association index:
/// `<owner_model>:id:<owner_id>:<has_many_name>`
pub fn reverse_key(owner_model: &ModelName, owner_id: &RecordId, has_many: &AttrName) -> String {
    format!("{owner_model}:id:{owner_id}:{has_many}")
}
