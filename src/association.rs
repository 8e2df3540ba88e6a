//! Association descriptors
//!
//! Associations are declared in inverse-consistent pairs: a belongs-to
//! (many-to-one) on one model, a has-many (one-to-many) on the other,
//! each naming the other as its inverse. The registry checks the pairing
//! at build time, so the descriptors here always carry a resolved target
//! model.
//!
//! The belongs-to side owns an implicit foreign key stored in the blob
//! under `<name>_id`. The has-many side stores nothing; it is answered by
//! the reverse index set `<owner_model>:id:<owner_id>:<name>`, maintained
//! on every save/destroy of the owning side.

use crate::error::Result;
use crate::id::RecordId;
use crate::key;
use crate::name::{AttrName, ModelName, TargetName};
use crate::store::Store;
use crate::value::Value;

/// Implicit foreign-key descriptor carried by a belongs-to association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Model the key points into
    pub target_model: ModelName,
    /// Whether a Null key is valid
    pub nullable: bool,
}

impl ForeignKey {
    /// Map the key to its wire primitive
    pub fn serialize(&self, value: Option<&RecordId>) -> Value {
        match value {
            Some(id) => Value::Str(id.as_str().to_string()),
            None => Value::Null,
        }
    }

    /// Check the key: fails closed on Null when non-nullable, and on a
    /// non-null key whose referenced blob is absent from the store
    pub fn validate(&self, value: Option<&RecordId>, store: &dyn Store) -> Result<bool> {
        match value {
            None => Ok(self.nullable),
            Some(id) => {
                let blob = store.get(&key::blob_key(&self.target_model, id))?;
                Ok(blob.is_some())
            }
        }
    }
}

/// Many-to-one association descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsTo {
    /// Association name
    pub name: AttrName,
    /// Declared target type path
    pub target: TargetName,
    /// Name of the has-many inverse on the target model
    pub inverse: AttrName,
    /// The implicit foreign key
    pub fk: ForeignKey,
}

impl BelongsTo {
    /// Name of the implicit foreign-key field: `<name>_id`
    pub fn fk_attr(&self) -> AttrName {
        AttrName::new_unchecked(format!("{}_id", self.name))
    }

    /// Reverse-index key on the owner this record points at
    pub fn reverse_key(&self, owner_id: &RecordId) -> String {
        key::reverse_key(&self.fk.target_model, owner_id, &self.inverse)
    }
}

/// One-to-many association descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasMany {
    /// Association name
    pub name: AttrName,
    /// Declared target type path
    pub target: TargetName,
    /// Resolved target model (the owning side)
    pub target_model: ModelName,
    /// Name of the belongs-to inverse on the target model
    pub inverse: AttrName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn fk(nullable: bool) -> ForeignKey {
        ForeignKey {
            target_model: ModelName::new("bar").unwrap(),
            nullable,
        }
    }

    #[test]
    fn test_fk_serialize() {
        let id = RecordId::new("b1").unwrap();
        assert_eq!(fk(true).serialize(Some(&id)), Value::Str("b1".to_string()));
        assert_eq!(fk(true).serialize(None), Value::Null);
    }

    #[test]
    fn test_fk_validate_nullability() {
        let store = MemoryStore::new();
        assert!(fk(true).validate(None, &store).unwrap());
        assert!(!fk(false).validate(None, &store).unwrap());
    }

    #[test]
    fn test_fk_validate_checks_existence() {
        let store = MemoryStore::new();
        let id = RecordId::new("b1").unwrap();
        assert!(!fk(true).validate(Some(&id), &store).unwrap());
        store.set("bar:id:b1", b"{}".to_vec()).unwrap();
        assert!(fk(true).validate(Some(&id), &store).unwrap());
    }

    #[test]
    fn test_belongs_to_fk_attr_and_reverse_key() {
        let bt = BelongsTo {
            name: AttrName::new("bar").unwrap(),
            target: TargetName::new("Bar").unwrap(),
            inverse: AttrName::new("foos").unwrap(),
            fk: fk(false),
        };
        assert_eq!(bt.fk_attr().as_str(), "bar_id");
        let owner = RecordId::new("b1").unwrap();
        assert_eq!(bt.reverse_key(&owner), "bar:id:b1:foos");
    }
}
