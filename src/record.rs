//! Record engine
//!
//! Instance-level lifecycle: construction, attribute access with
//! typecasting, save, destroy, find, enumeration, and association
//! traversal. A record binds its store handle exactly once at
//! construction and never rebinds it.
//!
//! ## Persistence protocol
//!
//! `save` validates every attribute and every belongs-to foreign key
//! (existence-checked against the store), then applies one atomic batch:
//! the blob at `<model>:id:<id>`, the id into `<model>:all`, and any
//! reverse-index membership changes for foreign keys that moved since the
//! last save. `destroy` undoes all three in one batch. Nothing is written
//! when validation fails.
//!
//! ## Caching
//!
//! Belongs-to and has-many reads are cached per instance for its
//! lifetime and never invalidated automatically; re-`find` the record to
//! observe external changes.
//!
//! ## Concurrency
//!
//! One logical operation per instance: callers must not share a record
//! across concurrent save/destroy calls. Distinct records may operate on
//! the same store concurrently, with the usual check-then-act caveat: two
//! records can both validate a foreign key before its target is
//! destroyed. The store offers no multi-key transaction beyond the
//! atomic batch, so the engine does not pretend otherwise.

use crate::codec::{self, FieldMap};
use crate::error::{Error, Result};
use crate::id::RecordId;
use crate::key;
use crate::name::AttrName;
use crate::schema::{ModelSchema, Registry};
use crate::store::{Store, WriteOp};
use crate::value::{AttrValue, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One mapped record instance
#[derive(Clone)]
pub struct Record {
    registry: Arc<Registry>,
    schema: Arc<ModelSchema>,
    conn: Arc<dyn Store>,
    id: Option<RecordId>,
    persisted: bool,
    values: BTreeMap<AttrName, AttrValue>,
    /// Current foreign keys, one slot per belongs-to
    fks: BTreeMap<AttrName, Option<RecordId>>,
    /// Foreign keys as last written, for reverse-index diffing
    saved_fks: BTreeMap<AttrName, Option<RecordId>>,
    belongs_to_cache: BTreeMap<AttrName, Option<Record>>,
    has_many_cache: BTreeMap<AttrName, Vec<Record>>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("model", self.schema.name())
            .field("id", &self.id)
            .field("persisted", &self.persisted)
            .field("values", &self.values)
            .field("fks", &self.fks)
            .finish_non_exhaustive()
    }
}

impl Record {
    /// Construct a fresh, unpersisted record of the named model
    ///
    /// Every declared attribute starts Null and every foreign key unset.
    pub fn new(registry: &Arc<Registry>, model: &str, conn: &Arc<dyn Store>) -> Result<Self> {
        let schema = registry.expect_model(model)?;
        let values = schema
            .attributes()
            .map(|(name, _)| (name.clone(), AttrValue::Null))
            .collect();
        let fks = schema
            .belongs_to_all()
            .map(|(name, _)| (name.clone(), None))
            .collect();
        Ok(Record {
            registry: Arc::clone(registry),
            schema,
            conn: Arc::clone(conn),
            id: None,
            persisted: false,
            values,
            fks,
            saved_fks: BTreeMap::new(),
            belongs_to_cache: BTreeMap::new(),
            has_many_cache: BTreeMap::new(),
        })
    }

    /// Construct, assign the given fields, and save in one step
    pub fn create<'a, I>(
        registry: &Arc<Registry>,
        model: &str,
        conn: &Arc<dyn Store>,
        fields: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, AttrValue)>,
    {
        let mut record = Self::new(registry, model, conn)?;
        for (name, value) in fields {
            record.set_field(name, value)?;
        }
        record.save()?;
        Ok(record)
    }

    /// Load a persisted record by id
    ///
    /// Fails with `InvalidId` on a syntactically bad id and
    /// `RecordNotFound` when no blob exists under it.
    pub fn find(
        registry: &Arc<Registry>,
        model: &str,
        conn: &Arc<dyn Store>,
        id: &str,
    ) -> Result<Self> {
        let record_id = RecordId::new(id)?;
        let mut record = Self::new(registry, model, conn)?;
        let schema = Arc::clone(&record.schema);
        let bytes = conn
            .get(&key::blob_key(schema.name(), &record_id))?
            .ok_or_else(|| Error::RecordNotFound {
                model: schema.name().to_string(),
                id: id.to_string(),
            })?;
        let fields = codec::decode(&bytes)?;
        for (name, attr) in schema.attributes() {
            if let Some(wire) = fields.get(name.as_str()) {
                let cast = attr
                    .typecast(AttrValue::from(wire.clone()))
                    .map_err(|err| Error::TypeMismatch {
                        model: schema.name().to_string(),
                        attribute: name.to_string(),
                        expected: err.expected.to_string(),
                        got: err.got.to_string(),
                    })?;
                if let Some(slot) = record.values.get_mut(name.as_str()) {
                    *slot = cast;
                }
            }
        }
        for (name, bt) in schema.belongs_to_all() {
            let parsed = match fields.get(bt.fk_attr().as_str()) {
                Some(Value::Str(raw)) => Some(RecordId::new(raw.as_str())?),
                _ => None,
            };
            if let Some(slot) = record.fks.get_mut(name.as_str()) {
                *slot = parsed;
            }
        }
        record.id = Some(record_id);
        record.persisted = true;
        record.saved_fks = record.fks.clone();
        debug!(model = %schema.name(), id, "record loaded");
        Ok(record)
    }

    /// Enumerate every live record of the named model, id-sorted
    ///
    /// A full-set member with no blob is a stale index entry; enumeration
    /// aborts on the first one with `RecordNotFound`.
    pub fn all(registry: &Arc<Registry>, model: &str, conn: &Arc<dyn Store>) -> Result<Vec<Self>> {
        let schema = registry.expect_model(model)?;
        let ids = conn.smembers(&key::all_key(schema.name()))?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match Self::find(registry, model, conn, &id) {
                Ok(record) => records.push(record),
                Err(err @ Error::RecordNotFound { .. }) => {
                    warn!(model, id = %id, "stale full-set index member, aborting enumeration");
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }

    /// Model schema backing this record
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Model name
    pub fn model_name(&self) -> &str {
        self.schema.name().as_str()
    }

    /// Id, present only after the first successful save
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// Whether the record currently exists in the store
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Id of a persisted record, for use as a foreign key
    ///
    /// The only sanctioned way to read an id destined for a foreign-key
    /// slot: fails with `RecordNotPersisted` on a new or destroyed
    /// record.
    pub fn require_id(&self) -> Result<&RecordId> {
        match &self.id {
            Some(id) if self.persisted => Ok(id),
            _ => Err(Error::RecordNotPersisted {
                model: self.schema.name().to_string(),
            }),
        }
    }

    /// Read a declared attribute
    pub fn get(&self, name: &str) -> Result<&AttrValue> {
        self.values.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Set a declared attribute, typecasting the input
    ///
    /// On a mismatch the field keeps its prior value.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let attr = schema.attribute(name).ok_or_else(|| self.unknown(name))?;
        let cast = attr
            .typecast(value.into())
            .map_err(|err| Error::TypeMismatch {
                model: schema.name().to_string(),
                attribute: name.to_string(),
                expected: err.expected.to_string(),
                got: err.got.to_string(),
            })?;
        if let Some(slot) = self.values.get_mut(name) {
            *slot = cast;
        }
        Ok(())
    }

    /// Set a field by name, routing `<assoc>_id` keys to the matching
    /// foreign-key slot
    pub fn set_field(&mut self, name: &str, value: AttrValue) -> Result<()> {
        if self.schema.attribute(name).is_some() {
            return self.set(name, value);
        }
        if let Some(assoc) = name.strip_suffix("_id") {
            if self.schema.belongs_to(assoc).is_some() {
                let assoc = assoc.to_string();
                return match value {
                    AttrValue::Null => self.set_fk_id(&assoc, None),
                    AttrValue::Str(raw) => self.set_fk_id(&assoc, Some(&raw)),
                    other => Err(Error::TypeMismatch {
                        model: self.schema.name().to_string(),
                        attribute: name.to_string(),
                        expected: "string".to_string(),
                        got: other.type_name().to_string(),
                    }),
                };
            }
        }
        Err(self.unknown(name))
    }

    /// Read a belongs-to foreign key
    pub fn fk_id(&self, assoc: &str) -> Result<Option<&RecordId>> {
        self.fks
            .get(assoc)
            .map(Option::as_ref)
            .ok_or_else(|| self.unknown(assoc))
    }

    /// Set a belongs-to foreign key directly by id
    ///
    /// `None` clears the key. Either way the association's cache entry is
    /// dropped. Fails with `InvalidId` on a malformed id.
    pub fn set_fk_id(&mut self, assoc: &str, id: Option<&str>) -> Result<()> {
        if self.schema.belongs_to(assoc).is_none() {
            return Err(self.unknown(assoc));
        }
        let parsed = match id {
            Some(raw) => Some(RecordId::new(raw)?),
            None => None,
        };
        if let Some(slot) = self.fks.get_mut(assoc) {
            *slot = parsed;
        }
        self.belongs_to_cache.remove(assoc);
        Ok(())
    }

    /// Assign a belongs-to association from a record
    ///
    /// `None` clears the key and cache. `Some` requires a persisted
    /// record of the exact target model; its id lands in the foreign-key
    /// slot and the record itself in the cache.
    pub fn set_belongs_to(&mut self, assoc: &str, target: Option<&Record>) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let bt = schema.belongs_to(assoc).ok_or_else(|| self.unknown(assoc))?;
        match target {
            None => {
                if let Some(slot) = self.fks.get_mut(assoc) {
                    *slot = None;
                }
                self.belongs_to_cache.remove(assoc);
            }
            Some(record) => {
                if record.schema.name() != &bt.fk.target_model {
                    return Err(Error::TypeMismatch {
                        model: schema.name().to_string(),
                        attribute: assoc.to_string(),
                        expected: bt.fk.target_model.to_string(),
                        got: record.schema.name().to_string(),
                    });
                }
                let id = record.require_id()?.clone();
                if let Some(slot) = self.fks.get_mut(assoc) {
                    *slot = Some(id);
                }
                self.belongs_to_cache
                    .insert(AttrName::new_unchecked(assoc), Some(record.clone()));
            }
        }
        Ok(())
    }

    /// Traverse a belongs-to association
    ///
    /// Resolves through the store on first read, then serves the
    /// per-instance cache.
    pub fn belongs_to(&mut self, assoc: &str) -> Result<Option<&Record>> {
        let schema = Arc::clone(&self.schema);
        let bt = schema.belongs_to(assoc).ok_or_else(|| self.unknown(assoc))?;
        let fk = self
            .fks
            .get(assoc)
            .cloned()
            .ok_or_else(|| self.unknown(assoc))?;
        let Some(id) = fk else {
            return Ok(None);
        };
        if !self.belongs_to_cache.contains_key(assoc) {
            let registry = Arc::clone(&self.registry);
            let conn = Arc::clone(&self.conn);
            let found = Record::find(&registry, bt.fk.target_model.as_str(), &conn, id.as_str())?;
            self.belongs_to_cache
                .insert(AttrName::new_unchecked(assoc), Some(found));
        }
        Ok(self
            .belongs_to_cache
            .get(assoc)
            .and_then(|cached| cached.as_ref()))
    }

    /// Traverse a has-many association
    ///
    /// Reads the reverse index and resolves every member, id-sorted,
    /// caching the collection for the instance lifetime. Aborts with
    /// `RecordNotFound` on a stale index member, same policy as `all`.
    pub fn has_many(&mut self, assoc: &str) -> Result<&[Record]> {
        let schema = Arc::clone(&self.schema);
        let hm = schema.has_many(assoc).ok_or_else(|| self.unknown(assoc))?;
        if !self.has_many_cache.contains_key(assoc) {
            let owner_id = self.require_id()?.clone();
            let members = self
                .conn
                .smembers(&key::reverse_key(schema.name(), &owner_id, &hm.name))?;
            let registry = Arc::clone(&self.registry);
            let conn = Arc::clone(&self.conn);
            let mut records = Vec::with_capacity(members.len());
            for member in members {
                match Record::find(&registry, hm.target_model.as_str(), &conn, &member) {
                    Ok(record) => records.push(record),
                    Err(err @ Error::RecordNotFound { .. }) => {
                        warn!(
                            model = %schema.name(),
                            assoc,
                            member = %member,
                            "stale reverse index member, aborting traversal"
                        );
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            self.has_many_cache
                .insert(AttrName::new_unchecked(assoc), records);
        }
        Ok(self
            .has_many_cache
            .get(assoc)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// The record's serialized field map: every attribute plus every
    /// `<assoc>_id` foreign key, as the blob would store them
    pub fn as_serialized(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        for (name, attr) in self.schema.attributes() {
            let value = self.values.get(name.as_str()).unwrap_or(&AttrValue::Null);
            fields.insert(name.to_string(), attr.serialize(value));
        }
        for (_, bt) in self.schema.belongs_to_all() {
            let fk = self
                .fks
                .get(bt.name.as_str())
                .and_then(|slot| slot.as_ref());
            fields.insert(bt.fk_attr().to_string(), bt.fk.serialize(fk));
        }
        fields
    }

    /// Validate and persist the record
    ///
    /// Any validation failure is `RecordInvalid` and nothing reaches the
    /// store. A new record gets its id here. The blob write, the full-set
    /// add, and any reverse-index changes land in one atomic batch.
    pub fn save(&mut self) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let mut failures = Vec::new();
        for (name, attr) in schema.attributes() {
            let value = self.values.get(name.as_str()).unwrap_or(&AttrValue::Null);
            if !attr.validate(value) {
                failures.push(format!("{name} may not be null"));
            }
        }
        for (name, bt) in schema.belongs_to_all() {
            let fk = self.fks.get(name.as_str()).cloned().flatten();
            if !bt.fk.validate(fk.as_ref(), self.conn.as_ref())? {
                if fk.is_none() {
                    failures.push(format!("{name}_id may not be null"));
                } else {
                    failures.push(format!(
                        "{name} references a missing {} record",
                        bt.fk.target_model
                    ));
                }
            }
        }
        if !failures.is_empty() {
            return Err(Error::RecordInvalid {
                model: schema.name().to_string(),
                failures,
            });
        }

        let id = match &self.id {
            Some(id) => id.clone(),
            None => {
                let id = RecordId::generate();
                self.id = Some(id.clone());
                id
            }
        };
        let bytes = codec::encode(&self.as_serialized())?;
        let mut batch = vec![
            WriteOp::Set {
                key: key::blob_key(schema.name(), &id),
                value: bytes,
            },
            WriteOp::SAdd {
                set: key::all_key(schema.name()),
                member: id.to_string(),
            },
        ];
        for (name, bt) in schema.belongs_to_all() {
            let previous = self.saved_fks.get(name.as_str()).cloned().flatten();
            let current = self.fks.get(name.as_str()).cloned().flatten();
            if previous != current {
                if let Some(old_owner) = &previous {
                    batch.push(WriteOp::SRem {
                        set: bt.reverse_key(old_owner),
                        member: id.to_string(),
                    });
                }
                if let Some(new_owner) = &current {
                    batch.push(WriteOp::SAdd {
                        set: bt.reverse_key(new_owner),
                        member: id.to_string(),
                    });
                }
            }
        }
        self.conn.atomic(batch)?;
        self.persisted = true;
        self.saved_fks = self.fks.clone();
        debug!(model = %schema.name(), id = %id, "record saved");
        Ok(())
    }

    /// Remove the record from the store
    ///
    /// One atomic batch deletes the blob and withdraws the id from the
    /// full-set index and every reverse index it was written into. The
    /// instance reverts to "new": no id, not persisted. A later save
    /// mints a fresh id rather than resurrecting the old entry.
    pub fn destroy(&mut self) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let id = match &self.id {
            Some(id) if self.persisted => id.clone(),
            _ => {
                return Err(Error::RecordNotPersisted {
                    model: schema.name().to_string(),
                })
            }
        };
        let mut batch = vec![
            WriteOp::Del {
                key: key::blob_key(schema.name(), &id),
            },
            WriteOp::SRem {
                set: key::all_key(schema.name()),
                member: id.to_string(),
            },
        ];
        for (name, bt) in schema.belongs_to_all() {
            if let Some(Some(owner)) = self.saved_fks.get(name.as_str()) {
                batch.push(WriteOp::SRem {
                    set: bt.reverse_key(owner),
                    member: id.to_string(),
                });
            }
        }
        self.conn.atomic(batch)?;
        self.id = None;
        self.persisted = false;
        self.saved_fks.clear();
        self.belongs_to_cache.clear();
        self.has_many_cache.clear();
        debug!(model = %schema.name(), id = %id, "record destroyed");
        Ok(())
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownAttribute {
            model: self.schema.name().to_string(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrKind;
    use crate::memory::MemoryStore;
    use crate::schema::SchemaBuilder;

    fn registry() -> Arc<Registry> {
        let mut builder = SchemaBuilder::new();
        builder
            .model("session")
            .unwrap()
            .attribute("active", AttrKind::Boolean, true)
            .unwrap()
            .attribute("started_at", AttrKind::Datetime, true)
            .unwrap();
        Arc::new(builder.build().unwrap())
    }

    fn conn() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_new_record_starts_null_and_unpersisted() {
        let (registry, conn) = (registry(), conn());
        let record = Record::new(&registry, "session", &conn).unwrap();
        assert!(!record.is_persisted());
        assert!(record.id().is_none());
        assert_eq!(record.get("active").unwrap(), &AttrValue::Null);
    }

    #[test]
    fn test_unknown_model_fails() {
        let (registry, conn) = (registry(), conn());
        assert!(matches!(
            Record::new(&registry, "ghost", &conn),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_set_typecasts_and_keeps_prior_value_on_mismatch() {
        let (registry, conn) = (registry(), conn());
        let mut record = Record::new(&registry, "session", &conn).unwrap();
        record.set("started_at", 1_500_000_000i64).unwrap();
        let before = record.get("started_at").unwrap().clone();
        let err = record.set("started_at", "noon").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(record.get("started_at").unwrap(), &before);
    }

    #[test]
    fn test_get_unknown_attribute_fails() {
        let (registry, conn) = (registry(), conn());
        let record = Record::new(&registry, "session", &conn).unwrap();
        assert!(matches!(
            record.get("missing"),
            Err(Error::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_require_id_before_save_fails() {
        let (registry, conn) = (registry(), conn());
        let record = Record::new(&registry, "session", &conn).unwrap();
        assert!(matches!(
            record.require_id(),
            Err(Error::RecordNotPersisted { .. })
        ));
    }

    #[test]
    fn test_save_assigns_id_once() {
        let (registry, conn) = (registry(), conn());
        let mut record = Record::new(&registry, "session", &conn).unwrap();
        record.save().unwrap();
        let first = record.require_id().unwrap().clone();
        record.set("active", true).unwrap();
        record.save().unwrap();
        assert_eq!(record.require_id().unwrap(), &first);
    }

    #[test]
    fn test_find_rejects_malformed_ids() {
        let (registry, conn) = (registry(), conn());
        assert!(matches!(
            Record::find(&registry, "session", &conn, "a:b"),
            Err(Error::InvalidId(_))
        ));
        assert!(matches!(
            Record::find(&registry, "session", &conn, ""),
            Err(Error::InvalidId(_))
        ));
    }

    #[test]
    fn test_destroy_unpersisted_fails() {
        let (registry, conn) = (registry(), conn());
        let mut record = Record::new(&registry, "session", &conn).unwrap();
        assert!(matches!(
            record.destroy(),
            Err(Error::RecordNotPersisted { .. })
        ));
    }
}
