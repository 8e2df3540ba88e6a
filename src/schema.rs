//! Model schemas and the registry
//!
//! Declaration happens once, at process start, through `SchemaBuilder`:
//! one `model(..)` call per record type, then attributes and associations
//! on the returned handle, then `build()`. The result is an immutable
//! `Registry` — a name-keyed indirection table that breaks declaration
//! order cycles: two models may reference each other freely because
//! association targets are held as names and resolved only at `build()`.
//!
//! `build()` fails loudly (`Error::Configuration`) on an unregistered
//! target and on any broken inverse pair. Inverses are declared pairs,
//! never derived: every belongs-to must name a has-many on its target
//! that points straight back, and vice versa.
//!
//! After `build()` nothing mutates; registries are shared via `Arc`.

use crate::association::{BelongsTo, ForeignKey, HasMany};
use crate::attribute::{AttrKind, Attribute};
use crate::error::{Error, Result};
use crate::name::{AttrName, ModelName, TargetName};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable schema of one declared record type
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: ModelName,
    attributes: BTreeMap<AttrName, Attribute>,
    belongs_to: BTreeMap<AttrName, BelongsTo>,
    has_many: BTreeMap<AttrName, HasMany>,
}

impl ModelSchema {
    /// Model name (the key-namespace prefix)
    pub fn name(&self) -> &ModelName {
        &self.name
    }

    /// Look up a declared attribute
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Iterate declared attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&AttrName, &Attribute)> {
        self.attributes.iter()
    }

    /// Look up a belongs-to association
    pub fn belongs_to(&self, name: &str) -> Option<&BelongsTo> {
        self.belongs_to.get(name)
    }

    /// Iterate belongs-to associations in name order
    pub fn belongs_to_all(&self) -> impl Iterator<Item = (&AttrName, &BelongsTo)> {
        self.belongs_to.iter()
    }

    /// Look up a has-many association
    pub fn has_many(&self, name: &str) -> Option<&HasMany> {
        self.has_many.get(name)
    }

    /// Iterate has-many associations in name order
    pub fn has_many_all(&self) -> impl Iterator<Item = (&AttrName, &HasMany)> {
        self.has_many.iter()
    }
}

#[derive(Debug)]
struct BelongsToDecl {
    target: TargetName,
    inverse: AttrName,
    nullable: bool,
}

#[derive(Debug)]
struct HasManyDecl {
    target: TargetName,
    inverse: AttrName,
}

#[derive(Debug)]
struct ModelDecl {
    name: ModelName,
    attributes: BTreeMap<AttrName, Attribute>,
    belongs_to: BTreeMap<AttrName, BelongsToDecl>,
    has_many: BTreeMap<AttrName, HasManyDecl>,
}

impl ModelDecl {
    /// Reject a field name already taken by an attribute, an association,
    /// or a foreign-key slot
    fn check_fresh(&self, name: &AttrName) -> Result<()> {
        let taken = self.attributes.contains_key(name)
            || self.belongs_to.contains_key(name)
            || self.has_many.contains_key(name)
            || self
                .belongs_to
                .keys()
                .any(|assoc| format!("{assoc}_id") == name.as_str());
        if taken {
            return Err(Error::Configuration(format!(
                "{}.{} declared twice",
                self.name, name
            )));
        }
        Ok(())
    }
}

/// Declaration handle for one model
#[derive(Debug)]
pub struct ModelBuilder<'a> {
    decl: &'a mut ModelDecl,
}

impl ModelBuilder<'_> {
    /// Declare a typed attribute
    pub fn attribute(&mut self, name: &str, kind: AttrKind, nullable: bool) -> Result<&mut Self> {
        let name = attr_name(&self.decl.name, name)?;
        self.decl.check_fresh(&name)?;
        self.decl
            .attributes
            .insert(name, Attribute::new(kind, nullable));
        Ok(self)
    }

    /// Declare a belongs-to (many-to-one) association
    ///
    /// Registers the implicit `<name>_id` foreign-key slot alongside the
    /// association itself. `inverse` names the has-many on the target.
    pub fn belongs_to(
        &mut self,
        name: &str,
        target: &str,
        inverse: &str,
        nullable: bool,
    ) -> Result<&mut Self> {
        let name = attr_name(&self.decl.name, name)?;
        let inverse = attr_name(&self.decl.name, inverse)?;
        let target = target_name(&self.decl.name, &name, target)?;
        self.decl.check_fresh(&name)?;
        let fk_slot = AttrName::new_unchecked(format!("{name}_id"));
        self.decl.check_fresh(&fk_slot)?;
        self.decl.belongs_to.insert(
            name,
            BelongsToDecl {
                target,
                inverse,
                nullable,
            },
        );
        Ok(self)
    }

    /// Declare a has-many (one-to-many) association
    ///
    /// Registers no storage; the reverse index answers it. `inverse`
    /// names the belongs-to on the target.
    pub fn has_many(&mut self, name: &str, target: &str, inverse: &str) -> Result<&mut Self> {
        let name = attr_name(&self.decl.name, name)?;
        let inverse = attr_name(&self.decl.name, inverse)?;
        let target = target_name(&self.decl.name, &name, target)?;
        self.decl.check_fresh(&name)?;
        self.decl
            .has_many
            .insert(name, HasManyDecl { target, inverse });
        Ok(self)
    }
}

fn attr_name(model: &ModelName, name: &str) -> Result<AttrName> {
    AttrName::new(name)
        .map_err(|err| Error::Configuration(format!("invalid name {name:?} on {model}: {err}")))
}

fn target_name(model: &ModelName, assoc: &AttrName, target: &str) -> Result<TargetName> {
    TargetName::new(target).map_err(|err| {
        Error::Configuration(format!(
            "invalid target {target:?} for {model}.{assoc}: {err}"
        ))
    })
}

/// Builder collecting model declarations before they freeze into a
/// `Registry`
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: BTreeMap<ModelName, ModelDecl>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a model; fails on an invalid or duplicate name
    pub fn model(&mut self, name: &str) -> Result<ModelBuilder<'_>> {
        let name = ModelName::new(name)
            .map_err(|err| Error::Configuration(format!("invalid model name {name:?}: {err}")))?;
        if self.models.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "model name {name} has already been set"
            )));
        }
        let decl = self.models.entry(name.clone()).or_insert(ModelDecl {
            name,
            attributes: BTreeMap::new(),
            belongs_to: BTreeMap::new(),
            has_many: BTreeMap::new(),
        });
        Ok(ModelBuilder { decl })
    }

    /// Resolve targets, verify inverse pairs, and freeze into a registry
    pub fn build(self) -> Result<Registry> {
        // Pass 1: every association target resolves, and every declared
        // inverse pair points back at its origin.
        for decl in self.models.values() {
            for (name, bt) in &decl.belongs_to {
                let target = self.resolve(&decl.name, name, &bt.target)?;
                let inverse = target.has_many.get(&bt.inverse).ok_or_else(|| {
                    Error::Configuration(format!(
                        "{}.{} names inverse {}.{}, which is not a has_many",
                        decl.name, name, target.name, bt.inverse
                    ))
                })?;
                if inverse.target.model_key() != decl.name.as_str()
                    || inverse.inverse != *name
                {
                    return Err(Error::Configuration(format!(
                        "inverse pair mismatch: {}.{} and {}.{}",
                        decl.name, name, target.name, bt.inverse
                    )));
                }
            }
            for (name, hm) in &decl.has_many {
                let target = self.resolve(&decl.name, name, &hm.target)?;
                let inverse = target.belongs_to.get(&hm.inverse).ok_or_else(|| {
                    Error::Configuration(format!(
                        "{}.{} names inverse {}.{}, which is not a belongs_to",
                        decl.name, name, target.name, hm.inverse
                    ))
                })?;
                if inverse.target.model_key() != decl.name.as_str()
                    || inverse.inverse != *name
                {
                    return Err(Error::Configuration(format!(
                        "inverse pair mismatch: {}.{} and {}.{}",
                        decl.name, name, target.name, hm.inverse
                    )));
                }
            }
        }

        // Pass 2: freeze, embedding resolved model names.
        let mut models = BTreeMap::new();
        for (model_name, decl) in &self.models {
            let mut belongs_to = BTreeMap::new();
            for (name, bt) in &decl.belongs_to {
                let target_model = self.resolve(&decl.name, name, &bt.target)?.name.clone();
                belongs_to.insert(
                    name.clone(),
                    BelongsTo {
                        name: name.clone(),
                        target: bt.target.clone(),
                        inverse: bt.inverse.clone(),
                        fk: ForeignKey {
                            target_model,
                            nullable: bt.nullable,
                        },
                    },
                );
            }
            let mut has_many = BTreeMap::new();
            for (name, hm) in &decl.has_many {
                let target_model = self.resolve(&decl.name, name, &hm.target)?.name.clone();
                has_many.insert(
                    name.clone(),
                    HasMany {
                        name: name.clone(),
                        target: hm.target.clone(),
                        target_model,
                        inverse: hm.inverse.clone(),
                    },
                );
            }
            models.insert(
                model_name.clone(),
                Arc::new(ModelSchema {
                    name: decl.name.clone(),
                    attributes: decl.attributes.clone(),
                    belongs_to,
                    has_many,
                }),
            );
        }
        Ok(Registry { models })
    }

    fn resolve(&self, model: &ModelName, assoc: &AttrName, target: &TargetName) -> Result<&ModelDecl> {
        self.models.get(target.model_key().as_str()).ok_or_else(|| {
            Error::Configuration(format!(
                "{model}.{assoc} references unregistered target {target}"
            ))
        })
    }
}

/// Immutable, process-wide model table
#[derive(Debug)]
pub struct Registry {
    models: BTreeMap<ModelName, Arc<ModelSchema>>,
}

impl Registry {
    /// Look up a model by name
    pub fn model(&self, name: &str) -> Option<&Arc<ModelSchema>> {
        self.models.get(name)
    }

    /// Look up a model by name, failing loudly when absent
    pub fn expect_model(&self, name: &str) -> Result<Arc<ModelSchema>> {
        self.model(name)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("model {name:?} was never registered")))
    }

    /// Iterate registered models in name order
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelSchema>> {
        self.models.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired_builder() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        builder
            .model("bar")
            .unwrap()
            .attribute("started_at", AttrKind::Datetime, true)
            .unwrap()
            .has_many("foos", "Foo", "bar")
            .unwrap();
        builder
            .model("foo")
            .unwrap()
            .attribute("created_at", AttrKind::Datetime, false)
            .unwrap()
            .belongs_to("bar", "Bar", "foos", false)
            .unwrap();
        builder
    }

    #[test]
    fn test_build_resolves_inverse_pair() {
        let registry = paired_builder().build().unwrap();
        let foo = registry.expect_model("foo").unwrap();
        let bt = foo.belongs_to("bar").unwrap();
        assert_eq!(bt.fk.target_model.as_str(), "bar");
        assert_eq!(bt.inverse.as_str(), "foos");

        let bar = registry.expect_model("bar").unwrap();
        let hm = bar.has_many("foos").unwrap();
        assert_eq!(hm.target_model.as_str(), "foo");
        assert_eq!(hm.inverse.as_str(), "bar");
    }

    #[test]
    fn test_duplicate_model_name_fails() {
        let mut builder = SchemaBuilder::new();
        builder.model("foo").unwrap();
        let err = builder.model("foo").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("already been set"));
    }

    #[test]
    fn test_invalid_model_name_fails() {
        let mut builder = SchemaBuilder::new();
        assert!(matches!(
            builder.model("Foo"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(builder.model(""), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_duplicate_attribute_fails() {
        let mut builder = SchemaBuilder::new();
        let mut model = builder.model("foo").unwrap();
        model.attribute("size", AttrKind::Integer, true).unwrap();
        let err = model
            .attribute("size", AttrKind::String, true)
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_attribute_colliding_with_fk_slot_fails() {
        let mut builder = SchemaBuilder::new();
        let mut model = builder.model("foo").unwrap();
        model.belongs_to("bar", "Bar", "foos", false).unwrap();
        let err = model
            .attribute("bar_id", AttrKind::String, true)
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_invalid_target_name_fails() {
        let mut builder = SchemaBuilder::new();
        let mut model = builder.model("foo").unwrap();
        assert!(model.belongs_to("bar", "bar", "foos", false).is_err());
        assert!(model.belongs_to("bar", "Name::", "foos", false).is_err());
    }

    #[test]
    fn test_unregistered_target_fails_at_build() {
        let mut builder = SchemaBuilder::new();
        builder
            .model("foo")
            .unwrap()
            .belongs_to("bar", "Bar", "foos", false)
            .unwrap();
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("unregistered target"));
    }

    #[test]
    fn test_missing_inverse_fails_at_build() {
        let mut builder = SchemaBuilder::new();
        builder.model("bar").unwrap();
        builder
            .model("foo")
            .unwrap()
            .belongs_to("bar", "Bar", "foos", false)
            .unwrap();
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("not a has_many"));
    }

    #[test]
    fn test_mismatched_inverse_fails_at_build() {
        let mut builder = SchemaBuilder::new();
        // bar.foos points back at foo.other, not foo.bar
        builder
            .model("bar")
            .unwrap()
            .has_many("foos", "Foo", "other")
            .unwrap();
        builder
            .model("foo")
            .unwrap()
            .belongs_to("bar", "Bar", "foos", false)
            .unwrap()
            .belongs_to("other", "Bar", "foos", true)
            .unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_namespaced_target_resolves_by_last_segment() {
        let mut builder = SchemaBuilder::new();
        builder
            .model("invoice")
            .unwrap()
            .has_many("line_items", "Billing::LineItem", "invoice")
            .unwrap();
        builder
            .model("line_item")
            .unwrap()
            .belongs_to("invoice", "Billing::Invoice", "line_items", false)
            .unwrap();
        let registry = builder.build().unwrap();
        let li = registry.expect_model("line_item").unwrap();
        assert_eq!(
            li.belongs_to("invoice").unwrap().fk.target_model.as_str(),
            "invoice"
        );
    }

    #[test]
    fn test_declaration_order_is_irrelevant() {
        // foo declared first, referencing bar before bar exists
        let mut builder = SchemaBuilder::new();
        builder
            .model("foo")
            .unwrap()
            .belongs_to("bar", "Bar", "foos", false)
            .unwrap();
        builder
            .model("bar")
            .unwrap()
            .has_many("foos", "Foo", "bar")
            .unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_expect_model_fails_loudly() {
        let registry = SchemaBuilder::new().build().unwrap();
        assert!(matches!(
            registry.expect_model("ghost"),
            Err(Error::Configuration(_))
        ));
    }
}
