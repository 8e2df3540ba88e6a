//! Typed record mapping over schemaless key-value stores
//!
//! recmap gives records stored in a bare key-value store an identity,
//! typed attributes, and inverse-consistent associations, enforcing at
//! the application boundary the invariants a relational engine would
//! enforce for free: unique identity, foreign-key validity, and
//! consistent collection membership. The store itself only needs `get`,
//! `set`, `del`, set membership, and one atomic batch operation.
//!
//! - `SchemaBuilder` / `Registry`: declare models once at startup
//! - `Attribute` / `AttrKind`: per-field typecast, serialize, validate
//! - `BelongsTo` / `HasMany`: association pairs with declared inverses
//! - `Record`: lifecycle — create, find, all, save, destroy, traverse
//! - `Store` / `MemoryStore`: the external store seam and an in-process
//!   implementation of it
//!
//! # Example
//!
//! ```
//! use recmap::{AttrKind, AttrValue, MemoryStore, Record, SchemaBuilder, Store};
//! use std::sync::Arc;
//!
//! # fn main() -> recmap::Result<()> {
//! let mut builder = SchemaBuilder::new();
//! builder
//!     .model("session")?
//!     .attribute("started_at", AttrKind::Datetime, false)?
//!     .has_many("processes", "Process", "session")?;
//! builder
//!     .model("process")?
//!     .attribute("pid", AttrKind::Integer, true)?
//!     .belongs_to("session", "Session", "processes", false)?;
//! let registry = Arc::new(builder.build()?);
//!
//! let conn: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let session = Record::create(
//!     &registry,
//!     "session",
//!     &conn,
//!     [("started_at", AttrValue::from(1_500_000_000i64))],
//! )?;
//!
//! let mut process = Record::new(&registry, "process", &conn)?;
//! process.set("pid", 42i64)?;
//! process.set_belongs_to("session", Some(&session))?;
//! process.save()?;
//!
//! let found = Record::find(&registry, "process", &conn, process.require_id()?.as_str())?;
//! assert_eq!(found.as_serialized(), process.as_serialized());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod association;
pub mod attribute;
pub mod codec;
pub mod error;
pub mod id;
pub mod key;
pub mod memory;
pub mod name;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use association::{BelongsTo, ForeignKey, HasMany};
pub use attribute::{AttrKind, Attribute, CastError};
pub use codec::FieldMap;
pub use error::{Error, Result};
pub use id::{IdError, RecordId};
pub use key::KEY_DELIMITER;
pub use memory::MemoryStore;
pub use name::{AttrName, ModelName, NameError, TargetName};
pub use record::Record;
pub use schema::{ModelBuilder, ModelSchema, Registry, SchemaBuilder};
pub use store::{Store, WriteOp};
pub use value::{AttrValue, Value};
