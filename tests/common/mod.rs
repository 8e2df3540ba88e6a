//! Shared fixtures for integration tests

use recmap::{AttrKind, MemoryStore, Registry, SchemaBuilder, Store};
use std::sync::Arc;

/// Registry with the canonical pair: `foo` belongs to `bar` (required),
/// `bar` has many `foos`; `foo.created_at` is a required datetime.
pub fn registry() -> Arc<Registry> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
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
    Arc::new(builder.build().unwrap())
}

pub fn conn() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new())
}

/// Persist a fresh `bar` record with no attributes set
pub fn create_bar(registry: &Arc<Registry>, conn: &Arc<dyn Store>) -> recmap::Record {
    recmap::Record::create(registry, "bar", conn, std::iter::empty()).unwrap()
}
