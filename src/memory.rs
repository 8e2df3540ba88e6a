//! In-memory store
//!
//! `MemoryStore` implements the `Store` trait over two plain maps behind a
//! single `parking_lot::RwLock`. It backs the test suite and serves as a
//! reference for the atomicity contract: `atomic` holds the write lock for
//! the whole batch, so readers observe either none or all of it.
//!
//! Reads take the shared lock; every operation is bounded and
//! non-reentrant. Instances are cheap to share via `Arc`.

use crate::error::Result;
use crate::store::{Store, WriteOp};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct Shelves {
    blobs: HashMap<String, Vec<u8>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl Shelves {
    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::Set { key, value } => {
                self.blobs.insert(key, value);
            }
            WriteOp::Del { key } => {
                self.blobs.remove(&key);
            }
            WriteOp::SAdd { set, member } => {
                self.sets.entry(set).or_default().insert(member);
            }
            WriteOp::SRem { set, member } => {
                if let Some(members) = self.sets.get_mut(&set) {
                    members.remove(&member);
                    if members.is_empty() {
                        self.sets.remove(&set);
                    }
                }
            }
        }
    }
}

/// Thread-safe in-process implementation of `Store`
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Shelves>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().blobs.get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.write().blobs.insert(key.to_string(), value);
        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        self.inner.write().blobs.remove(key);
        Ok(())
    }

    fn sadd(&self, set: &str, member: &str) -> Result<()> {
        self.inner
            .write()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn srem(&self, set: &str, member: &str) -> Result<()> {
        self.inner.write().apply(WriteOp::SRem {
            set: set.to_string(),
            member: member.to_string(),
        });
        Ok(())
    }

    fn smembers(&self, set: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .inner
            .read()
            .sets
            .get(set)
            .cloned()
            .unwrap_or_default())
    }

    fn atomic(&self, batch: Vec<WriteOp>) -> Result<()> {
        let mut shelves = self.inner.write();
        for op in batch {
            shelves.apply(op);
        }
        Ok(())
    }
}
