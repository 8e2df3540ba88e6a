//! Store seam
//!
//! The mapping layer consumes a key-value store through this trait; it
//! never owns a connection or a transport. Any backend offering string
//! keys, byte values, member sets, and an all-or-nothing batch can sit
//! behind it (Redis being the canonical shape).
//!
//! ## Contract
//!
//! - Every call is synchronous and bounded; no retries happen here.
//!   Transient-failure policy belongs to the backend client.
//! - `atomic` applies its batch indivisibly. Partial application breaks
//!   index consistency and is a correctness violation for the engine.
//! - Implementations must be safe for concurrent independent operations
//!   across distinct keys (`Send + Sync`).

use crate::error::Result;
use std::collections::BTreeSet;

/// One write in an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Set a byte value at a key
    Set {
        /// Target key
        key: String,
        /// Value bytes
        value: Vec<u8>,
    },
    /// Delete a key
    Del {
        /// Target key
        key: String,
    },
    /// Add a member to a set
    SAdd {
        /// Set key
        set: String,
        /// Member to add
        member: String,
    },
    /// Remove a member from a set
    SRem {
        /// Set key
        set: String,
        /// Member to remove
        member: String,
    },
}

/// Handle to an external schemaless key-value store
pub trait Store: Send + Sync {
    /// Get the bytes at a key, if present
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set the bytes at a key
    fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key (no-op when absent)
    fn del(&self, key: &str) -> Result<()>;

    /// Add a member to a set
    fn sadd(&self, set: &str, member: &str) -> Result<()>;

    /// Remove a member from a set (no-op when absent)
    fn srem(&self, set: &str, member: &str) -> Result<()>;

    /// Read all members of a set (empty when absent)
    fn smembers(&self, set: &str) -> Result<BTreeSet<String>>;

    /// Apply a batch of writes indivisibly
    fn atomic(&self, batch: Vec<WriteOp>) -> Result<()>;
}
