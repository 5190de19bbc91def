//! Capabilities the frontier needs from a shared store.
//!
//! Workers on different hosts never talk to each other; every bit of shared
//! state goes through these two traits. Each method is expected to be a single
//! atomic round-trip against the store, so implementations must not split an
//! operation into a read followed by a write.

use async_trait::async_trait;
use std::sync::Arc;

use crate::StoreError;

#[async_trait]
pub trait AtomicSet {
    /// Insert `member` into the set at `key`. Returns `true` if it was not
    /// there before.
    async fn add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Insert every member, reporting per-member outcome in input order.
    async fn add_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, StoreError>;

    async fn contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn cardinality(&self, key: &str) -> Result<u64, StoreError>;

    /// Remove and return an arbitrary member.
    async fn pop_member(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AtomicQueue {
    /// Append to the tail.
    async fn push(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Append all values to the tail, keeping their order.
    async fn push_many(&self, key: &str, values: &[String]) -> Result<(), StoreError>;

    /// Remove and return the head, `None` when the list is empty.
    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn len(&self, key: &str) -> Result<u64, StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// A store offering both capability groups.
pub trait SharedStore: AtomicSet + AtomicQueue {}

impl<T> SharedStore for T where T: AtomicSet + AtomicQueue {}

pub type AbstractStore = Arc<dyn SharedStore + Send + Sync>;
