//! Pending batch tracking for asynchronous full reindexes.
//!
//! Each index has one shared set of outstanding batch ids, stored under
//! `<namespace>:reindex:<index>:batches` in an external key-value store.
//! Ids are added when a batch job is emitted and removed when it completes,
//! so the set's cardinality is the number of batches left.
//!
//! A job that dies without completing leaves its id behind; the count is a
//! best-effort progress indicator, not a liveness guarantee. Batch ids are
//! only unique within one reindex run, so overlapping runs on the same index
//! share (and corrupt) one count.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use reindex_types::ReindexError;

/// Atomic set primitives of the shared store.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Add `member`; returns whether it was newly added.
    async fn add(&self, key: &str, member: &str) -> Result<bool, ReindexError>;

    /// Remove `member`; returns whether it was present.
    async fn remove(&self, key: &str, member: &str) -> Result<bool, ReindexError>;

    /// Number of members in the set (0 for a missing key).
    async fn cardinality(&self, key: &str) -> Result<u64, ReindexError>;
}

/// In-process set store for tests and single-node use.
#[derive(Debug, Default)]
pub struct MemorySetStore {
    sets: DashMap<String, HashSet<String>>,
}

impl MemorySetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SetStore for MemorySetStore {
    async fn add(&self, key: &str, member: &str) -> Result<bool, ReindexError> {
        Ok(self
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn remove(&self, key: &str, member: &str) -> Result<bool, ReindexError> {
        let removed = match self.sets.get_mut(key) {
            Some(mut set) => set.remove(member),
            None => false,
        };
        self.sets.remove_if(key, |_, set| set.is_empty());
        Ok(removed)
    }

    async fn cardinality(&self, key: &str) -> Result<u64, ReindexError> {
        Ok(self.sets.get(key).map(|set| set.len() as u64).unwrap_or(0))
    }
}

/// Registers and counts outstanding batches per index.
#[derive(Clone)]
pub struct BatchTracker {
    store: Arc<dyn SetStore>,
    namespace: String,
}

impl BatchTracker {
    /// Create a tracker writing under `namespace`.
    pub fn new(store: Arc<dyn SetStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Shared set key for `index_name`.
    pub fn set_key(&self, index_name: &str) -> String {
        format!("{}:reindex:{}:batches", self.namespace, index_name)
    }

    /// Mark `batch_id` as outstanding.
    pub async fn register(&self, index_name: &str, batch_id: u64) -> Result<(), ReindexError> {
        let added = self
            .store
            .add(&self.set_key(index_name), &batch_id.to_string())
            .await?;
        debug!(index = index_name, batch_id, added, "Registered batch");
        Ok(())
    }

    /// Mark `batch_id` as done.
    pub async fn deregister(&self, index_name: &str, batch_id: u64) -> Result<(), ReindexError> {
        let removed = self
            .store
            .remove(&self.set_key(index_name), &batch_id.to_string())
            .await?;
        debug!(index = index_name, batch_id, removed, "Deregistered batch");
        Ok(())
    }

    /// Batches still outstanding for `index_name`.
    pub async fn count(&self, index_name: &str) -> Result<u64, ReindexError> {
        self.store.cardinality(&self.set_key(index_name)).await
    }
}
