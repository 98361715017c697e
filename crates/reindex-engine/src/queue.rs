//! Durable reindex queue contract and queue draining.
//!
//! Queue mode pushes records onto a per-index queue instead of writing
//! them. The queue stores encoded identifiers (`id` or `id|routing`); a
//! [`QueueProcessor`] later reserves them in batches and emits one batch job
//! per reservation, so eligibility is decided when the job runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use reindex_types::{Indexable, JobPayload, ReindexError};

use crate::runner::JobRunner;

/// Write side of the durable reindex queue.
#[async_trait]
pub trait ReindexQueue<R>: Send + Sync {
    /// Append records to the queue of `index`.
    async fn push_records(&self, index: &str, records: &[R]) -> Result<(), ReindexError>;
}

/// Read side of the durable reindex queue.
#[async_trait]
pub trait ReservableQueue: Send + Sync {
    /// Remove and return up to `limit` encoded identifiers, oldest first.
    async fn reserve(&self, index: &str, limit: usize) -> Result<Vec<String>, ReindexError>;

    /// Number of identifiers waiting for `index`.
    async fn len(&self, index: &str) -> Result<usize, ReindexError>;
}

/// In-process reindex queue.
#[derive(Debug, Default)]
pub struct MemoryReindexQueue {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryReindexQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything waiting for `index`.
    pub async fn clear(&self, index: &str) {
        self.queues.lock().await.remove(index);
    }
}

#[async_trait]
impl<R: Indexable> ReindexQueue<R> for MemoryReindexQueue {
    async fn push_records(&self, index: &str, records: &[R]) -> Result<(), ReindexError> {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(index.to_string()).or_default();
        queue.extend(records.iter().map(|record| record.identifier().encode()));
        debug!(index, pushed = records.len(), queued = queue.len(), "Pushed records");
        Ok(())
    }
}

#[async_trait]
impl ReservableQueue for MemoryReindexQueue {
    async fn reserve(&self, index: &str, limit: usize) -> Result<Vec<String>, ReindexError> {
        let mut queues = self.queues.lock().await;
        let Some(queue) = queues.get_mut(index) else {
            return Ok(Vec::new());
        };
        let take = limit.min(queue.len());
        Ok(queue.drain(..take).collect())
    }

    async fn len(&self, index: &str) -> Result<usize, ReindexError> {
        Ok(self
            .queues
            .lock()
            .await
            .get(index)
            .map(VecDeque::len)
            .unwrap_or(0))
    }
}

/// Turns queued identifiers into batch jobs.
pub struct QueueProcessor {
    queue: Arc<dyn ReservableQueue>,
    runner: Arc<dyn JobRunner>,
    batch_size: usize,
}

impl QueueProcessor {
    /// Create a processor reserving `batch_size` identifiers per job.
    pub fn new(queue: Arc<dyn ReservableQueue>, runner: Arc<dyn JobRunner>, batch_size: usize) -> Self {
        Self {
            queue,
            runner,
            batch_size: batch_size.max(1),
        }
    }

    /// Drain the queue of `index`, emitting one job per reserved batch.
    ///
    /// Returns the number of jobs emitted. Identifiers pushed while the
    /// drain runs are picked up in the same call.
    pub async fn process(&self, entity_type: &str, index: &str) -> Result<usize, ReindexError> {
        let mut jobs = 0;

        loop {
            let record_ids = self.queue.reserve(index, self.batch_size).await?;
            if record_ids.is_empty() {
                break;
            }
            let reserved = record_ids.len();
            self.runner
                .enqueue(JobPayload::for_ids(entity_type, index, record_ids))
                .await?;
            jobs += 1;
            debug!(index, reserved, "Emitted queue batch");

            if reserved < self.batch_size {
                break;
            }
        }

        info!(index, jobs, "Reindex queue drained");
        Ok(jobs)
    }
}
