//! Job runner contract.
//!
//! The background job substrate is external. Delivery is assumed to be
//! at-least-once, unordered, and concurrent across workers.

use async_trait::async_trait;
use tokio::sync::Mutex;

use reindex_types::{JobPayload, ReindexError};

/// Fire-and-forget hand-off of batch jobs.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Enqueue one job for later execution.
    async fn enqueue(&self, job: JobPayload) -> Result<(), ReindexError>;
}

/// Runner that keeps jobs in memory until they are taken.
///
/// Used for dry-run planning and for tests that execute jobs by hand.
#[derive(Debug, Default)]
pub struct MemoryJobRunner {
    jobs: Mutex<Vec<JobPayload>>,
}

impl MemoryJobRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every enqueued job, oldest first.
    pub async fn take(&self) -> Vec<JobPayload> {
        std::mem::take(&mut *self.jobs.lock().await)
    }

    /// Number of jobs waiting.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether no jobs are waiting.
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[async_trait]
impl JobRunner for MemoryJobRunner {
    async fn enqueue(&self, job: JobPayload) -> Result<(), ReindexError> {
        self.jobs.lock().await.push(job);
        Ok(())
    }
}
