//! Full reindex of one entity type into one index.
//!
//! The orchestrator picks a partitioning strategy from the source's key
//! space, then either emits one tracked batch job per partition
//! ([`FullReindex::run_async`]) or loads and writes each partition itself
//! ([`FullReindex::run_inline`]).
//!
//! Runs are sequential. Jobs emitted by one run are independent of each
//! other and may execute in any order, more than once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use reindex_types::{DispatchMode, Indexable, JobPayload, ReindexError, DEFAULT_BATCH_SIZE};

use crate::client::BulkClient;
use crate::dispatch::{DispatchEngine, DispatchOptions, DispatchOutcome};
use crate::partition::{partition_by_range, partition_by_size, resume_lower_bound};
use crate::plan::{plan_cursor_jobs, plan_range_jobs, PartitionStrategy};
use crate::retry::with_retry;
use crate::runner::JobRunner;
use crate::source::{KeySpace, RecordSource};
use crate::tracker::BatchTracker;

/// Options for one full reindex run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexOptions {
    /// Skip what the index already holds, using its document count as the
    /// last indexed id
    pub resume: bool,
    /// Partial update method; `None` writes whole documents
    pub method_name: Option<String>,
}

impl ReindexOptions {
    /// Enable or disable resuming.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Run as a partial update through `method_name`.
    pub fn with_method_name(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }

    fn dispatch_options(&self) -> DispatchOptions {
        match &self.method_name {
            Some(method) => DispatchOptions::method(method.clone()),
            None => DispatchOptions::full(),
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullReindexReport {
    /// How the source was partitioned
    pub strategy: PartitionStrategy,
    /// Batches emitted (async) or written (inline)
    pub batches: u64,
    /// Documents written and deleted; only populated by inline runs
    pub outcome: DispatchOutcome,
}

impl FullReindexReport {
    fn skipped() -> Self {
        Self {
            strategy: PartitionStrategy::Skipped,
            batches: 0,
            outcome: DispatchOutcome::default(),
        }
    }
}

/// Full reindex driver for one entity type.
pub struct FullReindex<R: Indexable> {
    source: Arc<dyn RecordSource<R>>,
    client: Arc<dyn BulkClient<R>>,
    tracker: BatchTracker,
    runner: Option<Arc<dyn JobRunner>>,
    batch_size: usize,
}

impl<R: Indexable + 'static> FullReindex<R> {
    /// Create a driver that can run inline.
    pub fn new(
        source: Arc<dyn RecordSource<R>>,
        client: Arc<dyn BulkClient<R>>,
        tracker: BatchTracker,
    ) -> Self {
        Self {
            source,
            client,
            tracker,
            runner: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Enable [`FullReindex::run_async`].
    pub fn with_runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Records per batch; 0 is treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Records per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Emit one tracked batch job per partition of the source.
    ///
    /// Every batch id is registered before its job is enqueued, so a job
    /// that finishes early never deregisters an id that was not yet added.
    pub async fn run_async(
        &self,
        index_name: &str,
        options: &ReindexOptions,
    ) -> Result<FullReindexReport, ReindexError> {
        let runner = self.runner.as_ref().ok_or_else(|| {
            ReindexError::invalid_config("asynchronous full reindex requires a job runner")
        })?;
        let entity_type = self.source.entity_type();
        let watermark = self.watermark(index_name, options).await?;
        let method_name = options.method_name.as_deref();

        info!(
            index = index_name,
            entity = entity_type,
            batch_size = self.batch_size,
            resume = options.resume,
            "Starting asynchronous full reindex"
        );

        let mut batches = 0u64;
        let strategy = match self.key_space(index_name).await {
            KeySpace::Numeric { min_id, max_id } => {
                let Some(lo) = lower_bound(min_id, max_id, watermark) else {
                    info!(index = index_name, "Nothing left to reindex");
                    return Ok(FullReindexReport::skipped());
                };
                let jobs = plan_range_jobs(
                    entity_type,
                    index_name,
                    lo,
                    max_id,
                    self.batch_size,
                    method_name,
                );
                for job in jobs {
                    self.emit(runner.as_ref(), job).await?;
                    batches += 1;
                }
                PartitionStrategy::Range
            }
            KeySpace::Empty => {
                info!(index = index_name, "Source is empty");
                return Ok(FullReindexReport::skipped());
            }
            KeySpace::Opaque => {
                let records = self.source.scan(after_id(watermark)).await?;
                let record_ids = records.map(|record| record.identifier().encode());
                let jobs = plan_cursor_jobs(
                    entity_type,
                    index_name,
                    record_ids,
                    self.batch_size,
                    method_name,
                );
                for job in jobs {
                    self.emit(runner.as_ref(), job).await?;
                    batches += 1;
                }
                PartitionStrategy::Cursor
            }
        };

        info!(
            index = index_name,
            strategy = %strategy,
            batches,
            "Full reindex jobs enqueued"
        );
        Ok(FullReindexReport {
            strategy,
            batches,
            outcome: DispatchOutcome::default(),
        })
    }

    /// Load and write every partition of the source in this task.
    ///
    /// The tracker is not used; the returned report carries the totals.
    pub async fn run_inline(
        &self,
        index_name: &str,
        options: &ReindexOptions,
    ) -> Result<FullReindexReport, ReindexError> {
        let engine =
            DispatchEngine::new(index_name, self.source.entity_type(), self.client.clone());
        let dispatch_options = options.dispatch_options();
        let watermark = self.watermark(index_name, options).await?;

        info!(
            index = index_name,
            entity = self.source.entity_type(),
            batch_size = self.batch_size,
            resume = options.resume,
            "Starting inline full reindex"
        );

        let mut batches = 0u64;
        let mut outcome = DispatchOutcome::default();
        let strategy = match self.key_space(index_name).await {
            KeySpace::Numeric { min_id, max_id } => {
                let Some(lo) = lower_bound(min_id, max_id, watermark) else {
                    info!(index = index_name, "Nothing left to reindex");
                    return Ok(FullReindexReport::skipped());
                };
                for range in partition_by_range(lo, max_id, self.batch_size) {
                    let records = self.source.find_in_range(range.lo, range.hi).await?;
                    let written = engine
                        .dispatch(records, DispatchMode::Inline, &dispatch_options)
                        .await?;
                    debug!(
                        index = index_name,
                        batch_id = range.batch_id(),
                        lo = range.lo,
                        hi = range.hi,
                        "Range batch written"
                    );
                    outcome.merge(&written);
                    batches += 1;
                }
                PartitionStrategy::Range
            }
            KeySpace::Empty => {
                info!(index = index_name, "Source is empty");
                return Ok(FullReindexReport::skipped());
            }
            KeySpace::Opaque => {
                let records = self.source.scan(after_id(watermark)).await?;
                for batch in partition_by_size(records, self.batch_size) {
                    let written = engine
                        .dispatch(batch, DispatchMode::Inline, &dispatch_options)
                        .await?;
                    outcome.merge(&written);
                    batches += 1;
                }
                PartitionStrategy::Cursor
            }
        };

        info!(
            index = index_name,
            strategy = %strategy,
            batches,
            indexed = outcome.indexed,
            deleted = outcome.deleted,
            "Inline full reindex complete"
        );
        Ok(FullReindexReport {
            strategy,
            batches,
            outcome,
        })
    }

    /// Batches of the last asynchronous run that have not completed.
    pub async fn batches_left(&self, index_name: &str) -> Result<u64, ReindexError> {
        self.tracker.count(index_name).await
    }

    /// Key space of the source; lookup failures mean cursor iteration.
    async fn key_space(&self, index_name: &str) -> KeySpace {
        match self.source.key_space().await {
            Ok(key_space) => key_space,
            Err(e) => {
                warn!(
                    index = index_name,
                    error = %e,
                    "Key bounds unavailable, falling back to cursor iteration"
                );
                KeySpace::Opaque
            }
        }
    }

    /// Indexed document count when resuming.
    async fn watermark(
        &self,
        index_name: &str,
        options: &ReindexOptions,
    ) -> Result<Option<u64>, ReindexError> {
        if !options.resume {
            return Ok(None);
        }
        let count = with_retry("document_count", || self.client.document_count(index_name)).await?;
        debug!(index = index_name, count, "Resume watermark");
        Ok(Some(count))
    }

    async fn emit(&self, runner: &dyn JobRunner, job: JobPayload) -> Result<(), ReindexError> {
        if let Some(batch_id) = job.batch_id {
            self.tracker.register(&job.index_name, batch_id).await?;
        }
        debug!(
            index = %job.index_name,
            job_id = %job.job_id,
            batch_id = ?job.batch_id,
            size = job.selection.len(),
            "Enqueueing batch job"
        );
        runner.enqueue(job).await
    }
}

fn lower_bound(min_id: i64, max_id: i64, watermark: Option<u64>) -> Option<i64> {
    match watermark {
        Some(count) => resume_lower_bound(min_id, max_id, count),
        None if min_id <= max_id => Some(min_id),
        None => None,
    }
}

fn after_id(watermark: Option<u64>) -> Option<i64> {
    watermark.map(|count| i64::try_from(count).unwrap_or(i64::MAX))
}
