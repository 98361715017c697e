//! # reindex-engine
//!
//! Bulk reindexing of application records into a search engine.
//!
//! The crate partitions a record set into batches, dispatches each batch
//! inline, as a background job, or onto a durable queue, and tracks the
//! batches of an asynchronous full reindex until they complete.
//!
//! ## Layers
//!
//! - [`partition`] and [`plan`]: pure batch and job planning, no I/O
//! - [`dispatch`]: one batch out through a [`reindex_types::DispatchMode`]
//! - [`job`]: execution of one batch job handed back by the runner
//! - [`orchestrator`]: full reindex of one entity type
//! - [`tracker`]: outstanding batch ids per index
//!
//! Collaborators (search client, record store, job runner, reindex queue,
//! shared set store) are traits; in-memory implementations are provided for
//! the runner, queue and set store.

pub mod client;
pub mod dispatch;
pub mod job;
pub mod orchestrator;
pub mod partition;
pub mod plan;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod source;
pub mod tracker;

pub use client::{BulkClient, BulkItemFailure, BulkResponse};
pub use dispatch::{
    split_by_eligibility, DispatchEngine, DispatchOptions, DispatchOutcome, EligibilitySplit,
};
pub use job::BatchJobExecutor;
pub use orchestrator::{FullReindex, FullReindexReport, ReindexOptions};
pub use partition::{
    batch_count, partition_by_range, partition_by_size, resume_lower_bound, RangeBatch,
};
pub use plan::{plan_cursor_jobs, plan_range_jobs, PartitionStrategy};
pub use queue::{MemoryReindexQueue, QueueProcessor, ReindexQueue, ReservableQueue};
pub use retry::{with_retry, MAX_ATTEMPTS};
pub use runner::{JobRunner, MemoryJobRunner};
pub use source::{KeySpace, RecordSource};
pub use tracker::{BatchTracker, MemorySetStore, SetStore};
