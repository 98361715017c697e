//! Batch dispatch to the search index.
//!
//! One batch of records goes out through one of three modes:
//! - **Inline**: split by eligibility, then one bulk write and one bulk
//!   delete, each with a single retry on transient errors.
//! - **Async**: one job carrying the encoded identifiers of every record;
//!   the job re-resolves the records and comes back here inline.
//! - **Queue**: every record is pushed to the durable reindex queue as an
//!   encoded identifier; eligibility is checked by the jobs that drain it.

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use reindex_types::{DispatchMode, Indexable, JobPayload, ReindexError};

use crate::client::BulkClient;
use crate::queue::ReindexQueue;
use crate::retry::with_retry;
use crate::runner::JobRunner;

/// Per-call dispatch options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Update only the fields produced by this method instead of whole documents
    pub method_name: Option<String>,
    /// Partial updates never delete ineligible records
    pub partial: bool,
}

impl DispatchOptions {
    /// Full document writes with deletion of ineligible records.
    pub fn full() -> Self {
        Self::default()
    }

    /// Partial update through `method_name`.
    pub fn method(method_name: impl Into<String>) -> Self {
        Self {
            method_name: Some(method_name.into()),
            partial: true,
        }
    }

    /// Set whether this is a partial update.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }
}

/// Records split into writes and deletes.
#[derive(Debug)]
pub struct EligibilitySplit<R> {
    /// Records to write
    pub to_index: Vec<R>,
    /// Records to remove from the index
    pub to_delete: Vec<R>,
}

impl<R> Default for EligibilitySplit<R> {
    fn default() -> Self {
        Self {
            to_index: Vec::new(),
            to_delete: Vec::new(),
        }
    }
}

impl<R> EligibilitySplit<R> {
    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.to_index.is_empty() && self.to_delete.is_empty()
    }
}

/// Split `records` by eligibility, preserving order within each side.
///
/// With `partial` set every record is written and nothing is deleted.
pub fn split_by_eligibility<R: Indexable>(records: Vec<R>, partial: bool) -> EligibilitySplit<R> {
    if partial {
        return EligibilitySplit {
            to_index: records,
            to_delete: Vec::new(),
        };
    }

    let (to_index, to_delete) = records
        .into_iter()
        .partition(|record| record.is_eligible_for_index());
    EligibilitySplit { to_index, to_delete }
}

/// What one dispatch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Documents written (inline)
    pub indexed: usize,
    /// Documents deleted (inline)
    pub deleted: usize,
    /// Records handed off to the job runner or queue
    pub enqueued: usize,
}

impl DispatchOutcome {
    /// Merge another outcome into this one.
    pub fn merge(&mut self, other: &DispatchOutcome) {
        self.indexed += other.indexed;
        self.deleted += other.deleted;
        self.enqueued += other.enqueued;
    }

    /// Total records touched.
    pub fn total(&self) -> usize {
        self.indexed + self.deleted + self.enqueued
    }
}

/// Dispatches batches of one entity type to one index.
pub struct DispatchEngine<R> {
    index_name: String,
    entity_type: String,
    client: Arc<dyn BulkClient<R>>,
    runner: Option<Arc<dyn JobRunner>>,
    queue: Option<Arc<dyn ReindexQueue<R>>>,
}

impl<R: Indexable> DispatchEngine<R> {
    /// Create an engine that can dispatch inline.
    pub fn new(
        index_name: impl Into<String>,
        entity_type: impl Into<String>,
        client: Arc<dyn BulkClient<R>>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            entity_type: entity_type.into(),
            client,
            runner: None,
            queue: None,
        }
    }

    /// Enable async mode.
    pub fn with_runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Enable queue mode.
    pub fn with_queue(mut self, queue: Arc<dyn ReindexQueue<R>>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Target index.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Entity type written into job payloads.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Dispatch one batch.
    ///
    /// Async jobs carry `method_name` and `partial`, so the executor splits
    /// and writes exactly as inline mode would. Queue mode pushes every
    /// record, eligible or not, as its encoded identifier; eligibility is
    /// decided by the batch job emitted when the queue drains, which is where
    /// ineligible records get deleted.
    ///
    /// Invalid combinations (queue mode with a partial update method, or a
    /// mode whose collaborator is not configured) fail before any I/O.
    pub async fn dispatch(
        &self,
        records: Vec<R>,
        mode: DispatchMode,
        options: &DispatchOptions,
    ) -> Result<DispatchOutcome, ReindexError> {
        if mode == DispatchMode::Queue && options.method_name.is_some() {
            return Err(ReindexError::invalid_config(
                "partial reindex is not supported in queue mode",
            ));
        }

        match mode {
            DispatchMode::Inline => {
                let split = split_by_eligibility(records, options.partial);
                self.write(split, options.method_name.as_deref()).await
            }
            DispatchMode::Async => {
                let runner = self.runner.as_ref().ok_or_else(|| {
                    ReindexError::invalid_config("async mode requires a job runner")
                })?;
                self.enqueue_job(runner.as_ref(), &records, options).await
            }
            DispatchMode::Queue => {
                let queue = self.queue.as_ref().ok_or_else(|| {
                    ReindexError::invalid_config("queue mode requires a reindex queue")
                })?;
                if records.is_empty() {
                    return Ok(DispatchOutcome::default());
                }
                queue.push_records(&self.index_name, &records).await?;
                debug!(index = %self.index_name, count = records.len(), "Queued records");
                Ok(DispatchOutcome {
                    enqueued: records.len(),
                    ..Default::default()
                })
            }
        }
    }

    /// Write an already split batch inline.
    ///
    /// Both bulk calls run inside one `bulk_dispatch` span.
    pub async fn write(
        &self,
        split: EligibilitySplit<R>,
        method_name: Option<&str>,
    ) -> Result<DispatchOutcome, ReindexError> {
        if split.is_empty() {
            return Ok(DispatchOutcome::default());
        }

        let span = info_span!(
            "bulk_dispatch",
            index = %self.index_name,
            to_index = split.to_index.len(),
            to_delete = split.to_delete.len(),
        );

        async {
            let mut outcome = DispatchOutcome::default();

            if !split.to_index.is_empty() {
                let response = match method_name {
                    Some(method) => {
                        with_retry("bulk_update", || {
                            self.client
                                .bulk_update(&self.index_name, &split.to_index, method)
                        })
                        .await?
                    }
                    None => {
                        with_retry("bulk_index", || {
                            self.client.bulk_index(&self.index_name, &split.to_index)
                        })
                        .await?
                    }
                };
                outcome.indexed = response.into_result(&self.index_name)?;
            }

            if !split.to_delete.is_empty() {
                let response = with_retry("bulk_delete", || {
                    self.client.bulk_delete(&self.index_name, &split.to_delete)
                })
                .await?;
                outcome.deleted = response.into_result(&self.index_name)?;
            }

            debug!(
                indexed = outcome.indexed,
                deleted = outcome.deleted,
                "Bulk dispatch complete"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn enqueue_job(
        &self,
        runner: &dyn JobRunner,
        records: &[R],
        options: &DispatchOptions,
    ) -> Result<DispatchOutcome, ReindexError> {
        if records.is_empty() {
            return Ok(DispatchOutcome::default());
        }

        let record_ids: Vec<String> = records
            .iter()
            .map(|record| record.identifier().encode())
            .collect();
        let job = JobPayload::for_ids(&self.entity_type, &self.index_name, record_ids)
            .with_method_name(options.method_name.clone())
            .with_partial(options.partial);

        info!(
            index = %self.index_name,
            job_id = %job.job_id,
            count = records.len(),
            "Enqueued batch job"
        );
        runner.enqueue(job).await?;

        Ok(DispatchOutcome {
            enqueued: records.len(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::client::{BulkItemFailure, BulkResponse};
    use crate::queue::MemoryReindexQueue;
    use crate::runner::MemoryJobRunner;
    use reindex_types::{BatchSelection, ClientError, RecordIdentifier};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Doc {
        pub id: u64,
        pub eligible: bool,
        pub routing: Option<String>,
    }

    impl Doc {
        pub fn new(id: u64, eligible: bool) -> Self {
            Self {
                id,
                eligible,
                routing: None,
            }
        }
    }

    impl Indexable for Doc {
        fn search_id(&self) -> String {
            self.id.to_string()
        }

        fn is_eligible_for_index(&self) -> bool {
            self.eligible
        }

        fn search_routing(&self) -> Option<String> {
            self.routing.clone()
        }
    }

    /// Records every bulk call; optionally fails the first N calls.
    #[derive(Default)]
    pub(crate) struct RecordingClient {
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
        pub transient_failures: AtomicUsize,
        pub reject_ids: Mutex<Vec<String>>,
        pub document_count: AtomicUsize,
    }

    impl RecordingClient {
        pub fn failing_transiently(times: usize) -> Self {
            let client = Self::default();
            client.transient_failures.store(times, Ordering::SeqCst);
            client
        }

        pub fn call_log(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        fn record<R: Indexable>(&self, op: String, records: &[R]) -> Result<BulkResponse, ClientError> {
            let ids: Vec<String> = records.iter().map(|r| r.search_id()).collect();
            self.calls.lock().unwrap().push((op, ids.clone()));

            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(ClientError::Transient("connection reset".to_string()));
            }

            let rejected = self.reject_ids.lock().unwrap().clone();
            let failures: Vec<BulkItemFailure> = ids
                .iter()
                .filter(|id| rejected.contains(id))
                .map(|id| BulkItemFailure {
                    id: id.clone(),
                    reason: "rejected".to_string(),
                })
                .collect();
            Ok(BulkResponse {
                succeeded: ids.len() - failures.len(),
                failures,
            })
        }
    }

    #[async_trait]
    impl<R: Indexable> BulkClient<R> for RecordingClient {
        async fn bulk_index(&self, _index: &str, records: &[R]) -> Result<BulkResponse, ClientError> {
            self.record("index".to_string(), records)
        }

        async fn bulk_update(
            &self,
            _index: &str,
            records: &[R],
            method_name: &str,
        ) -> Result<BulkResponse, ClientError> {
            self.record(format!("update:{method_name}"), records)
        }

        async fn bulk_delete(&self, _index: &str, records: &[R]) -> Result<BulkResponse, ClientError> {
            self.record("delete".to_string(), records)
        }

        async fn document_count(&self, _index: &str) -> Result<u64, ClientError> {
            Ok(self.document_count.load(Ordering::SeqCst) as u64)
        }
    }

    fn abc() -> Vec<Doc> {
        vec![Doc::new(1, true), Doc::new(2, false), Doc::new(3, true)]
    }

    #[test]
    fn test_split_by_eligibility() {
        let split = split_by_eligibility(abc(), false);
        let to_index: Vec<u64> = split.to_index.iter().map(|d| d.id).collect();
        let to_delete: Vec<u64> = split.to_delete.iter().map(|d| d.id).collect();
        assert_eq!(to_index, vec![1, 3]);
        assert_eq!(to_delete, vec![2]);
    }

    #[test]
    fn test_partial_split_never_deletes() {
        let split = split_by_eligibility(abc(), true);
        assert_eq!(split.to_index.len(), 3);
        assert!(split.to_delete.is_empty());
    }

    #[test]
    fn test_dispatch_options() {
        let options = DispatchOptions::method("search_prices");
        assert_eq!(options.method_name.as_deref(), Some("search_prices"));
        assert!(options.partial);
        assert!(!options.with_partial(false).partial);
        assert_eq!(DispatchOptions::full(), DispatchOptions::default());
    }

    #[test]
    fn test_outcome_merge() {
        let mut total = DispatchOutcome {
            indexed: 2,
            deleted: 1,
            enqueued: 0,
        };
        total.merge(&DispatchOutcome {
            indexed: 3,
            deleted: 0,
            enqueued: 4,
        });
        assert_eq!(total.indexed, 5);
        assert_eq!(total.deleted, 1);
        assert_eq!(total.enqueued, 4);
        assert_eq!(total.total(), 10);
    }

    #[tokio::test]
    async fn test_inline_index_and_delete() {
        let client = Arc::new(RecordingClient::default());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let outcome = engine
            .dispatch(abc(), DispatchMode::Inline, &DispatchOptions::full())
            .await
            .unwrap();

        assert_eq!(outcome.indexed, 2);
        assert_eq!(outcome.deleted, 1);
        assert_eq!(
            client.call_log(),
            vec![
                ("index".to_string(), vec!["1".to_string(), "3".to_string()]),
                ("delete".to_string(), vec!["2".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_inline_partial_update() {
        let client = Arc::new(RecordingClient::default());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let outcome = engine
            .dispatch(abc(), DispatchMode::Inline, &DispatchOptions::method("search_prices"))
            .await
            .unwrap();

        assert_eq!(outcome.indexed, 3);
        assert_eq!(outcome.deleted, 0);
        let log = client.call_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "update:search_prices");
    }

    #[tokio::test]
    async fn test_inline_empty_batch_makes_no_calls() {
        let client = Arc::new(RecordingClient::default());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let outcome = engine
            .dispatch(Vec::<Doc>::new(), DispatchMode::Inline, &DispatchOptions::full())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::default());
        assert!(client.call_log().is_empty());
    }

    #[tokio::test]
    async fn test_inline_retries_transient_once() {
        let client = Arc::new(RecordingClient::failing_transiently(1));
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let outcome = engine
            .dispatch(vec![Doc::new(1, true)], DispatchMode::Inline, &DispatchOptions::full())
            .await
            .unwrap();

        assert_eq!(outcome.indexed, 1);
        assert_eq!(client.call_log().len(), 2);
    }

    #[tokio::test]
    async fn test_inline_propagates_second_transient() {
        let client = Arc::new(RecordingClient::failing_transiently(2));
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let err = engine
            .dispatch(vec![Doc::new(1, true)], DispatchMode::Inline, &DispatchOptions::full())
            .await
            .unwrap_err();

        assert!(matches!(err, ReindexError::Client(ClientError::Transient(_))));
        assert_eq!(client.call_log().len(), 2);
    }

    #[tokio::test]
    async fn test_inline_item_failures_surface() {
        let client = Arc::new(RecordingClient::default());
        client.reject_ids.lock().unwrap().push("3".to_string());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone());

        let err = engine
            .dispatch(abc(), DispatchMode::Inline, &DispatchOptions::full())
            .await
            .unwrap_err();

        assert!(matches!(err, ReindexError::Import { failed: 1, .. }));
        // delete is not attempted once the write batch failed
        assert_eq!(client.call_log().len(), 1);
    }

    #[tokio::test]
    async fn test_async_enqueues_encoded_ids() {
        let client = Arc::new(RecordingClient::default());
        let runner = Arc::new(MemoryJobRunner::new());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone())
            .with_runner(runner.clone());

        let mut docs = abc();
        docs[1].routing = Some("eu|west".to_string());
        let outcome = engine
            .dispatch(docs, DispatchMode::Async, &DispatchOptions::full())
            .await
            .unwrap();

        assert_eq!(outcome.enqueued, 3);
        assert!(client.call_log().is_empty());

        let jobs = runner.take().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_entity_type, "Product");
        assert_eq!(jobs[0].index_name, "products");
        assert_eq!(
            jobs[0].selection,
            BatchSelection::Ids {
                record_ids: vec!["1".to_string(), "2|eu||west".to_string(), "3".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_async_carries_method_name() {
        let runner = Arc::new(MemoryJobRunner::new());
        let engine = DispatchEngine::<Doc>::new("products", "Product", Arc::new(RecordingClient::default()))
            .with_runner(runner.clone());

        engine
            .dispatch(abc(), DispatchMode::Async, &DispatchOptions::method("search_prices"))
            .await
            .unwrap();

        let jobs = runner.take().await;
        assert_eq!(jobs[0].method_name.as_deref(), Some("search_prices"));
        assert!(jobs[0].partial);
    }

    #[tokio::test]
    async fn test_async_carries_partial_without_method() {
        let runner = Arc::new(MemoryJobRunner::new());
        let engine = DispatchEngine::<Doc>::new("products", "Product", Arc::new(RecordingClient::default()))
            .with_runner(runner.clone());

        engine
            .dispatch(abc(), DispatchMode::Async, &DispatchOptions::full().with_partial(true))
            .await
            .unwrap();
        engine
            .dispatch(
                abc(),
                DispatchMode::Async,
                &DispatchOptions::method("search_prices").with_partial(false),
            )
            .await
            .unwrap();

        let jobs = runner.take().await;
        assert!(jobs[0].partial);
        assert!(jobs[0].method_name.is_none());
        assert!(!jobs[1].partial);
        assert_eq!(jobs[1].method_name.as_deref(), Some("search_prices"));
    }

    #[tokio::test]
    async fn test_queue_pushes_records() {
        let client = Arc::new(RecordingClient::default());
        let queue = Arc::new(MemoryReindexQueue::new());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone())
            .with_queue(queue.clone());

        let outcome = engine
            .dispatch(abc(), DispatchMode::Queue, &DispatchOptions::full())
            .await
            .unwrap();

        assert_eq!(outcome.enqueued, 3);
        assert!(client.call_log().is_empty());
        assert_eq!(
            crate::queue::ReservableQueue::len(queue.as_ref(), "products")
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_queue_with_method_rejected_before_io() {
        let client = Arc::new(RecordingClient::default());
        let queue = Arc::new(MemoryReindexQueue::new());
        let engine = DispatchEngine::<Doc>::new("products", "Product", client.clone())
            .with_queue(queue.clone());

        let err = engine
            .dispatch(abc(), DispatchMode::Queue, &DispatchOptions::method("search_prices"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReindexError::InvalidConfig(_)));
        assert!(client.call_log().is_empty());
        assert_eq!(
            crate::queue::ReservableQueue::len(queue.as_ref(), "products")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_missing_collaborators_are_invalid_config() {
        let engine =
            DispatchEngine::<Doc>::new("products", "Product", Arc::new(RecordingClient::default()));

        let err = engine
            .dispatch(abc(), DispatchMode::Async, &DispatchOptions::full())
            .await
            .unwrap_err();
        assert!(matches!(err, ReindexError::InvalidConfig(_)));

        let err = engine
            .dispatch(abc(), DispatchMode::Queue, &DispatchOptions::full())
            .await
            .unwrap_err();
        assert!(matches!(err, ReindexError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_placeholders_delete_with_routing() {
        let client = Arc::new(RecordingClient::default());
        let engine = DispatchEngine::<RecordIdentifier>::new("products", "Product", client.clone());

        let outcome = engine
            .dispatch(
                vec![RecordIdentifier::with_routing("8", "eu")],
                DispatchMode::Inline,
                &DispatchOptions::full(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 1);
        assert_eq!(client.call_log()[0].0, "delete");
    }
}
