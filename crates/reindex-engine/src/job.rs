//! Inline execution of one batch job.
//!
//! The job runner hands a [`JobPayload`] back to this layer. Records are
//! re-resolved from the source (so eligibility reflects the data at
//! execution time) and written inline. Ids whose records are gone become
//! placeholders that are deleted by id and routing.
//!
//! On success the job removes its batch id from the pending set. On failure
//! the id stays registered and the error goes back to the runner.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use reindex_types::{BatchSelection, Indexable, JobPayload, RecordIdentifier, ReindexError};

use crate::dispatch::{split_by_eligibility, DispatchEngine, DispatchOutcome};
use crate::source::RecordSource;
use crate::tracker::BatchTracker;

/// Runs batch jobs for one index.
pub struct BatchJobExecutor<R: Indexable> {
    source: Arc<dyn RecordSource<R>>,
    engine: Arc<DispatchEngine<R>>,
    tracker: Option<BatchTracker>,
}

impl<R: Indexable> BatchJobExecutor<R> {
    /// Create an executor writing through `engine`.
    pub fn new(source: Arc<dyn RecordSource<R>>, engine: Arc<DispatchEngine<R>>) -> Self {
        Self {
            source,
            engine,
            tracker: None,
        }
    }

    /// Deregister completed batches from `tracker`.
    pub fn with_tracker(mut self, tracker: BatchTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Execute one job inline.
    pub async fn execute(&self, job: &JobPayload) -> Result<DispatchOutcome, ReindexError> {
        if job.index_name != self.engine.index_name() {
            return Err(ReindexError::invalid_config(format!(
                "job for index {} sent to executor for {}",
                job.index_name,
                self.engine.index_name()
            )));
        }

        let partial = job.partial;
        let (records, missing) = self.resolve(&job.selection).await?;
        debug!(
            job_id = %job.job_id,
            found = records.len(),
            missing = missing.len(),
            "Resolved batch records"
        );

        let mut split = split_by_eligibility(records, partial);
        if !partial {
            split.to_delete.extend(
                missing
                    .into_iter()
                    .map(|identifier| self.source.placeholder(identifier)),
            );
        }

        let outcome = self.engine.write(split, job.method_name.as_deref()).await?;

        if let (Some(batch_id), Some(tracker)) = (job.batch_id, &self.tracker) {
            tracker.deregister(&job.index_name, batch_id).await?;
        }

        info!(
            job_id = %job.job_id,
            index = %job.index_name,
            batch_id = ?job.batch_id,
            indexed = outcome.indexed,
            deleted = outcome.deleted,
            "Batch job complete"
        );
        Ok(outcome)
    }

    /// Load the records a selection covers, plus identifiers with no record.
    async fn resolve(
        &self,
        selection: &BatchSelection,
    ) -> Result<(Vec<R>, Vec<RecordIdentifier>), ReindexError> {
        match selection {
            BatchSelection::Range { min_id, max_id } => {
                let records = self.source.find_in_range(*min_id, *max_id).await?;
                Ok((records, Vec::new()))
            }
            BatchSelection::Ids { record_ids } => {
                let identifiers: Vec<RecordIdentifier> = record_ids
                    .iter()
                    .map(|encoded| RecordIdentifier::decode(encoded))
                    .collect();
                let ids: Vec<String> = identifiers.iter().map(|i| i.id.clone()).collect();

                let records = self.source.find_by_ids(&ids).await?;
                let found: HashSet<String> = records.iter().map(|r| r.search_id()).collect();
                let missing = identifiers
                    .into_iter()
                    .filter(|identifier| !found.contains(&identifier.id))
                    .collect();

                Ok((records, missing))
            }
        }
    }
}
