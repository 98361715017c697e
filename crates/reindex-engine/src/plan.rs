//! Job planning for full reindexes.
//!
//! Pure functions from a partitioning decision to the job payloads that
//! would be emitted. Registration and enqueueing happen in the
//! orchestrator; nothing here performs I/O.

use reindex_types::JobPayload;

use crate::partition::{partition_by_range, partition_by_size};

/// How a full reindex partitions its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Numeric primary key windows
    Range,
    /// Fixed-size batches from a cursor over the source
    Cursor,
    /// Nothing to do (no rows, or resume watermark past the last id)
    Skipped,
}

impl PartitionStrategy {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStrategy::Range => "range",
            PartitionStrategy::Cursor => "cursor",
            PartitionStrategy::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One range job per window of `[min_id, max_id]`, batch ids from 1.
///
/// A `method_name` makes every job a partial update.
pub fn plan_range_jobs<'a>(
    entity_type: &'a str,
    index_name: &'a str,
    min_id: i64,
    max_id: i64,
    batch_size: usize,
    method_name: Option<&'a str>,
) -> impl Iterator<Item = JobPayload> + 'a {
    partition_by_range(min_id, max_id, batch_size).map(move |range| {
        JobPayload::for_range(entity_type, index_name, range.lo, range.hi)
            .with_batch_id(range.batch_id())
            .with_method_name(method_name.map(str::to_string))
            .with_partial(method_name.is_some())
    })
}

/// One id-list job per `batch_size` encoded identifiers, batch ids from 1.
pub fn plan_cursor_jobs<'a, I>(
    entity_type: &'a str,
    index_name: &'a str,
    record_ids: I,
    batch_size: usize,
    method_name: Option<&'a str>,
) -> impl Iterator<Item = JobPayload> + 'a
where
    I: IntoIterator<Item = String>,
    I::IntoIter: 'a,
{
    partition_by_size(record_ids, batch_size)
        .enumerate()
        .map(move |(position, batch)| {
            JobPayload::for_ids(entity_type, index_name, batch)
                .with_batch_id(position as u64 + 1)
                .with_method_name(method_name.map(str::to_string))
            .with_partial(method_name.is_some())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_types::BatchSelection;

    #[test]
    fn test_plan_range_jobs() {
        let jobs: Vec<JobPayload> =
            plan_range_jobs("Product", "products", 1, 2500, 1000, None).collect();

        assert_eq!(jobs.len(), 3);
        let batch_ids: Vec<Option<u64>> = jobs.iter().map(|j| j.batch_id).collect();
        assert_eq!(batch_ids, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(
            jobs[2].selection,
            BatchSelection::Range {
                min_id: 2001,
                max_id: 3000
            }
        );
        assert!(jobs.iter().all(|j| j.index_name == "products"));
        assert!(jobs.iter().all(|j| !j.partial));
    }

    #[test]
    fn test_plan_cursor_jobs() {
        let ids = (1..=5).map(|i| format!("sku-{i}"));
        let jobs: Vec<JobPayload> =
            plan_cursor_jobs("Product", "products", ids, 2, Some("search_prices")).collect();

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].batch_id, Some(1));
        assert_eq!(jobs[2].batch_id, Some(3));
        assert_eq!(
            jobs[2].selection,
            BatchSelection::Ids {
                record_ids: vec!["sku-5".to_string()]
            }
        );
        assert!(jobs
            .iter()
            .all(|j| j.method_name.as_deref() == Some("search_prices") && j.partial));
    }

    #[test]
    fn test_plan_empty_cursor() {
        let jobs: Vec<JobPayload> =
            plan_cursor_jobs("Product", "products", Vec::new(), 10, None).collect();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(PartitionStrategy::Range.to_string(), "range");
        assert_eq!(PartitionStrategy::Cursor.to_string(), "cursor");
        assert_eq!(PartitionStrategy::Skipped.to_string(), "skipped");
    }
}
