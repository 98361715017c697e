//! Record store contract.

use async_trait::async_trait;

use reindex_types::{Indexable, RecordIdentifier, ReindexError};

/// Shape of a dataset's primary key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpace {
    /// Orderable numeric keys with known bounds
    Numeric { min_id: i64, max_id: i64 },
    /// Numeric keys, but no rows
    Empty,
    /// String or otherwise opaque keys; only cursor iteration works
    Opaque,
}

/// Read access to the records of one entity type.
#[async_trait]
pub trait RecordSource<R: Indexable>: Send + Sync {
    /// Entity type name carried in job payloads.
    fn entity_type(&self) -> &str;

    /// Bounds of the primary key space.
    ///
    /// An error here is treated as "no bounds available" by the full
    /// reindex, which falls back to cursor iteration.
    async fn key_space(&self) -> Result<KeySpace, ReindexError>;

    /// All records in primary key order, optionally only those with a
    /// numeric id greater than `after_id`.
    async fn scan(
        &self,
        after_id: Option<i64>,
    ) -> Result<Box<dyn Iterator<Item = R> + Send>, ReindexError>;

    /// Records whose ids are in `ids`; missing ids are simply absent.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<R>, ReindexError>;

    /// Records with numeric ids in `[min_id, max_id]`.
    async fn find_in_range(&self, min_id: i64, max_id: i64) -> Result<Vec<R>, ReindexError>;

    /// Minimal record carrying only id and routing, used to delete a
    /// document whose record no longer exists.
    fn placeholder(&self, identifier: RecordIdentifier) -> R;
}
