//! Bulk search client contract.
//!
//! The transport to the search engine is external; the engine only needs
//! the three bulk calls, a document count, and the transient/non-transient
//! error split of [`ClientError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use reindex_types::{ClientError, ReindexError};

/// One document the search engine rejected inside an otherwise successful
/// bulk call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    /// Document id
    pub id: String,
    /// Engine-supplied reason
    pub reason: String,
}

/// Result of one bulk call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Documents the engine acknowledged
    pub succeeded: usize,
    /// Documents the engine rejected
    #[serde(default)]
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResponse {
    /// Response where every document was acknowledged.
    pub fn ok(succeeded: usize) -> Self {
        Self {
            succeeded,
            failures: Vec::new(),
        }
    }

    /// Whether any document was rejected.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Turn item-level rejections into an import error for `index`.
    pub fn into_result(self, index: &str) -> Result<usize, ReindexError> {
        match self.failures.first() {
            None => Ok(self.succeeded),
            Some(first) => Err(ReindexError::Import {
                index: index.to_string(),
                failed: self.failures.len(),
                first_reason: first.reason.clone(),
            }),
        }
    }
}

/// Bulk write operations against a search index.
///
/// Implementations own record serialization; the engine passes records
/// through untouched.
#[async_trait]
pub trait BulkClient<R>: Send + Sync {
    /// Write full documents.
    async fn bulk_index(&self, index: &str, records: &[R]) -> Result<BulkResponse, ClientError>;

    /// Write only the fields produced by `method_name`.
    async fn bulk_update(
        &self,
        index: &str,
        records: &[R],
        method_name: &str,
    ) -> Result<BulkResponse, ClientError>;

    /// Delete documents by id and routing.
    async fn bulk_delete(&self, index: &str, records: &[R]) -> Result<BulkResponse, ClientError>;

    /// Number of documents currently in the index.
    async fn document_count(&self, index: &str) -> Result<u64, ClientError>;
}
