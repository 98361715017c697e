//! Batch job payloads handed to the job runner.
//!
//! A payload names either an explicit list of encoded record identifiers or
//! a numeric id range; records are re-resolved when the job executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::ReindexError;

/// Which records a batch job covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchSelection {
    /// Encoded identifiers (`id` or `id|routing`)
    Ids { record_ids: Vec<String> },
    /// Inclusive numeric primary key range
    Range { min_id: i64, max_id: i64 },
}

impl BatchSelection {
    /// Number of explicit ids, or the width of the range.
    pub fn len(&self) -> u64 {
        match self {
            BatchSelection::Ids { record_ids } => record_ids.len() as u64,
            BatchSelection::Range { min_id, max_id } => {
                if max_id < min_id {
                    0
                } else {
                    max_id.abs_diff(*min_id).saturating_add(1)
                }
            }
        }
    }

    /// Whether the selection covers nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One unit of deferred work for the job runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Unique id for this emission
    pub job_id: Ulid,

    /// Record type the ids belong to
    pub target_entity_type: String,

    /// Index the batch is written to
    pub index_name: String,

    /// Pending-set member to remove on completion (full reindex only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<u64>,

    /// Records covered by this job
    pub selection: BatchSelection,

    /// Partial update method, if this is not a full document write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,

    /// Partial update: write every record and never delete
    #[serde(default)]
    pub partial: bool,

    /// Emission time (milliseconds since epoch for JSON compatibility)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
}

impl JobPayload {
    /// Job over explicit encoded record identifiers.
    pub fn for_ids(
        target_entity_type: impl Into<String>,
        index_name: impl Into<String>,
        record_ids: Vec<String>,
    ) -> Self {
        Self::new(
            target_entity_type.into(),
            index_name.into(),
            BatchSelection::Ids { record_ids },
        )
    }

    /// Job over an inclusive id range.
    pub fn for_range(
        target_entity_type: impl Into<String>,
        index_name: impl Into<String>,
        min_id: i64,
        max_id: i64,
    ) -> Self {
        Self::new(
            target_entity_type.into(),
            index_name.into(),
            BatchSelection::Range { min_id, max_id },
        )
    }

    fn new(target_entity_type: String, index_name: String, selection: BatchSelection) -> Self {
        Self {
            job_id: Ulid::new(),
            target_entity_type,
            index_name,
            batch_id: None,
            selection,
            method_name: None,
            partial: false,
            enqueued_at: Utc::now(),
        }
    }

    /// Attach the pending-set batch id.
    pub fn with_batch_id(mut self, batch_id: u64) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Restrict the job to a partial update method.
    pub fn with_method_name(mut self, method_name: Option<String>) -> Self {
        self.method_name = method_name;
        self
    }

    /// Set whether the job is a partial update.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Serialize to JSON bytes for the job runner
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReindexError> {
        serde_json::to_vec(self).map_err(ReindexError::from)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReindexError> {
        serde_json::from_slice(bytes).map_err(ReindexError::from)
    }
}
