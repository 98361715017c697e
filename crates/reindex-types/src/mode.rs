//! Dispatch mode selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReindexError;

/// How a batch of records reaches the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Bulk call on the calling task, with one retry on transient errors
    #[default]
    Inline,
    /// Hand record ids to the job runner
    Async,
    /// Push records onto the durable reindex queue
    Queue,
}

impl DispatchMode {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Inline => "inline",
            DispatchMode::Async => "async",
            DispatchMode::Queue => "queue",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = ReindexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(DispatchMode::Inline),
            "async" => Ok(DispatchMode::Async),
            "queue" => Ok(DispatchMode::Queue),
            other => Err(ReindexError::invalid_config(format!(
                "unknown dispatch mode: {other}"
            ))),
        }
    }
}
