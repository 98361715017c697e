//! # reindex-types
//!
//! Shared domain types for the bulk reindex system:
//! - Record identifiers and their `id|routing` encoding
//! - The [`Indexable`] capability every indexed record implements
//! - Dispatch modes and batch job payloads
//! - Errors and layered settings

pub mod config;
pub mod error;
pub mod identifier;
pub mod job;
pub mod mode;
pub mod record;

pub use config::{ReindexSettings, DEFAULT_BATCH_SIZE};
pub use error::{ClientError, ReindexError};
pub use identifier::RecordIdentifier;
pub use job::{BatchSelection, JobPayload};
pub use mode::DispatchMode;
pub use record::Indexable;
