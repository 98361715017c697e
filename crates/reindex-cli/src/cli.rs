//! CLI argument parsing for bulk-reindex.
//!
//! Global `--config` and `--log-level` flags override the config file and
//! environment layers.

use clap::{Args, Parser, Subcommand};

/// Bulk search reindex planner
///
/// Plans full reindex batch jobs and inspects record identifiers.
#[derive(Parser, Debug)]
#[command(name = "bulk-reindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default <config_dir>/bulk-reindex/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the batch jobs a full reindex would enqueue, one JSON payload per line
    Plan(PlanArgs),

    /// Encode an id and optional routing key
    EncodeId {
        /// Record id (must not contain '|')
        id: String,

        /// Shard routing key
        #[arg(short, long)]
        routing: Option<String>,
    },

    /// Decode an encoded identifier into id and routing
    DecodeId {
        /// Encoded identifier (`id` or `id|routing`)
        encoded: String,
    },

    /// Print the effective settings as JSON
    Config,
}

/// Arguments for `plan`
///
/// Pass `--min-id`/`--max-id` for numeric range jobs, or a list of record
/// ids for cursor jobs.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Target search index
    #[arg(short, long)]
    pub index: String,

    /// Entity type carried in job payloads
    #[arg(short, long)]
    pub entity: String,

    /// Lowest numeric id (range mode)
    #[arg(long, requires = "max_id", conflicts_with = "ids")]
    pub min_id: Option<i64>,

    /// Highest numeric id (range mode)
    #[arg(long, requires = "min_id")]
    pub max_id: Option<i64>,

    /// Encoded record identifiers (cursor mode)
    pub ids: Vec<String>,

    /// Records per batch (overrides settings)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Partial update method
    #[arg(short, long)]
    pub method: Option<String>,
}
