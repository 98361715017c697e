//! bulk-reindex library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (plan, encode-id, decode-id, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, PlanArgs};
pub use commands::{
    handle_decode_id, handle_encode_id, handle_plan, init_tracing, load_settings, plan_jobs,
    show_config,
};
