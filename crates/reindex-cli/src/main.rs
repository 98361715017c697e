//! bulk-reindex
//!
//! Plans full search reindex batch jobs and inspects record identifiers.
//!
//! # Usage
//!
//! ```bash
//! bulk-reindex plan --index products --entity Product --min-id 1 --max-id 250000
//! bulk-reindex plan --index products --entity Product 17 42|eu 99
//! bulk-reindex encode-id 42 --routing eu
//! bulk-reindex decode-id '42|eu'
//! bulk-reindex config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config_dir>/bulk-reindex/config.toml)
//! 3. File passed with --config
//! 4. Environment variables (REINDEX_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use reindex_cli::{
    handle_decode_id, handle_encode_id, handle_plan, init_tracing, load_settings, show_config,
    Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_tracing(&settings)?;

    match cli.command {
        Commands::Plan(args) => {
            handle_plan(&settings, &args)?;
        }
        Commands::EncodeId { id, routing } => {
            println!("{}", handle_encode_id(&id, routing.as_deref())?);
        }
        Commands::DecodeId { encoded } => {
            println!("{}", handle_decode_id(&encoded)?);
        }
        Commands::Config => {
            println!("{}", show_config(&settings)?);
        }
    }

    Ok(())
}
