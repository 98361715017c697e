//! Command implementations for bulk-reindex.
//!
//! Every command loads settings first (defaults, config files, `REINDEX_*`
//! environment, then CLI flags). Output goes to stdout as JSON; logs go to
//! stderr.

use std::io::Write;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use reindex_engine::{batch_count, plan_cursor_jobs, plan_range_jobs, PartitionStrategy};
use reindex_types::{JobPayload, RecordIdentifier, ReindexSettings};

use crate::cli::PlanArgs;

/// Load settings and apply CLI overrides.
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<ReindexSettings> {
    let mut settings = ReindexSettings::load(config_path).context("Failed to load configuration")?;

    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    Ok(settings)
}

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins over the configured log level when set.
pub fn init_tracing(settings: &ReindexSettings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Jobs a full reindex would enqueue for `args`, in emission order.
pub fn plan_jobs(
    settings: &ReindexSettings,
    args: &PlanArgs,
) -> Result<(PartitionStrategy, Vec<JobPayload>)> {
    let batch_size = args.batch_size.unwrap_or(settings.batch_size);
    if batch_size == 0 {
        bail!("batch size must be > 0");
    }
    let method_name = args.method.as_deref();

    match (args.min_id, args.max_id) {
        (Some(min_id), Some(max_id)) => {
            if min_id > max_id {
                bail!("min id {min_id} is greater than max id {max_id}");
            }
            let jobs = plan_range_jobs(
                &args.entity,
                &args.index,
                min_id,
                max_id,
                batch_size,
                method_name,
            )
            .collect();
            Ok((PartitionStrategy::Range, jobs))
        }
        (None, None) if !args.ids.is_empty() => {
            let jobs = plan_cursor_jobs(
                &args.entity,
                &args.index,
                args.ids.iter().cloned(),
                batch_size,
                method_name,
            )
            .collect();
            Ok((PartitionStrategy::Cursor, jobs))
        }
        (None, None) => Ok((PartitionStrategy::Skipped, Vec::new())),
        _ => bail!("--min-id and --max-id must be given together"),
    }
}

/// Handle `plan`: print one job payload per line.
pub fn handle_plan(settings: &ReindexSettings, args: &PlanArgs) -> Result<()> {
    let (strategy, jobs) = plan_jobs(settings, args)?;
    let records: u64 = jobs.iter().map(|job| job.selection.len()).sum();

    info!(
        index = %args.index,
        strategy = %strategy,
        batches = jobs.len(),
        "Planned full reindex"
    );
    if strategy == PartitionStrategy::Cursor {
        debug!(
            records,
            expected_batches = batch_count(records, args.batch_size.unwrap_or(settings.batch_size)),
            "Cursor plan"
        );
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for job in &jobs {
        let line = serde_json::to_string(job).context("Failed to encode job payload")?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Handle `encode-id`.
pub fn handle_encode_id(id: &str, routing: Option<&str>) -> Result<String> {
    if id.contains(reindex_types::identifier::SEPARATOR) {
        bail!("record id must not contain '|': {id}");
    }
    let identifier = match routing {
        Some(routing) => RecordIdentifier::with_routing(id, routing),
        None => RecordIdentifier::new(id),
    };
    Ok(identifier.encode())
}

/// Handle `decode-id`: the identifier as a JSON object.
pub fn handle_decode_id(encoded: &str) -> Result<String> {
    let identifier = RecordIdentifier::decode(encoded);
    serde_json::to_string(&identifier).context("Failed to encode identifier")
}

/// Handle `config`: effective settings as pretty JSON.
pub fn show_config(settings: &ReindexSettings) -> Result<String> {
    serde_json::to_string_pretty(settings).context("Failed to encode settings")
}
