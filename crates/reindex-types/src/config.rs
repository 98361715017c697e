//! Configuration loading for bulk-reindex.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/bulk-reindex/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ReindexError;
use crate::mode::DispatchMode;

/// Default maximum records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Settings shared by the engine and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexSettings {
    /// Prefix for shared set keys (`<namespace>:reindex:<index>:batches`)
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Maximum records per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Mode used when a caller does not pick one
    #[serde(default)]
    pub default_mode: DispatchMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_namespace() -> String {
    "reindex".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReindexSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            batch_size: default_batch_size(),
            default_mode: DispatchMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl ReindexSettings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config_dir>/bulk-reindex/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (REINDEX_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ReindexError> {
        let config_dir = ProjectDirs::from("", "", "bulk-reindex")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("namespace", default_namespace())
            .map_err(config_error)?
            .set_default("batch_size", default_batch_size() as i64)
            .map_err(config_error)?
            .set_default("default_mode", DispatchMode::default().as_str())
            .map_err(config_error)?
            .set_default("log_level", default_log_level())
            .map_err(config_error)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // REINDEX_BATCH_SIZE, REINDEX_NAMESPACE, REINDEX_DEFAULT_MODE, ...
        builder = builder.add_source(Environment::with_prefix("REINDEX").try_parsing(true));

        let settings: Self = builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ReindexError> {
        if self.batch_size == 0 {
            return Err(ReindexError::invalid_config("batch_size must be > 0"));
        }
        if self.namespace.trim().is_empty() {
            return Err(ReindexError::invalid_config("namespace must not be empty"));
        }
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> ReindexError {
    ReindexError::InvalidConfig(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = ReindexSettings::default();
        assert_eq!(settings.namespace, "reindex");
        assert_eq!(settings.batch_size, 1000);
        assert_eq!(settings.default_mode, DispatchMode::Inline);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "namespace = \"shop\"").unwrap();
        writeln!(file, "batch_size = 250").unwrap();
        writeln!(file, "default_mode = \"async\"").unwrap();

        let settings = ReindexSettings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.namespace, "shop");
        assert_eq!(settings.batch_size, 250);
        assert_eq!(settings.default_mode, DispatchMode::Async);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_missing_cli_file_is_an_error() {
        let result = ReindexSettings::load(Some("/nonexistent/bulk-reindex/settings.toml"));
        assert!(matches!(result, Err(ReindexError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = ReindexSettings::default();
        assert!(settings.validate().is_ok());

        settings.batch_size = 0;
        assert!(settings.validate().is_err());

        settings.batch_size = 10;
        settings.namespace = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = ReindexSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let decoded: ReindexSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.batch_size, settings.batch_size);
        assert_eq!(decoded.default_mode, settings.default_mode);

        let partial: ReindexSettings = serde_json::from_str("{\"batch_size\": 5}").unwrap();
        assert_eq!(partial.batch_size, 5);
        assert_eq!(partial.namespace, "reindex");
    }
}
