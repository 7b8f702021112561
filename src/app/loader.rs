//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") makes ADPILOT_WORKFLOW__MAX_RUN_SECS work
        // instead of ADPILOT__WORKFLOW__MAX_RUN_SECS.
        .add_source(
            Environment::with_prefix("ADPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::StoreBackend;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.workflow.max_run_secs, 120);
        assert_eq!(config.workflow.max_stages, 6);
        assert_eq!(config.workflow.max_calls_per_stage, 3);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.fixture.as_deref(), Some("data/campaigns.json"));
        assert!(!config.run_log.enabled);
    }

    #[test]
    fn test_file_override_wins() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(
                "[workflow]\nmax_run_secs = 30\n[store]\nbackend = \"rest\"",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.workflow.max_run_secs, 30);
        assert_eq!(config.workflow.default_top_n, 10);
        assert_eq!(config.store.backend, StoreBackend::Rest);
    }
}
