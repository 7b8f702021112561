//! Configuration validation
//!
//! Fails fast on values the workflow engine cannot honor; warns about
//! optional collaborators that are not configured.

use super::config::{AppConfig, StoreBackend};
use super::init::orchestrator_config;
use adpilot_core::Error;
use tracing::warn;

/// Environment variable holding the REST store key
pub const STORE_KEY_VAR: &str = "SUPABASE_KEY";

/// Reject invalid workflow and store settings
pub fn validate_config(config: &AppConfig) -> adpilot_core::Result<()> {
    orchestrator_config(config).validate()?;

    if config.tools.data_timeout_secs == 0 || config.tools.generation_timeout_secs == 0 {
        return Err(Error::InvalidConfig {
            field: "tools".to_string(),
            message: "tool timeouts must be greater than zero".to_string(),
        });
    }

    if config.store.backend == StoreBackend::Rest {
        if config.store.url.trim().is_empty() {
            return Err(Error::InvalidConfig {
                field: "store.url".to_string(),
                message: "required for the rest backend".to_string(),
            });
        }
        if std::env::var(STORE_KEY_VAR).map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::Configuration(format!(
                "{} must be set for the rest store backend",
                STORE_KEY_VAR
            )));
        }
    }

    Ok(())
}

/// Log optional collaborators that will be disabled
pub fn warn_optional(config: &AppConfig) {
    if std::env::var("TAVILY_API_KEY").map_or(true, |k| k.trim().is_empty()) {
        warn!("TAVILY_API_KEY is not set; web search is disabled");
    }
    if !config.tools.encyclopedia {
        warn!("Encyclopedia search is disabled in configuration");
    }
    if config.store.backend == StoreBackend::Memory && config.store.fixture.is_none() {
        warn!("Memory store has no fixture; campaign questions will find no data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_limits() {
        let mut config = AppConfig::default();
        config.workflow.max_calls_per_stage = 4;
        match validate_config(&config) {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "max_calls_per_stage"),
            other => panic!("unexpected: {:?}", other),
        }

        let mut config = AppConfig::default();
        config.tools.data_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rest_backend_requires_url() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Rest;
        match validate_config(&config) {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "store.url"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
