//! Error types for adpilot-core
//!
//! Only construction and configuration surface these errors; a running
//! workflow records its failures as [`crate::ErrorEntry`] values instead.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration
    #[error("invalid configuration: {field}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Configuration error (missing credentials, unusable collaborators)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Rejected run state change
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] adpilot_llm::Error),

    /// Tool error
    #[error("tool error: {0}")]
    Tool(#[from] adpilot_tools::Error),

    /// Internal error (run log IO, serialization)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::InvalidConfig { field, message } => {
                format!("Configuration error in '{}': {}", field, message)
            }
            Error::Configuration(msg) => format!("Configuration error: {}", msg),
            Error::InvalidState(msg) => format!("Workflow state error: {}", msg),
            Error::Llm(e) => format!("LLM error: {}", e),
            Error::Tool(e) => format!("Tool error: {}", e),
            Error::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::InvalidConfig { field, .. } => Some(format!(
                "Check the '{}' setting in config/default.toml or the ADPILOT_ environment variables.",
                field
            )),
            Error::Configuration(_) => Some(
                "Set OPENAI_API_KEY (and optionally TAVILY_API_KEY) or run `adpilot check`."
                    .to_string(),
            ),
            Error::Llm(adpilot_llm::Error::NotConfigured(_)) => {
                Some("Set the OPENAI_API_KEY environment variable.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let error = Error::InvalidConfig {
            field: "workflow.max_run_secs".to_string(),
            message: "must be greater than zero".to_string(),
        };
        let msg = error.user_message();
        assert!(msg.contains("workflow.max_run_secs"));
        assert!(error.suggestion().unwrap().contains("ADPILOT_"));
    }

    #[test]
    fn test_llm_not_configured_suggestion() {
        let error: Error = adpilot_llm::Error::NotConfigured("OPENAI_API_KEY not set".into()).into();
        assert!(error.suggestion().unwrap().contains("OPENAI_API_KEY"));

        let formatted = format_error_for_cli(&error);
        assert!(formatted.starts_with("LLM error"));
    }

    #[test]
    fn test_internal_has_no_suggestion() {
        assert!(Error::Internal("disk full".into()).suggestion().is_none());
    }
}
