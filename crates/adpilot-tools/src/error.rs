//! Error types for adpilot-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool not found
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed
    #[error("execution failed: {0}")]
    Execution(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Collaborator (LLM, search API) not configured or unreachable
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Campaign store error
    #[error("store error: {0}")]
    Store(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<adpilot_llm::Error> for Error {
    fn from(err: adpilot_llm::Error) -> Self {
        match err {
            adpilot_llm::Error::NotConfigured(msg) => Self::Unavailable(msg),
            adpilot_llm::Error::Timeout(ms) => Self::Timeout(ms),
            adpilot_llm::Error::Network(msg) => Self::Network(msg),
            other => Self::Execution(other.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_conversion() {
        let err: Error = adpilot_llm::Error::NotConfigured("OPENAI_API_KEY".into()).into();
        assert!(matches!(err, Error::Unavailable(_)));

        let err: Error = adpilot_llm::Error::Timeout(60_000).into();
        assert!(matches!(err, Error::Timeout(60_000)));

        let err: Error = adpilot_llm::Error::RateLimit.into();
        assert!(matches!(err, Error::Execution(_)));
    }
}
