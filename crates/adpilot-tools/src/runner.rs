//! Runner - Tool execution engine
//!
//! This module provides the execution engine for tools:
//! - Input validation before any I/O
//! - Per-category timeout handling
//! - Parallel execution that preserves issue order

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::registry::{ToolCategory, ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// Configuration for the tool runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout for data, search and mutation tools
    pub default_timeout: Duration,
    /// Timeout for generation tools
    pub generation_timeout: Duration,
    /// Maximum timeout allowed
    pub max_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(60),
            max_timeout: Duration::from_secs(300),
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with default timeout
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..Default::default()
        }
    }

    /// Set the default timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the generation timeout
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Set the maximum timeout
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    /// Timeout applied to a tool of the given category
    #[must_use]
    pub fn timeout_for(&self, category: ToolCategory) -> Duration {
        let timeout = match category {
            ToolCategory::Generation => self.generation_timeout,
            ToolCategory::Data | ToolCategory::Mutation | ToolCategory::Search => {
                self.default_timeout
            }
        };
        timeout.min(self.max_timeout)
    }
}

/// Tool execution result with additional metadata
#[derive(Debug)]
pub struct ExecutionResult {
    /// The tool result
    pub result: ToolResult,
    /// Capability that ran
    pub capability: Capability,
}

/// Tool runner for executing registered tools
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Create a new tool runner
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, RunnerConfig::default())
    }

    /// Get the registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Execute a tool.
    ///
    /// Lookup and validation failures and timeouts are returned as errors. A
    /// tool that runs and fails yields a failed [`ToolResult`].
    #[instrument(skip(self, input), fields(tool = %capability))]
    pub async fn execute(
        &self,
        capability: Capability,
        input: serde_json::Value,
    ) -> Result<ExecutionResult> {
        let tool = self
            .registry
            .get(capability)
            .ok_or_else(|| Error::NotFound(capability.to_string()))?;

        tool.validate_input(&input)?;

        let execution_timeout = self.config.timeout_for(capability.category());

        let start = Instant::now();
        debug!(tool = %capability, timeout_ms = %execution_timeout.as_millis(), "Executing tool");

        let result = match timeout(execution_timeout, tool.execute(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let duration = start.elapsed().as_millis() as u64;
                error!(tool = %capability, error = %e, "Tool execution failed");
                ToolResult::failure(e.to_string(), duration)
            }
            Err(_) => {
                let duration = start.elapsed().as_millis() as u64;
                warn!(tool = %capability, timeout_ms = %execution_timeout.as_millis(), "Tool execution timed out");
                return Err(Error::Timeout(duration));
            }
        };

        debug!(
            tool = %capability,
            success = %result.success,
            duration_ms = %result.duration_ms,
            "Tool execution completed"
        );

        Ok(ExecutionResult { result, capability })
    }

    /// Execute multiple tools concurrently; results come back in issue order
    #[instrument(skip(self, calls), fields(calls = calls.len()))]
    pub async fn execute_parallel(
        &self,
        calls: Vec<(Capability, serde_json::Value)>,
    ) -> Vec<Result<ExecutionResult>> {
        let futures: Vec<_> = calls
            .into_iter()
            .map(|(capability, input)| {
                let runner = self.clone();
                async move { runner.execute(capability, input).await }
            })
            .collect();

        futures::future::join_all(futures).await
    }
}

impl Clone for ToolRunner {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
        }
    }
}
