//! Orchestrator configuration

use crate::engine::EngineLimits;
use crate::error::{Error, Result};
use crate::synthesizer::DEFAULT_EXCERPT_CHARS;
use std::time::Duration;

/// Hard ceiling on stages per run
const STAGE_CEILING: usize = 6;

/// Hard ceiling on calls per stage
const CALL_CEILING: usize = 3;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Wall-clock budget for classification plus collection
    pub max_run: Duration,
    /// Generative classification timeout
    pub classifier_timeout: Duration,
    /// Answer generation timeout
    pub generation_timeout: Duration,
    /// Minimum time granted to synthesis after the budget is spent
    pub synthesis_grace: Duration,
    /// Stage and call ceilings
    pub limits: EngineLimits,
    /// Per-stage excerpt size in the synthesis prompt
    pub excerpt_chars: usize,
    /// Model for classification and synthesis (empty = provider default)
    pub model: String,
    /// Synthesis temperature
    pub synthesis_temperature: f32,
    /// Synthesis reply length cap
    pub synthesis_max_tokens: u32,
    /// Ranking list size when the question names none
    pub default_top_n: usize,
    /// Grade generated answers against the collected data
    pub grounding_check: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_run: Duration::from_secs(120),
            classifier_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(60),
            synthesis_grace: Duration::from_secs(5),
            limits: EngineLimits::default(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            model: String::new(),
            synthesis_temperature: 0.3,
            synthesis_max_tokens: 1500,
            default_top_n: 10,
            grounding_check: false,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run budget
    #[must_use]
    pub fn with_max_run(mut self, max_run: Duration) -> Self {
        self.max_run = max_run;
        self
    }

    /// Set the classifier timeout
    #[must_use]
    pub fn with_classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    /// Set the generation timeout
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Set the synthesis grace period
    #[must_use]
    pub fn with_synthesis_grace(mut self, grace: Duration) -> Self {
        self.synthesis_grace = grace;
        self
    }

    /// Set stage and call ceilings
    #[must_use]
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the per-stage excerpt size
    #[must_use]
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the synthesis temperature
    #[must_use]
    pub fn with_synthesis_temperature(mut self, temperature: f32) -> Self {
        self.synthesis_temperature = temperature;
        self
    }

    /// Set the default ranking size
    #[must_use]
    pub fn with_default_top_n(mut self, top_n: usize) -> Self {
        self.default_top_n = top_n;
        self
    }

    /// Enable or disable the grounding check
    #[must_use]
    pub fn with_grounding_check(mut self, enabled: bool) -> Self {
        self.grounding_check = enabled;
        self
    }

    /// Reject values the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        fn invalid(field: &str, message: impl Into<String>) -> Error {
            Error::InvalidConfig {
                field: field.to_string(),
                message: message.into(),
            }
        }

        if self.max_run.is_zero() {
            return Err(invalid("max_run", "must be greater than zero"));
        }
        if self.generation_timeout.is_zero() {
            return Err(invalid("generation_timeout", "must be greater than zero"));
        }
        if self.classifier_timeout.is_zero() {
            return Err(invalid("classifier_timeout", "must be greater than zero"));
        }
        if !(2..=STAGE_CEILING).contains(&self.limits.max_stages) {
            return Err(invalid(
                "max_stages",
                format!("must be between 2 and {}", STAGE_CEILING),
            ));
        }
        if !(1..=CALL_CEILING).contains(&self.limits.max_calls_per_stage) {
            return Err(invalid(
                "max_calls_per_stage",
                format!("must be between 1 and {}", CALL_CEILING),
            ));
        }
        if self.excerpt_chars == 0 {
            return Err(invalid("excerpt_chars", "must be greater than zero"));
        }
        if !(0.0..=2.0).contains(&self.synthesis_temperature) {
            return Err(invalid("synthesis_temperature", "must be between 0.0 and 2.0"));
        }
        if self.default_top_n == 0 {
            return Err(invalid("default_top_n", "must be at least 1"));
        }
        Ok(())
    }
}
