//! Orchestrator core structure
//!
//! Contains the main `Orchestrator` struct and its builder methods.

use crate::engine::{StageTable, WorkflowEngine};
use crate::error::Result;
use crate::event_bus::{EventBus, WorkflowEvent};
use crate::grader::GroundingGrader;
use crate::intent::{IntentClassifier, TriggerTable};
use crate::run_log::RunLog;
use crate::synthesizer::ResultSynthesizer;
use adpilot_llm::LlmProvider;
use adpilot_tools::ToolRunner;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::config::OrchestratorConfig;

/// Main orchestrator that turns a question into an answer
pub struct Orchestrator {
    pub(crate) classifier: IntentClassifier,
    pub(crate) engine: WorkflowEngine,
    pub(crate) synthesizer: ResultSynthesizer,
    pub(crate) grader: GroundingGrader,
    pub(crate) event_bus: Option<Arc<EventBus>>,
    pub(crate) run_log: Option<Arc<dyn RunLog>>,
    pub(crate) config: OrchestratorConfig,
    /// Runs in flight with their cancellation tokens
    pub(crate) active_runs: Arc<DashMap<Uuid, CancellationToken>>,
}

impl Orchestrator {
    /// Create a new orchestrator, rejecting an invalid configuration
    pub fn new(
        llm_provider: Arc<dyn LlmProvider>,
        runner: ToolRunner,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let classifier = IntentClassifier::new(llm_provider.clone())
            .with_model(config.model.clone())
            .with_timeout(config.classifier_timeout);
        let engine = WorkflowEngine::new(runner)
            .with_limits(config.limits)
            .with_default_top_n(config.default_top_n);
        let grader = GroundingGrader::new(llm_provider.clone()).with_model(config.model.clone());
        let synthesizer = ResultSynthesizer::new(llm_provider)
            .with_model(config.model.clone())
            .with_temperature(config.synthesis_temperature)
            .with_max_tokens(config.synthesis_max_tokens)
            .with_excerpt_chars(config.excerpt_chars);

        Ok(Self {
            classifier,
            engine,
            synthesizer,
            grader,
            event_bus: None,
            run_log: None,
            config,
            active_runs: Arc::new(DashMap::new()),
        })
    }

    /// Publish progress events to a bus
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.engine = self.engine.with_events((*bus).clone());
        self.event_bus = Some(bus);
        self
    }

    /// Persist finished runs
    #[must_use]
    pub fn with_run_log(mut self, run_log: Arc<dyn RunLog>) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Replace the keyword trigger table
    #[must_use]
    pub fn with_trigger_table(mut self, triggers: TriggerTable) -> Self {
        self.classifier = self.classifier.with_triggers(triggers);
        self
    }

    /// Replace the category-to-stage table
    #[must_use]
    pub fn with_stage_table(mut self, table: StageTable) -> Self {
        self.engine = self.engine.with_table(table);
        self
    }

    /// Tool runner
    #[must_use]
    pub fn runner(&self) -> &ToolRunner {
        self.engine.runner()
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get the active runs map
    #[must_use]
    pub fn active_runs(&self) -> &Arc<DashMap<Uuid, CancellationToken>> {
        &self.active_runs
    }

    /// Get the number of active runs
    #[must_use]
    pub fn active_run_count(&self) -> usize {
        self.active_runs.len()
    }

    /// Cancel an active run by ID
    pub fn cancel(&self, run_id: Uuid) -> bool {
        if let Some((_id, token)) = self.active_runs.remove(&run_id) {
            token.cancel();
            info!(run_id = %run_id, "Run cancelled");
            true
        } else {
            false
        }
    }

    pub(crate) fn emit(&self, event: WorkflowEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
