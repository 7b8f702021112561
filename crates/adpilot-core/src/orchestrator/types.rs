//! Orchestrator types
//!
//! - `RunStatus` and `WorkflowResult`: what `run_workflow` returns
//! - `ToolCallSummary`: one step, as reported to callers
//! - `RunContext`: optional caller hints

use crate::engine::Stage;
use crate::grader::GroundingVerdict;
use crate::intent::IntentRecord;
use crate::run::WorkflowRun;
use crate::tracker::{RunSummary, StepStatus};
use adpilot_tools::{Capability, Platform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// An answer was produced
    Completed,
    /// No answer could be produced
    Failed,
}

impl RunStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// One step as reported in a result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallSummary {
    /// Issue order
    pub sequence: usize,
    /// Capability
    pub tool: Capability,
    /// Stage
    pub stage: Stage,
    /// Bounded argument rendering
    pub args_summary: String,
    /// Outcome
    pub status: StepStatus,
    /// Error or skip reason
    pub error: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Result of `run_workflow`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Run id
    pub workflow_id: Uuid,
    /// Final status
    pub status: RunStatus,
    /// Last stage that recorded a step, else the run state
    pub current_step: String,
    /// Every recorded step, in order
    pub tool_calls: Vec<ToolCallSummary>,
    /// Answer, or a failure message
    pub final_output: String,
    /// Run errors, oldest first
    pub errors: Vec<String>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: Option<DateTime<Utc>>,
    /// Step counts and elapsed time
    pub summary: RunSummary,
    /// Classified intent
    pub intent: Option<IntentRecord>,
    /// Grounding check verdict, when the answer was checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<GroundingVerdict>,
}

impl WorkflowResult {
    /// Snapshot a finished run
    #[must_use]
    pub fn from_run(run: &WorkflowRun, final_output: impl Into<String>) -> Self {
        let records = run.steps().records();
        let tool_calls = records
            .iter()
            .map(|r| ToolCallSummary {
                sequence: r.sequence,
                tool: r.tool,
                stage: r.stage,
                args_summary: r.args_summary(),
                status: r.status,
                error: r.error.clone(),
                duration_ms: r.duration_ms,
            })
            .collect();
        let current_step = records
            .last()
            .map(|r| r.stage.as_str().to_string())
            .unwrap_or_else(|| run.state().as_str().to_string());

        Self {
            workflow_id: run.id(),
            status: if run.final_answer().is_some() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            },
            current_step,
            tool_calls,
            final_output: final_output.into(),
            errors: run.errors().iter().map(ToString::to_string).collect(),
            started_at: run.started_at(),
            completed_at: run.completed_at(),
            summary: run.steps().summary(run.started_at()),
            intent: run.intent().cloned(),
            grounding: run.grounding().cloned(),
        }
    }

    /// Whether the run produced an answer
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Calls of one status
    #[must_use]
    pub fn calls_with(&self, status: StepStatus) -> Vec<&ToolCallSummary> {
        self.tool_calls.iter().filter(|c| c.status == status).collect()
    }
}

/// Caller hints for one run (`platform`, `limit`)
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    values: HashMap<String, String>,
}

impl RunContext {
    /// Empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Raw value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Platform restriction, if the value names a known platform
    #[must_use]
    pub fn platform(&self) -> Option<Platform> {
        self.get("platform").and_then(Platform::parse_loose)
    }

    /// Result size, if a positive integer
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.get("limit")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
    }

    /// Apply the hints to a classified intent
    #[must_use]
    pub fn apply(&self, intent: IntentRecord) -> IntentRecord {
        let platform = self.platform();
        let limit = self.limit();
        if platform.is_none() && limit.is_none() {
            return intent;
        }

        let mut entities = intent.entities;
        if let Some(platform) = platform {
            entities.platforms = vec![platform];
        }
        // A list size never turns a filtered mutation into a ranked one
        if let Some(limit) = limit.filter(|_| entities.action.is_none() || entities.ranked_selection()) {
            entities.top_n = Some(limit);
        }
        IntentRecord::new(intent.category, intent.confidence, entities, intent.source)
    }
}

impl From<HashMap<String, String>> for RunContext {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}
