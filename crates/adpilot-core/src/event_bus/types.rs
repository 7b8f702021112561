use crate::engine::Stage;
use crate::intent::IntentCategory;
use crate::orchestrator::RunStatus;
use crate::tracker::StepStatus;
use adpilot_tools::Capability;
use serde::Serialize;
use uuid::Uuid;

/// Progress of one workflow run.
///
/// Events carry summaries only; payloads and arguments stay in the run record.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Run accepted
    RunStarted {
        /// Run id
        run_id: Uuid,
        /// Question length in characters
        question_chars: usize,
    },
    /// Intent decided
    Classified {
        /// Run id
        run_id: Uuid,
        /// Category
        category: IntentCategory,
        /// Confidence
        confidence: f64,
        /// Whether the generative tier failed
        degraded: bool,
    },
    /// Stage about to run
    StageStarted {
        /// Run id
        run_id: Uuid,
        /// Stage
        stage: Stage,
    },
    /// Tool call recorded
    StepRecorded {
        /// Run id
        run_id: Uuid,
        /// Issue order
        sequence: usize,
        /// Capability
        tool: Capability,
        /// Stage
        stage: Stage,
        /// Outcome
        status: StepStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Stage done
    StageFinished {
        /// Run id
        run_id: Uuid,
        /// Stage
        stage: Stage,
        /// `ok`, `unavailable` or `skipped`
        outcome: &'static str,
    },
    /// Run done
    RunFinished {
        /// Run id
        run_id: Uuid,
        /// Final status
        status: RunStatus,
        /// Wall time in milliseconds
        elapsed_ms: u64,
    },
}

impl WorkflowEvent {
    /// Run the event belongs to.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::Classified { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StepRecorded { run_id, .. }
            | Self::StageFinished { run_id, .. }
            | Self::RunFinished { run_id, .. } => *run_id,
        }
    }
}
