//! WorkflowRun - the typed record of one request
//!
//! State only moves forward through
//! `Created → Classifying → Collecting → Synthesizing → Completed | Failed`.
//! `Failed` may be entered from any non-terminal state.

use crate::engine::Stage;
use crate::error::{Error, Result};
use crate::grader::GroundingVerdict;
use crate::intent::IntentRecord;
use crate::tracker::{ExecutionTracker, StepRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Just created
    Created,
    /// Classifying the question
    Classifying,
    /// Running data stages
    Collecting,
    /// Composing the answer
    Synthesizing,
    /// Finished with an answer
    Completed,
    /// Finished without an answer
    Failed,
}

impl RunState {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Classifying => "classifying",
            Self::Collecting => "collecting",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn next(&self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Classifying),
            Self::Classifying => Some(Self::Collecting),
            Self::Collecting => Some(Self::Synthesizing),
            Self::Synthesizing => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-level error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The generative classifier failed; keyword result used
    ClassificationDegraded,
    /// A tool call failed
    AdapterUnavailable,
    /// Answer generation failed
    SynthesisUnavailable,
    /// Stage, call or time budget exhausted
    RunExhausted,
    /// Caller cancelled the run
    Cancelled,
    /// The answer makes claims the collected data does not back
    UnsupportedClaims,
}

impl ErrorKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassificationDegraded => "classification_degraded",
            Self::AdapterUnavailable => "adapter_unavailable",
            Self::SynthesisUnavailable => "synthesis_unavailable",
            Self::RunExhausted => "run_exhausted",
            Self::Cancelled => "cancelled",
            Self::UnsupportedClaims => "unsupported_claims",
        }
    }
}

/// A recorded run error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Kind
    pub kind: ErrorKind,
    /// Stage, when stage-specific
    pub stage: Option<Stage>,
    /// Message
    pub message: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "[{}] {}: {}", self.kind.as_str(), stage, self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}

/// One execution of a user request
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    id: Uuid,
    question: String,
    intent: Option<IntentRecord>,
    steps: ExecutionTracker,
    state: RunState,
    final_answer: Option<String>,
    grounding: Option<GroundingVerdict>,
    errors: Vec<ErrorEntry>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Create a run in the `Created` state
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            intent: None,
            steps: ExecutionTracker::new(),
            state: RunState::Created,
            final_answer: None,
            grounding: None,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Run id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The question, as received
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Classified intent, once set
    #[must_use]
    pub fn intent(&self) -> Option<&IntentRecord> {
        self.intent.as_ref()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Answer, set on completion
    #[must_use]
    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    /// Grounding check verdict, when the answer was checked
    #[must_use]
    pub fn grounding(&self) -> Option<&GroundingVerdict> {
        self.grounding.as_ref()
    }

    /// Recorded errors, oldest first
    #[must_use]
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Step log
    #[must_use]
    pub fn steps(&self) -> &ExecutionTracker {
        &self.steps
    }

    /// Start time
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End time, set on reaching a terminal state
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Set the intent; a second call is rejected
    pub fn set_intent(&mut self, intent: IntentRecord) -> Result<()> {
        if self.intent.is_some() {
            return Err(Error::InvalidState("intent already set".to_string()));
        }
        self.intent = Some(intent);
        Ok(())
    }

    /// Move to `next`.
    ///
    /// Only the immediate successor or `Failed` is accepted, and `Completed`
    /// is reached through [`WorkflowRun::complete`].
    pub fn advance(&mut self, next: RunState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "run already {}, cannot move to {}",
                self.state, next
            )));
        }
        if next == RunState::Completed && self.final_answer.is_none() {
            return Err(Error::InvalidState(
                "cannot complete a run without an answer".to_string(),
            ));
        }
        if next != RunState::Failed && self.state.next() != Some(next) {
            return Err(Error::InvalidState(format!(
                "cannot move from {} to {}",
                self.state, next
            )));
        }

        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Set the answer and move from `Synthesizing` to `Completed`
    pub fn complete(&mut self, answer: impl Into<String>) -> Result<()> {
        if self.state != RunState::Synthesizing {
            return Err(Error::InvalidState(format!(
                "cannot complete from {}",
                self.state
            )));
        }
        let answer = answer.into();
        if answer.trim().is_empty() {
            return Err(Error::InvalidState("answer must not be empty".to_string()));
        }
        self.final_answer = Some(answer);
        self.advance(RunState::Completed)
    }

    /// Record the grounding check verdict
    pub fn set_grounding(&mut self, verdict: GroundingVerdict) {
        self.grounding = Some(verdict);
    }

    /// Append an error entry
    pub fn record_error(&mut self, kind: ErrorKind, stage: Option<Stage>, message: impl Into<String>) {
        self.errors.push(ErrorEntry {
            kind,
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Append a step record, returning its sequence number
    pub fn record_step(&mut self, step: StepRecord) -> usize {
        self.steps.record(step)
    }

    /// Whether any error of `kind` was recorded
    #[must_use]
    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut run = WorkflowRun::new("q");
        run.advance(RunState::Classifying).unwrap();
        run.advance(RunState::Collecting).unwrap();
        run.advance(RunState::Synthesizing).unwrap();
        run.complete("answer").unwrap();

        assert_eq!(run.state(), RunState::Completed);
        assert_eq!(run.final_answer(), Some("answer"));
        assert!(run.completed_at().is_some());
    }

    #[test]
    fn test_backward_and_skipping_rejected() {
        let mut run = WorkflowRun::new("q");
        assert!(run.advance(RunState::Collecting).is_err());
        assert_eq!(run.state(), RunState::Created);

        run.advance(RunState::Classifying).unwrap();
        assert!(run.advance(RunState::Created).is_err());
        assert!(run.advance(RunState::Completed).is_err());
        assert_eq!(run.state(), RunState::Classifying);
    }

    #[test]
    fn test_failed_from_any_non_terminal_and_final() {
        let mut run = WorkflowRun::new("q");
        run.advance(RunState::Failed).unwrap();
        let completed_at = run.completed_at();
        assert!(completed_at.is_some());

        assert!(run.advance(RunState::Failed).is_err());
        assert!(run.advance(RunState::Classifying).is_err());
        assert_eq!(run.completed_at(), completed_at);
    }

    #[test]
    fn test_complete_requires_synthesizing_and_text() {
        let mut run = WorkflowRun::new("q");
        assert!(run.complete("early").is_err());

        run.advance(RunState::Classifying).unwrap();
        run.advance(RunState::Collecting).unwrap();
        run.advance(RunState::Synthesizing).unwrap();
        assert!(run.complete("  ").is_err());
        assert_eq!(run.state(), RunState::Synthesizing);
    }

    #[test]
    fn test_intent_set_once() {
        use crate::intent::{Entities, IntentCategory, IntentSource};

        let record = IntentRecord::new(
            IntentCategory::Brainstorm,
            0.6,
            Entities::default(),
            IntentSource::Keyword,
        );
        let mut run = WorkflowRun::new("ideas");
        run.set_intent(record.clone()).unwrap();
        assert!(run.set_intent(record).is_err());
        assert_eq!(run.intent().map(|i| i.category), Some(IntentCategory::Brainstorm));
    }

    #[test]
    fn test_error_entries_accumulate() {
        let mut run = WorkflowRun::new("q");
        run.record_error(ErrorKind::AdapterUnavailable, Some(Stage::FetchData), "fetch_campaigns: timeout");
        run.record_error(ErrorKind::RunExhausted, None, "deadline reached");

        assert_eq!(run.errors().len(), 2);
        assert!(run.has_error(ErrorKind::RunExhausted));
        assert_eq!(
            run.errors()[0].to_string(),
            "[adapter_unavailable] fetch-data: fetch_campaigns: timeout"
        );
    }
}
