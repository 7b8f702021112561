//! Adpilot Core - Workflow orchestration engine
//!
//! This crate turns a marketing question into a sequence of tool calls and a
//! final answer:
//! - Intent: keyword and generative classification of the question
//! - Engine: the stage graph, per-stage planning and concurrent execution
//! - Synthesizer: merges collected payloads into one answer
//! - Grader: optional check that the answer is backed by the data
//! - Tracker: append-only record of every tool call
//! - Orchestrator: the `run_workflow` facade enforcing the run budget

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod event_bus;
pub mod grader;
pub mod intent;
pub mod orchestrator;
pub mod run;
pub mod run_log;
pub mod synthesizer;
pub mod tracker;

pub use engine::{
    CollectedPayloads, EngineLimits, Stage, StageOutput, StageResult, StageTable, ToolInvocation,
    WorkflowEngine,
};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, WorkflowEvent};
pub use grader::{GroundingGrader, GroundingVerdict};
pub use intent::{
    Classification, Entities, IntentCategory, IntentClassifier, IntentRecord, IntentSource,
    KeywordMatch, MutationAction, Requirement, TriggerGroup, TriggerTable,
};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, RunContext, RunStatus, ToolCallSummary, WorkflowResult,
};
pub use run::{ErrorEntry, ErrorKind, RunState, WorkflowRun};
pub use run_log::{JsonlRunLog, RunLog};
pub use synthesizer::{ResultSynthesizer, Synthesis};
pub use tracker::{ExecutionTracker, RunSummary, StepRecord, StepStatus};
