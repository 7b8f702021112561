//! Orchestrator - the `run_workflow` facade
//!
//! Ties the classifier, the stage engine and the synthesizer together and
//! enforces the run budget.
//!
//! # Module Structure
//!
//! - `types`: run results and caller context
//! - `config`: `OrchestratorConfig` and its validation
//! - `core`: `Orchestrator` struct, builders and cancellation
//! - `process`: the per-run driver

mod config;
mod core;
mod process;
mod types;

#[cfg(test)]
mod tests;

pub use config::OrchestratorConfig;
pub use core::Orchestrator;
pub use types::{RunContext, RunStatus, ToolCallSummary, WorkflowResult};
