//! EventBus - broadcast of workflow progress
//!
//! Runs publish lifecycle, stage and step events so that the CLI and other
//! subscribers can follow a run while it executes.

/// Broadcast channel wrapper.
pub mod bus;
/// Workflow event definitions.
pub mod types;

pub use bus::EventBus;
pub use types::WorkflowEvent;

#[cfg(test)]
mod tests;
