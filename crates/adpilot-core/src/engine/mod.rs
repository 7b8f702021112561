//! Engine - the stage graph and its driver
//!
//! This module contains:
//! - `stages`: the fixed stage set, the immutable stage table and run ceilings
//! - `planner`: turns a stage plus an intent into tool invocations
//! - `ranking`: campaign ranking for ranking intents
//! - `executor`: runs stages, records steps and collects payloads

mod executor;
mod planner;
mod ranking;
mod stages;

pub use executor::{CollectedPayloads, StageOutput, StageResult, WorkflowEngine};
pub use planner::{PlanContext, StagePlan, StagePlanner, ToolInvocation};
pub use ranking::rank_campaigns;
pub use stages::{EngineLimits, Stage, StageTable};
