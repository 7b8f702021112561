//! Adpilot Tools - Capability adapters and execution engine
//!
//! This crate provides the tool layer used by the workflow engine:
//! - Capability: the fixed set of named capabilities
//! - Campaign / Payload: the typed data that flows between adapters
//! - Store: campaign persistence (in-memory and PostgREST)
//! - Registry / Runner: tool registration and timed execution
//! - Builtins: data, mutation, search and generation adapters

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod campaign;
pub mod capability;
pub mod error;
pub mod payload;
pub mod registry;
pub mod runner;
pub mod store;

pub use builtins::{register_builtins, BuiltinsConfig};
pub use campaign::{
    Campaign, CampaignFilter, CampaignStatus, CampaignUpdate, Comparison, Metric,
    MetricThreshold, MutationSummary, NewCampaign, Platform,
};
pub use capability::Capability;
pub use error::{Error, Result};
pub use payload::{Payload, PayloadSummary, PlatformTrend, Snippet};
pub use registry::{Tool, ToolCategory, ToolDefinition, ToolRegistry, ToolResult};
pub use runner::{ExecutionResult, RunnerConfig, ToolRunner};
pub use store::{CampaignStore, MemoryStore, RestStore, RestStoreConfig};
