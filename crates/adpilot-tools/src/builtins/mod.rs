//! Built-in capability adapters
//!
//! - data: campaign reads
//! - mutation: campaign writes
//! - corpus: ranked search and trend aggregation over the store
//! - web: Tavily and Wikipedia search
//! - generation: LLM-backed analysis and content tools

mod corpus;
mod data;
mod generation;
mod mutation;
mod web;

pub use corpus::{AnalyzeTrendsTool, SearchCampaignsTool};
pub use data::{CampaignDetailTool, FetchCampaignsTool, ListCampaignsTool};
pub use generation::{GenerationSettings, LlmTool};
pub use mutation::{BulkUpdateCampaignsTool, CreateCampaignTool, UpdateCampaignTool};
pub use web::{TavilySearchTool, WikipediaSearchTool};

use crate::error::{Error, Result};
use crate::registry::ToolRegistry;
use crate::store::CampaignStore;
use adpilot_llm::LlmProvider;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Collaborators handed to the built-in tools
#[derive(Clone)]
pub struct BuiltinsConfig {
    /// Campaign store used by data, mutation and corpus tools
    pub store: Arc<dyn CampaignStore>,
    /// LLM for generation tools; generation tools are skipped when absent
    pub llm: Option<Arc<dyn LlmProvider>>,
    /// Model settings for generation tools
    pub generation: GenerationSettings,
    /// Tavily key; `web_search` is skipped when absent
    pub tavily_api_key: Option<String>,
    /// Register `encyclopedia_search`
    pub encyclopedia: bool,
}

impl BuiltinsConfig {
    /// Create a configuration with only the store
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self {
            store,
            llm: None,
            generation: GenerationSettings::default(),
            tavily_api_key: None,
            encyclopedia: true,
        }
    }

    /// Set the LLM provider
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set generation settings
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    /// Set the Tavily key
    #[must_use]
    pub fn with_tavily_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Enable or disable encyclopedia search
    #[must_use]
    pub fn with_encyclopedia(mut self, enabled: bool) -> Self {
        self.encyclopedia = enabled;
        self
    }
}

/// Register every built-in tool the configuration can support
pub fn register_builtins(registry: &mut ToolRegistry, config: &BuiltinsConfig) -> Result<()> {
    let store = &config.store;

    registry.register(Arc::new(FetchCampaignsTool::new(store.clone())));
    registry.register(Arc::new(CampaignDetailTool::new(store.clone())));
    registry.register(Arc::new(ListCampaignsTool::new(store.clone())));

    registry.register(Arc::new(CreateCampaignTool::new(store.clone())));
    registry.register(Arc::new(UpdateCampaignTool::new(store.clone())));
    registry.register(Arc::new(BulkUpdateCampaignsTool::new(store.clone())));

    registry.register(Arc::new(SearchCampaignsTool::new(store.clone())));
    registry.register(Arc::new(AnalyzeTrendsTool::new(store.clone())));

    if let Some(key) = &config.tavily_api_key {
        registry.register(Arc::new(TavilySearchTool::new(key.clone())?));
    }
    if config.encyclopedia {
        registry.register(Arc::new(WikipediaSearchTool::new()?));
    }

    if let Some(llm) = &config.llm {
        let settings = &config.generation;
        registry.register(Arc::new(LlmTool::analyze_performance(llm.clone(), settings)));
        registry.register(Arc::new(LlmTool::generate_content(llm.clone(), settings)));
        registry.register(Arc::new(LlmTool::optimize_strategy(llm.clone(), settings)));
        registry.register(Arc::new(LlmTool::marketing_assistant(llm.clone(), settings)));
    }

    Ok(())
}

/// Decode tool input into a typed argument bundle
pub(crate) fn parse_args<T: DeserializeOwned>(input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| Error::InvalidInput(e.to_string()))
}
