//! Orchestrator assembly
//!
//! Builds the LLM provider, campaign store, tool registry and orchestrator
//! from an [`AppConfig`].

use super::config::{AppConfig, StoreBackend};
use super::validation::STORE_KEY_VAR;
use adpilot_core::{EngineLimits, JsonlRunLog, Orchestrator, OrchestratorConfig};
use adpilot_llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use adpilot_tools::builtins::GenerationSettings;
use adpilot_tools::{
    register_builtins, BuiltinsConfig, CampaignStore, MemoryStore, RestStore, RestStoreConfig,
    RunnerConfig, ToolRegistry, ToolRunner,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Workflow settings as an orchestrator configuration
pub fn orchestrator_config(config: &AppConfig) -> OrchestratorConfig {
    let workflow = &config.workflow;
    let mut orchestrator = OrchestratorConfig::new()
        .with_max_run(Duration::from_secs(workflow.max_run_secs))
        .with_classifier_timeout(Duration::from_secs(workflow.classifier_timeout_secs))
        .with_generation_timeout(Duration::from_secs(workflow.generation_timeout_secs))
        .with_synthesis_grace(Duration::from_secs(workflow.synthesis_grace_secs))
        .with_limits(EngineLimits {
            max_stages: workflow.max_stages,
            max_calls_per_stage: workflow.max_calls_per_stage,
        })
        .with_excerpt_chars(workflow.stage_excerpt_chars)
        .with_model(config.llm.model.clone())
        .with_synthesis_temperature(workflow.synthesis_temperature)
        .with_default_top_n(workflow.default_top_n)
        .with_grounding_check(workflow.grounding_check);
    orchestrator.synthesis_max_tokens = workflow.synthesis_max_tokens;
    orchestrator
}

/// OpenAI-compatible provider; `OPENAI_API_KEY` is required
pub fn build_llm(config: &AppConfig) -> adpilot_core::Result<Arc<dyn LlmProvider>> {
    let llm_config = OpenAiConfig::from_env()?
        .with_base_url(config.llm.base_url.clone())
        .with_model(config.llm.model.clone())
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    Ok(Arc::new(OpenAiProvider::new(llm_config)?))
}

/// Campaign store for the configured backend
pub fn build_store(config: &AppConfig) -> Result<Arc<dyn CampaignStore>> {
    match config.store.backend {
        StoreBackend::Memory => match &config.store.fixture {
            Some(path) if std::path::Path::new(path).exists() => {
                let store = MemoryStore::from_fixture(path)
                    .with_context(|| format!("Failed to load campaign fixture {}", path))?;
                Ok(Arc::new(store))
            }
            Some(path) => {
                tracing::warn!(path = %path, "Campaign fixture not found, starting empty");
                Ok(Arc::new(MemoryStore::new()))
            }
            None => Ok(Arc::new(MemoryStore::new())),
        },
        StoreBackend::Rest => {
            let key = std::env::var(STORE_KEY_VAR)
                .with_context(|| format!("{} is not set", STORE_KEY_VAR))?;
            let store = RestStore::new(
                RestStoreConfig::new(config.store.url.clone(), key).with_table(config.store.table.clone()),
            )
            .context("Failed to build REST campaign store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Registry with every built-in tool the environment supports
pub fn build_registry(
    config: &AppConfig,
    store: Arc<dyn CampaignStore>,
    llm: Option<Arc<dyn LlmProvider>>,
) -> Result<ToolRegistry> {
    let mut builtins = BuiltinsConfig::new(store)
        .with_encyclopedia(config.tools.encyclopedia)
        .with_generation(GenerationSettings {
            model: config.llm.model.clone(),
            temperature: config.tools.generation_temperature,
            ..Default::default()
        });
    if let Some(llm) = llm {
        builtins = builtins.with_llm(llm);
    }
    if let Some(key) = std::env::var("TAVILY_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
    {
        builtins = builtins.with_tavily_key(key);
    }

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &builtins).context("Failed to register tools")?;
    Ok(registry)
}

/// Tool runner with the configured timeouts
pub fn build_runner(config: &AppConfig, registry: ToolRegistry) -> ToolRunner {
    let runner_config = RunnerConfig::new(Duration::from_secs(config.tools.data_timeout_secs))
        .with_generation_timeout(Duration::from_secs(config.tools.generation_timeout_secs));
    ToolRunner::new(Arc::new(registry), runner_config)
}

/// Fully wired orchestrator
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    super::validation::validate_config(config)?;

    let llm = build_llm(config)?;
    let store = build_store(config)?;
    let registry = build_registry(config, store, Some(llm.clone()))?;
    info!(tools = registry.len(), "Tools registered");

    let runner = build_runner(config, registry);
    let mut orchestrator = Orchestrator::new(llm, runner, orchestrator_config(config))?;
    if config.run_log.enabled {
        orchestrator = orchestrator.with_run_log(Arc::new(JsonlRunLog::new(&config.run_log.path)));
    }
    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_llm::MockProvider;
    use adpilot_tools::Capability;

    #[test]
    fn test_orchestrator_config_mapping() {
        let mut config = AppConfig::default();
        config.workflow.max_run_secs = 45;
        config.workflow.max_stages = 4;
        config.workflow.synthesis_max_tokens = 800;
        config.workflow.grounding_check = true;

        let mapped = orchestrator_config(&config);
        assert_eq!(mapped.max_run, Duration::from_secs(45));
        assert_eq!(mapped.limits.max_stages, 4);
        assert_eq!(mapped.synthesis_max_tokens, 800);
        assert!(mapped.grounding_check);
        assert_eq!(mapped.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_memory_store_from_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaigns.json");
        std::fs::write(
            &path,
            r#"[{"id": "fb_a", "name": "A", "platform": "facebook", "status": "active", "spend": 10, "revenue": 30}]"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.store.fixture = Some(path.display().to_string());
        let store = build_store(&config).unwrap();
        let campaign = store.get("fb_a").await.unwrap().unwrap();
        assert!((campaign.roas - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_registry_without_llm_has_no_generation_tools() {
        let mut config = AppConfig::default();
        config.tools.encyclopedia = false;
        let store: Arc<dyn CampaignStore> = Arc::new(MemoryStore::new());

        let registry = build_registry(&config, store.clone(), None).unwrap();
        assert!(registry.has(Capability::FetchCampaigns));
        assert!(!registry.has(Capability::AnalyzePerformance));

        let registry = build_registry(&config, store, Some(Arc::new(MockProvider::new()))).unwrap();
        assert!(registry.has(Capability::GenerateContent));
    }
}
