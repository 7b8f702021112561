//! Application configuration types
//!
//! Mirrors `config/default.toml`. Secrets are not part of this tree; they
//! come from the environment at build time of each collaborator.

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub run_log: RunLogConfig,
}

/// Chat-completions endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

/// Run budget and stage ceilings (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Wall-clock budget per run in seconds
    #[serde(default = "default_max_run_secs")]
    pub max_run_secs: u64,
    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Time granted to answer generation after the budget is spent
    #[serde(default = "default_synthesis_grace_secs")]
    pub synthesis_grace_secs: u64,
    #[serde(default = "default_max_stages")]
    pub max_stages: usize,
    #[serde(default = "default_max_calls_per_stage")]
    pub max_calls_per_stage: usize,
    #[serde(default = "default_stage_excerpt_chars")]
    pub stage_excerpt_chars: usize,
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_synthesis_temperature")]
    pub synthesis_temperature: f32,
    #[serde(default = "default_synthesis_max_tokens")]
    pub synthesis_max_tokens: u32,
    #[serde(default)]
    pub grounding_check: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_run_secs: default_max_run_secs(),
            classifier_timeout_secs: default_classifier_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            synthesis_grace_secs: default_synthesis_grace_secs(),
            max_stages: default_max_stages(),
            max_calls_per_stage: default_max_calls_per_stage(),
            stage_excerpt_chars: default_stage_excerpt_chars(),
            default_top_n: default_top_n(),
            synthesis_temperature: default_synthesis_temperature(),
            synthesis_max_tokens: default_synthesis_max_tokens(),
            grounding_check: false,
        }
    }
}

fn default_max_run_secs() -> u64 {
    120
}
fn default_classifier_timeout_secs() -> u64 {
    15
}
fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_synthesis_grace_secs() -> u64 {
    5
}
fn default_max_stages() -> usize {
    6
}
fn default_max_calls_per_stage() -> usize {
    3
}
fn default_stage_excerpt_chars() -> usize {
    2000
}
fn default_top_n() -> usize {
    10
}
fn default_synthesis_temperature() -> f32 {
    0.3
}
fn default_synthesis_max_tokens() -> u32 {
    1500
}

/// Tool runner and built-in tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_data_timeout_secs")]
    pub data_timeout_secs: u64,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,
    /// Register Wikipedia search
    #[serde(default = "default_true")]
    pub encyclopedia: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            data_timeout_secs: default_data_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            generation_temperature: default_generation_temperature(),
            encyclopedia: true,
        }
    }
}

fn default_data_timeout_secs() -> u64 {
    30
}
fn default_generation_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// Campaign store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, optionally seeded from a fixture
    #[default]
    Memory,
    /// PostgREST/Supabase table
    Rest,
}

/// Campaign store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON fixture for the memory backend
    #[serde(default)]
    pub fixture: Option<String>,
    /// Project URL for the rest backend
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            fixture: None,
            url: String::new(),
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "campaigns".to_string()
}

/// Finished-run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_run_log_path")]
    pub path: String,
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_run_log_path(),
        }
    }
}

fn default_run_log_path() -> String {
    "data/runs.jsonl".to_string()
}
