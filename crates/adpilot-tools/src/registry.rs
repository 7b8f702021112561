//! Registry - Tool registration and discovery
//!
//! Tools are registered under their capability name and looked up by the
//! runner. Each tool carries a JSON schema; the default validation checks the
//! schema's `required` list before any I/O happens.

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Tool category, used to pick the per-call timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Campaign reads
    Data,
    /// Campaign writes
    Mutation,
    /// Corpus and web search
    Search,
    /// LLM-backed generation
    Generation,
}

impl ToolCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Mutation => "mutation",
            Self::Search => "search",
            Self::Generation => "generation",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Capability this tool provides
    pub capability: Capability,
    /// Human-readable description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(capability: Capability, description: impl Into<String>) -> Self {
        Self {
            capability,
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.capability.as_str()
    }

    /// Tool category
    #[must_use]
    pub fn category(&self) -> ToolCategory {
        self.capability.category()
    }

    /// Names listed under the schema's `required` key
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Typed output
    pub payload: Option<Payload>,
    /// Error message if failed
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(payload: Payload, duration_ms: u64) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        let object = input
            .as_object()
            .ok_or_else(|| Error::InvalidInput("Input must be an object".to_string()))?;

        for field in self.definition().required_fields() {
            match object.get(field) {
                None | Some(serde_json::Value::Null) => {
                    return Err(Error::InvalidInput(format!(
                        "Missing '{}' parameter",
                        field
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Registry for managing tools
pub struct ToolRegistry {
    tools: HashMap<Capability, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same capability
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let capability = tool.definition().capability;
        debug!(tool = %capability, "Registering tool");
        self.tools.insert(capability, tool);
    }

    /// Get a tool by capability
    #[must_use]
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn Tool>> {
        self.tools.get(&capability).cloned()
    }

    /// Get a tool by name
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Tool>> {
        name.parse::<Capability>().ok().and_then(|c| self.get(c))
    }

    /// Check if a capability is registered
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.tools.contains_key(&capability)
    }

    /// Registered capabilities in declaration order
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .filter(|c| self.has(*c))
            .collect()
    }

    /// Definitions in declaration order
    #[must_use]
    pub fn list_definitions(&self) -> Vec<&ToolDefinition> {
        Capability::ALL
            .iter()
            .filter_map(|c| self.tools.get(c))
            .map(|t| t.definition())
            .collect()
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        definition: ToolDefinition,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                definition: ToolDefinition::new(Capability::MarketingAssistant, "Echo the query")
                    .with_parameters(serde_json::json!({
                        "type": "object",
                        "properties": { "query": { "type": "string" } },
                        "required": ["query"]
                    })),
            }
        }
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
            let query = input["query"].as_str().unwrap_or_default().to_string();
            Ok(ToolResult::success(Payload::Text(query), 0))
        }
    }

    #[test]
    fn test_tool_result() {
        let success = ToolResult::success(Payload::Text("done".into()), 100);
        assert!(success.success);
        assert!(success.error.is_none());

        let failure = ToolResult::failure("test error", 50);
        assert!(!failure.success);
        assert!(failure.payload.is_none());
        assert_eq!(failure.error, Some("test error".to_string()));
    }

    #[test]
    fn test_default_validation_checks_required_fields() {
        let tool = EchoTool::new();
        assert!(tool.validate_input(&serde_json::json!({"query": "x"})).is_ok());
        assert!(matches!(
            tool.validate_input(&serde_json::json!({})),
            Err(Error::InvalidInput(_))
        ));
        assert!(tool.validate_input(&serde_json::json!({"query": null})).is_err());
        assert!(tool.validate_input(&serde_json::json!("query")).is_err());
    }

    #[test]
    fn test_registry() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool::new()));
        assert_eq!(registry.len(), 1);
        assert!(registry.has(Capability::MarketingAssistant));
        assert!(registry.get_by_name("marketing_assistant").is_some());
        assert!(registry.get_by_name("web_search").is_none());
        assert_eq!(registry.capabilities(), vec![Capability::MarketingAssistant]);
        assert_eq!(registry.list_definitions()[0].name(), "marketing_assistant");
    }
}
