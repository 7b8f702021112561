//! LLM-backed generation tools
//!
//! Each tool renders its arguments into a labelled prompt, sends it with a
//! fixed system instruction and returns the reply as [`Payload::Text`].

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use adpilot_llm::util::truncate_safe;
use adpilot_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Longest value accepted per prompt field
const MAX_FIELD_BYTES: usize = 8000;

/// Model parameters for generation tools
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model name (empty = provider default)
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply length cap
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 1200,
        }
    }
}

/// A generation capability backed by the LLM
pub struct LlmTool {
    definition: ToolDefinition,
    system_prompt: &'static str,
    fields: &'static [&'static str],
    llm: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl LlmTool {
    fn build(
        capability: Capability,
        description: &str,
        system_prompt: &'static str,
        fields: &'static [&'static str],
        required: &[&str],
        llm: Arc<dyn LlmProvider>,
        settings: &GenerationSettings,
    ) -> Self {
        let properties: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|f| ((*f).to_string(), serde_json::json!({ "type": "string" })))
            .collect();
        let definition = ToolDefinition::new(capability, description).with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required
            }),
        );
        Self {
            definition,
            system_prompt,
            fields,
            llm,
            settings: settings.clone(),
        }
    }

    /// `analyze_performance`: findings over campaign data
    #[must_use]
    pub fn analyze_performance(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings) -> Self {
        Self::build(
            Capability::AnalyzePerformance,
            "Analyze campaign performance data and report findings with recommendations.",
            "You are a marketing performance analyst. Analyze the campaign data provided. \
             Identify the strongest and weakest campaigns, explain the metrics driving \
             the difference and give concrete, prioritized recommendations.",
            &["question", "data", "trends"],
            &["data"],
            llm,
            settings,
        )
    }

    /// `generate_content`: ad copy and creative ideas
    #[must_use]
    pub fn generate_content(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings) -> Self {
        Self::build(
            Capability::GenerateContent,
            "Generate ad copy, captions and creative ideas for a campaign brief.",
            "You are a social media copywriter. Write platform-appropriate ad content for \
             the brief: a headline, primary text, a call to action and hashtag ideas.",
            &["brief", "platform", "target_audience", "context"],
            &["brief"],
            llm,
            settings,
        )
    }

    /// `optimize_strategy`: strategy recommendations from data and research
    #[must_use]
    pub fn optimize_strategy(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings) -> Self {
        Self::build(
            Capability::OptimizeStrategy,
            "Propose campaign strategy improvements from performance data and market research.",
            "You are a marketing strategist. Combine the campaign data and the market \
             research into fresh, actionable strategy ideas. Tie every idea to the data \
             or a cited trend.",
            &["goals", "data", "research"],
            &["data"],
            llm,
            settings,
        )
    }

    /// `marketing_assistant`: general marketing questions
    #[must_use]
    pub fn marketing_assistant(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings) -> Self {
        Self::build(
            Capability::MarketingAssistant,
            "Answer a general digital marketing question.",
            "You are a helpful digital marketing assistant. Answer the question directly \
             and concisely.",
            &["query", "context"],
            &["query"],
            llm,
            settings,
        )
    }

    /// Labelled user prompt from the known fields present in the input
    fn render_prompt(&self, input: &serde_json::Value) -> String {
        let mut prompt = String::new();
        for field in self.fields {
            let value = match input.get(*field) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
                Some(serde_json::Value::Null) | None => continue,
                Some(serde_json::Value::String(_)) => continue,
                Some(other) => other.to_string(),
            };
            let label = field.replace('_', " ");
            prompt.push_str(&format!(
                "{}:\n{}\n\n",
                label.to_uppercase(),
                truncate_safe(&value, MAX_FIELD_BYTES)
            ));
        }
        prompt.trim_end().to_string()
    }
}

#[async_trait::async_trait]
impl Tool for LlmTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let prompt = self.render_prompt(&input);
        if prompt.is_empty() {
            return Err(Error::InvalidInput("No prompt fields provided".to_string()));
        }

        let request = CompletionRequest::new(self.settings.model.clone())
            .with_message(Message::system(self.system_prompt))
            .with_message(Message::user(prompt))
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let response = self.llm.complete(request).await?;
        if response.content.trim().is_empty() {
            return Err(Error::Execution("model returned an empty reply".to_string()));
        }
        debug!(
            tool = %self.definition.capability,
            chars = response.content.len(),
            "Generation completed"
        );

        Ok(ToolResult::success(
            Payload::Text(response.content),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_llm::MockProvider;

    #[test]
    fn test_prompt_rendering_skips_missing_fields() {
        let tool = LlmTool::optimize_strategy(Arc::new(MockProvider::new()), &GenerationSettings::default());
        let prompt = tool.render_prompt(&serde_json::json!({
            "data": "fb_1 ROAS 3.2",
            "research": "",
            "unknown": "ignored"
        }));
        assert_eq!(prompt, "DATA:\nfb_1 ROAS 3.2");
    }

    #[tokio::test]
    async fn test_execute_sends_system_prompt() {
        let llm = MockProvider::new().with_responder(|req| {
            let system = req.system_prompt().unwrap_or_default();
            Ok(if system.contains("copywriter") {
                "Headline: Go bold".to_string()
            } else {
                "wrong prompt".to_string()
            })
        });
        let tool = LlmTool::generate_content(Arc::new(llm), &GenerationSettings::default());

        let result = tool
            .execute(serde_json::json!({"brief": "summer sneakers", "platform": "instagram"}))
            .await
            .unwrap();
        assert_eq!(result.payload, Some(Payload::Text("Headline: Go bold".to_string())));
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_tool_error() {
        let tool = LlmTool::marketing_assistant(Arc::new(MockProvider::failing()), &GenerationSettings::default());
        let err = tool
            .execute(serde_json::json!({"query": "what is ROAS?"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let llm = MockProvider::new();
        llm.add_response("   ");
        let tool = LlmTool::analyze_performance(Arc::new(llm), &GenerationSettings::default());
        let err = tool
            .execute(serde_json::json!({"data": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }
}
