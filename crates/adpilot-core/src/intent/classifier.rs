//! Two-tier intent classifier
//!
//! Tier 1 is the [`TriggerTable`]; tier 2 asks the LLM for a JSON verdict.
//! Classification never fails: generative errors fall back to tier 1 and the
//! reason is reported through [`Classification::degraded`].

use super::keywords::{KeywordMatch, TriggerTable};
use super::types::{Entities, IntentCategory, IntentRecord, IntentSource};
use adpilot_llm::{CompletionRequest, LlmProvider, Message};
use adpilot_tools::Platform;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default generative classification timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Confidence assigned when the generative reply cannot be parsed
const PARSE_FAILURE_CONFIDENCE: f64 = 0.3;

/// Generative confidence needed to override tier 1
const OVERRIDE_CONFIDENCE: f64 = 0.5;

/// Confidence assumed when the verdict omits one; below the override bar
const MISSING_CONFIDENCE: f64 = 0.3;

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an intent classifier for a social media advertising assistant \
that manages Facebook and Instagram campaigns.
Classify the user's question into exactly one category:
- informational_ranking: list or rank campaigns (top, best, worst)
- informational_analysis: explain or analyze performance
- action_mutation: create, pause, activate or change budgets of campaigns
- hybrid: analysis combined with a change to campaigns
- brainstorm: fresh ideas, trends, creative inspiration
Respond with only a JSON object of the form:
{\"category\": \"...\", \"confidence\": 0.0, \"platforms\": [], \"campaign_ids\": [], \"topics\": []}";

/// Result of classification
#[derive(Debug, Clone)]
pub struct Classification {
    /// The intent
    pub intent: IntentRecord,
    /// Why the generative tier was not used, if it failed
    pub degraded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerativeVerdict {
    category: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    platforms: Vec<String>,
    #[serde(default)]
    campaign_ids: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
}

impl GenerativeVerdict {
    fn entities(&self) -> Entities {
        let mut entities = Entities::default();
        for name in &self.platforms {
            if let Some(platform) = Platform::parse_loose(name) {
                if !entities.platforms.contains(&platform) {
                    entities.platforms.push(platform);
                }
            }
        }
        entities.campaign_ids = self
            .campaign_ids
            .iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect();
        entities.topics = self
            .topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        entities
    }
}

/// Find the first balanced JSON object in free text
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_verdict(reply: &str) -> std::result::Result<(IntentCategory, f64, Entities), String> {
    let json = first_json_object(reply).ok_or_else(|| "no JSON object in reply".to_string())?;
    let verdict: GenerativeVerdict =
        serde_json::from_str(json).map_err(|e| format!("invalid classifier JSON: {}", e))?;
    let category = verdict.category.parse::<IntentCategory>()?;
    let confidence = verdict.confidence.unwrap_or(MISSING_CONFIDENCE);
    Ok((category, confidence, verdict.entities()))
}

/// Keyword plus generative intent classifier
pub struct IntentClassifier {
    triggers: TriggerTable,
    llm: Arc<dyn LlmProvider>,
    model: String,
    timeout: Duration,
}

impl IntentClassifier {
    /// Create a classifier with the default trigger table
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            triggers: TriggerTable::default(),
            llm,
            model: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the trigger table
    #[must_use]
    pub fn with_triggers(mut self, triggers: TriggerTable) -> Self {
        self.triggers = triggers;
        self
    }

    /// Set the model (empty means the provider default)
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the generative timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trigger table in use
    #[must_use]
    pub fn triggers(&self) -> &TriggerTable {
        &self.triggers
    }

    /// Classify with the configured timeout
    pub async fn classify(&self, question: &str) -> Classification {
        self.classify_within(question, self.timeout).await
    }

    /// Classify, giving the generative tier at most `limit`
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn classify_within(&self, question: &str, limit: Duration) -> Classification {
        let keyword = self.triggers.classify(question);

        if question.trim().is_empty() {
            return Classification {
                intent: IntentRecord::new(
                    keyword.resolved_category(),
                    0.0,
                    keyword.entities,
                    IntentSource::Fallback,
                ),
                degraded: None,
            };
        }

        let limit = limit.min(self.timeout);
        let request = CompletionRequest::new(self.model.clone())
            .with_message(Message::system(CLASSIFIER_SYSTEM_PROMPT))
            .with_message(Message::user(question))
            .with_temperature(0.0)
            .with_max_tokens(300);

        let reply = match tokio::time::timeout(limit, self.llm.complete(request)).await {
            Ok(Ok(response)) => response.content,
            Ok(Err(e)) => {
                warn!(error = %e, "Generative classification failed, using keywords");
                return Self::fallback(keyword, 0.0, format!("classifier error: {}", e));
            }
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Generative classification timed out");
                return Self::fallback(
                    keyword,
                    0.0,
                    format!("classifier timed out after {}ms", limit.as_millis()),
                );
            }
        };

        match parse_verdict(&reply) {
            Ok((category, confidence, entities)) => Self::combine(keyword, category, confidence, &entities),
            Err(reason) => {
                warn!(reason = %reason, "Unparsable classifier reply, using keywords");
                Self::fallback(keyword, PARSE_FAILURE_CONFIDENCE, reason)
            }
        }
    }

    fn fallback(keyword: KeywordMatch, confidence: f64, reason: String) -> Classification {
        Classification {
            intent: IntentRecord::new(
                keyword.resolved_category(),
                confidence,
                keyword.entities,
                IntentSource::Fallback,
            ),
            degraded: Some(reason),
        }
    }

    fn combine(
        keyword: KeywordMatch,
        category: IntentCategory,
        confidence: f64,
        generative: &Entities,
    ) -> Classification {
        let keyword_category = keyword.resolved_category();
        let keyword_confidence = keyword.confidence;
        let mut entities = keyword.entities;
        entities.merge_generative(generative);

        let (final_category, final_confidence, source) = if category == keyword_category {
            (category, keyword_confidence.max(confidence), IntentSource::Generative)
        } else if confidence >= OVERRIDE_CONFIDENCE {
            (category, confidence, IntentSource::Generative)
        } else {
            (keyword_category, keyword_confidence, IntentSource::Keyword)
        };

        debug!(
            keyword = %keyword_category,
            generative = %category,
            chosen = %final_category,
            confidence = final_confidence,
            "Intent classified"
        );

        Classification {
            intent: IntentRecord::new(final_category, final_confidence, entities, source),
            degraded: None,
        }
    }
}
