//! Result synthesizer - one answer from every collected payload
//!
//! Generation gets the question, a bounded excerpt per stage and explicit
//! "unavailable" markers. When generation fails the collected payloads are
//! listed verbatim instead.

use crate::engine::{CollectedPayloads, Stage, StageOutput, StageResult};
use crate::intent::IntentRecord;
use crate::tracker::StepRecord;
use adpilot_llm::{CompletionRequest, LlmProvider, Message};
use adpilot_tools::{Campaign, Capability, Payload};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Default per-stage excerpt size in characters
pub const DEFAULT_EXCERPT_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "\n…(truncated)";

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a marketing assistant for Facebook and Instagram \
advertising campaigns. Answer the user's question directly from the collected data. Lead with \
the answer, then the supporting detail. When you mention a campaign, cite its id in brackets. \
If a section is marked unavailable, say that part could not be retrieved. Never invent numbers \
that are not in the data. When campaigns were changed, state how many.";

const FALLBACK_PREFACE: &str =
    "Sorry, I couldn't generate a complete answer right now. Here is the data that was collected:";

/// Outcome of synthesis
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Final answer text, without footer
    pub answer: Option<String>,
    /// Whether the answer was generated (false for the template fallback)
    pub generated: bool,
    /// Why generation failed
    pub failure: Option<String>,
    /// The `compose_answer` step
    pub step: StepRecord,
}

/// Composes the final answer
pub struct ResultSynthesizer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    excerpt_chars: usize,
}

impl ResultSynthesizer {
    /// Create a synthesizer with default settings
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            model: String::new(),
            temperature: 0.3,
            max_tokens: 1500,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }

    /// Set the model (empty means the provider default)
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the reply length cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-stage excerpt size
    #[must_use]
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars.max(1);
        self
    }

    /// Compose the answer within `limit`.
    #[instrument(skip_all, fields(stages = collected.stages().len()))]
    pub async fn compile(
        &self,
        question: &str,
        intent: &IntentRecord,
        collected: &CollectedPayloads,
        limit: Duration,
    ) -> Synthesis {
        let prompt = self.build_prompt(question, intent, collected);
        let arguments = serde_json::json!({
            "stages": collected.stages().len(),
            "prompt_chars": prompt.chars().count(),
        });

        let request = CompletionRequest::new(self.model.clone())
            .with_message(Message::system(SYNTHESIS_SYSTEM_PROMPT))
            .with_message(Message::user(prompt))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = match tokio::time::timeout(limit, self.llm.complete(request)).await {
            Ok(Ok(response)) if !response.content.trim().is_empty() => Ok(response.content),
            Ok(Ok(_)) => Err("model returned an empty answer".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("answer generation timed out after {}ms", limit.as_millis())),
        };
        let duration_ms = clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                let answer = match apology(collected) {
                    Some(preface) => format!("{}\n\n{}", preface, text.trim()),
                    None => text.trim().to_string(),
                };
                debug!(chars = answer.len(), "Answer generated");
                let step = StepRecord::ok(
                    Capability::ComposeAnswer,
                    Stage::Compile,
                    arguments,
                    Payload::Text(answer.clone()).summary(),
                )
                .with_timing(started_at, duration_ms);
                Synthesis {
                    answer: Some(answer),
                    generated: true,
                    failure: None,
                    step,
                }
            }
            Err(reason) => {
                warn!(reason = %reason, "Answer generation failed, using template");
                let step = StepRecord::error(Capability::ComposeAnswer, Stage::Compile, arguments, reason.clone())
                    .with_timing(started_at, duration_ms);
                Synthesis {
                    answer: fallback_answer(collected),
                    generated: false,
                    failure: Some(reason),
                    step,
                }
            }
        }
    }

    /// Template answer without calling the model
    #[must_use]
    pub fn template(&self, collected: &CollectedPayloads, reason: impl Into<String>) -> Synthesis {
        let reason = reason.into();
        let step = StepRecord::error(
            Capability::ComposeAnswer,
            Stage::Compile,
            serde_json::json!({ "stages": collected.stages().len() }),
            reason.clone(),
        );
        Synthesis {
            answer: fallback_answer(collected),
            generated: false,
            failure: Some(reason),
            step,
        }
    }

    /// Generation prompt: question, per-stage excerpts, instructions
    #[must_use]
    pub fn build_prompt(&self, question: &str, intent: &IntentRecord, collected: &CollectedPayloads) -> String {
        let question = question.trim();
        let mut prompt = format!(
            "QUESTION:\n{}\n\nREQUEST TYPE: {}\n\nCOLLECTED DATA:\n",
            if question.is_empty() { "(no question given)" } else { question },
            intent.category
        );
        prompt.push_str(&self.evidence(intent, collected));
        prompt.push_str(
            "INSTRUCTIONS:\nAnswer the question directly and concisely. Prefer concrete campaign \
             ids and numbers from the data above. Mention any unavailable sections.",
        );
        prompt
    }

    /// Per-stage excerpts exactly as generation sees them
    #[must_use]
    pub fn evidence(&self, intent: &IntentRecord, collected: &CollectedPayloads) -> String {
        let mut text = String::new();
        if collected.stages().is_empty() {
            text.push_str("(no data was collected)\n");
        }
        for result in collected.stages() {
            text.push_str(&format!("## {}\n", result.stage));
            let section = match &result.output {
                StageOutput::Payloads(_) => {
                    let ranked = intent.ranks_campaigns() && result.stage == Stage::FetchData;
                    excerpt(&render_for_prompt(result, ranked), self.excerpt_chars)
                }
                StageOutput::Unavailable => "(unavailable: every call in this stage failed)".to_string(),
                StageOutput::Skipped => "(skipped: nothing to do)".to_string(),
            };
            text.push_str(&section);
            text.push_str("\n\n");
        }
        text
    }
}

/// Apology preface when most attempted stages degraded
fn apology(collected: &CollectedPayloads) -> Option<String> {
    let attempted = collected.attempted_count();
    let degraded = collected.degraded_count();
    (attempted > 0 && degraded * 2 > attempted).then(|| {
        format!(
            "Sorry, I could only partially complete this request: {} of {} steps returned no data, \
             so the answer below may be incomplete.",
            degraded, attempted
        )
    })
}

fn best_first(campaigns: &[Campaign]) -> Vec<Campaign> {
    let mut sorted = campaigns.to_vec();
    sorted.sort_by(|a, b| b.roas.partial_cmp(&a.roas).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

fn render_for_prompt(result: &StageResult, already_ranked: bool) -> String {
    let StageOutput::Payloads(payloads) = &result.output else {
        return String::new();
    };
    payloads
        .iter()
        .filter(|p| p.is_usable())
        .map(|payload| match payload {
            Payload::Campaigns(list) if !already_ranked => Payload::Campaigns(best_first(list)).render(),
            other => other.render(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keep the head of `text`, at most `max_chars` characters
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}{}", head, TRUNCATION_MARKER)
}

/// Verbatim listing of every usable payload, `None` when there is none
fn fallback_answer(collected: &CollectedPayloads) -> Option<String> {
    if !collected.has_usable() {
        return None;
    }
    let mut answer = String::from(FALLBACK_PREFACE);
    for result in collected.stages() {
        let body = match &result.output {
            StageOutput::Payloads(_) if result.is_usable() => render_for_prompt(result, true),
            StageOutput::Skipped => continue,
            _ => "(unavailable)".to_string(),
        };
        answer.push_str(&format!("\n\n## {}\n{}", result.stage, body));
    }
    Some(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Entities, IntentCategory, IntentSource};
    use adpilot_llm::MockProvider;
    use adpilot_tools::Platform;

    fn intent(category: IntentCategory) -> IntentRecord {
        IntentRecord::new(category, 0.8, Entities::default(), IntentSource::Keyword)
    }

    fn campaigns() -> Vec<Campaign> {
        vec![
            Campaign::new("fb_low", "Low", Platform::Facebook).with_performance(100.0, 1000, 10, 1, 50.0),
            Campaign::new("ig_high", "High", Platform::Instagram).with_performance(100.0, 1000, 10, 1, 400.0),
        ]
    }

    fn collected(outputs: Vec<(Stage, StageOutput)>) -> CollectedPayloads {
        let mut collected = CollectedPayloads::default();
        for (stage, output) in outputs {
            collected.push(StageResult {
                stage,
                output,
                ok_calls: 0,
                failed_calls: 0,
            });
        }
        collected
    }

    #[test]
    fn test_prompt_orders_campaigns_and_marks_unavailable() {
        let synthesizer = ResultSynthesizer::new(Arc::new(MockProvider::new()));
        let collected = collected(vec![
            (Stage::FetchData, StageOutput::Payloads(vec![Payload::Campaigns(campaigns())])),
            (Stage::Analyze, StageOutput::Unavailable),
        ]);
        let prompt = synthesizer.build_prompt("how are we doing?", &intent(IntentCategory::InformationalAnalysis), &collected);

        let high = prompt.find("ig_high").unwrap();
        let low = prompt.find("fb_low").unwrap();
        assert!(high < low);
        assert!(prompt.contains("## analyze\n(unavailable"));
    }

    #[test]
    fn test_excerpt_cuts_tail() {
        let text = "a".repeat(50);
        let cut = excerpt(&text, 10);
        assert!(cut.starts_with("aaaaaaaaaa\n"));
        assert!(cut.ends_with("(truncated)"));
        assert_eq!(excerpt("short", 10), "short");
    }

    #[tokio::test]
    async fn test_generated_answer_with_apology() {
        let llm = MockProvider::new();
        llm.add_response("Instagram leads.");
        let synthesizer = ResultSynthesizer::new(Arc::new(llm));
        let collected = collected(vec![
            (Stage::FetchData, StageOutput::Payloads(vec![Payload::Campaigns(campaigns())])),
            (Stage::Analyze, StageOutput::Unavailable),
            (Stage::Research, StageOutput::Unavailable),
        ]);

        let synthesis = synthesizer
            .compile("q", &intent(IntentCategory::Brainstorm), &collected, Duration::from_secs(5))
            .await;
        let answer = synthesis.answer.unwrap();
        assert!(answer.starts_with("Sorry, I could only partially complete"));
        assert!(answer.ends_with("Instagram leads."));
        assert!(synthesis.generated);
        assert_eq!(synthesis.step.tool, Capability::ComposeAnswer);
    }

    #[tokio::test]
    async fn test_fallback_lists_payloads_verbatim() {
        let synthesizer = ResultSynthesizer::new(Arc::new(MockProvider::failing()));
        let collected = collected(vec![
            (Stage::FetchData, StageOutput::Payloads(vec![Payload::Campaigns(campaigns())])),
            (Stage::Mutate, StageOutput::Skipped),
        ]);

        let synthesis = synthesizer
            .compile("q", &intent(IntentCategory::InformationalRanking), &collected, Duration::from_secs(5))
            .await;
        let answer = synthesis.answer.unwrap();
        assert!(answer.starts_with(FALLBACK_PREFACE));
        assert!(answer.contains("[fb_low]"));
        assert!(!answer.contains("## mutate"));
        assert!(!synthesis.generated);
        assert!(synthesis.failure.is_some());
    }

    #[tokio::test]
    async fn test_no_answer_without_usable_payloads() {
        let synthesizer = ResultSynthesizer::new(Arc::new(MockProvider::failing()));
        let collected = collected(vec![(Stage::FetchData, StageOutput::Unavailable)]);
        let synthesis = synthesizer
            .compile("q", &intent(IntentCategory::Hybrid), &collected, Duration::from_secs(5))
            .await;
        assert!(synthesis.answer.is_none());
    }

    #[test]
    fn test_template_skips_model() {
        let llm = MockProvider::new();
        let calls = llm.clone();
        let synthesizer = ResultSynthesizer::new(Arc::new(llm));
        let collected = collected(vec![(
            Stage::FetchData,
            StageOutput::Payloads(vec![Payload::Text("notes".into())]),
        )]);
        let synthesis = synthesizer.template(&collected, "run cancelled");
        assert_eq!(calls.call_count(), 0);
        assert_eq!(synthesis.failure.as_deref(), Some("run cancelled"));
        assert!(synthesis.answer.unwrap().contains("notes"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_uses_fallback() {
        let llm = MockProvider::new().with_delay(Duration::from_secs(30));
        let synthesizer = ResultSynthesizer::new(Arc::new(llm));
        let collected = collected(vec![(
            Stage::FetchData,
            StageOutput::Payloads(vec![Payload::Text("notes".into())]),
        )]);
        let synthesis = synthesizer
            .compile("q", &intent(IntentCategory::Hybrid), &collected, Duration::from_secs(1))
            .await;
        assert!(synthesis.failure.unwrap().contains("timed out"));
        assert!(synthesis.answer.unwrap().contains("notes"));
    }
}
