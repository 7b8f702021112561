//! Grounding check on a generated answer
//!
//! One low-temperature call asks whether the answer's claims are backed by
//! the collected data. A failed or unreadable check counts as grounded.

use crate::engine::Stage;
use crate::tracker::StepRecord;
use adpilot_llm::{CompletionRequest, LlmProvider, Message};
use adpilot_tools::{Capability, Payload};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

const GRADER_SYSTEM_PROMPT: &str = "You check answers about Facebook and Instagram advertising \
campaigns against the data they were written from. Look for numbers, campaign ids or claims \
that the source data does not support. Reply with VALID when every claim is supported. Reply \
with UNSUPPORTED followed by one short sentence naming the claim when any is not.";

/// Caveat appended to an answer whose claims were not all supported
pub const GROUNDING_CAVEAT: &str = "Note: an automatic check found statements in this answer \
that the collected data does not support. Verify the figures before acting on them.";

const REASON_CHARS: usize = 300;

/// Verdict of the grounding check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingVerdict {
    /// Whether every claim is backed by the data
    pub grounded: bool,
    /// How sure the grader was
    pub confidence: f64,
    /// Grader's explanation, when it gave one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GroundingVerdict {
    /// Read a grader reply
    #[must_use]
    pub fn parse(reply: &str) -> Self {
        let upper = reply.to_uppercase();
        let flagged = ["UNSUPPORTED", "HALLUCINATION", "INVALID"]
            .iter()
            .any(|word| upper.contains(word));
        let decided = flagged || upper.contains("VALID");
        let reason = reply
            .trim()
            .splitn(2, char::is_whitespace)
            .nth(1)
            .map(|rest| rest.trim_start_matches([':', '-', ' ', '.']).trim())
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.chars().take(REASON_CHARS).collect());
        Self {
            grounded: !flagged,
            confidence: if decided { 0.9 } else { 0.5 },
            reason,
        }
    }
}

/// Outcome of one grounding check
#[derive(Debug, Clone)]
pub struct Grading {
    /// Verdict; `None` when the check itself failed
    pub verdict: Option<GroundingVerdict>,
    /// The grading step
    pub step: StepRecord,
}

/// Checks answers against their source data
pub struct GroundingGrader {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl GroundingGrader {
    /// Create a grader
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            model: String::new(),
        }
    }

    /// Set the model (empty means the provider default)
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Grade `answer` against `evidence` within `limit`.
    #[instrument(skip_all, fields(answer_chars = answer.chars().count()))]
    pub async fn grade(&self, question: &str, answer: &str, evidence: &str, limit: Duration) -> Grading {
        let arguments = serde_json::json!({
            "check": "grounding",
            "answer_chars": answer.chars().count(),
        });
        let prompt = format!(
            "ANSWER TO CHECK:\n{}\n\nQUESTION:\n{}\n\nSOURCE DATA:\n{}\n\nIs every claim in the answer supported by the source data?",
            answer.trim(),
            question.trim(),
            evidence
        );
        let request = CompletionRequest::new(self.model.clone())
            .with_message(Message::system(GRADER_SYSTEM_PROMPT))
            .with_message(Message::user(prompt))
            .with_temperature(0.1)
            .with_max_tokens(500);

        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = match tokio::time::timeout(limit, self.llm.complete(request)).await {
            Ok(Ok(response)) => Ok(GroundingVerdict::parse(&response.content)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("grounding check timed out after {}ms", limit.as_millis())),
        };
        let duration_ms = clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(verdict) => {
                debug!(grounded = verdict.grounded, confidence = verdict.confidence, "Answer graded");
                let summary = if verdict.grounded { "grounded" } else { "unsupported claims" };
                let step = StepRecord::ok(
                    Capability::ComposeAnswer,
                    Stage::Compile,
                    arguments,
                    Payload::Text(summary.to_string()).summary(),
                )
                .with_timing(started_at, duration_ms);
                Grading {
                    verdict: Some(verdict),
                    step,
                }
            }
            Err(reason) => {
                warn!(reason = %reason, "Grounding check failed, keeping answer");
                let step = StepRecord::error(Capability::ComposeAnswer, Stage::Compile, arguments, reason)
                    .with_timing(started_at, duration_ms);
                Grading { verdict: None, step }
            }
        }
    }
}
