//! Execution tracker - append-only log of tool calls in one run

use crate::engine::Stage;
use adpilot_tools::{Capability, PayloadSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest argument rendering kept in summaries
const ARGS_SUMMARY_CHARS: usize = 120;

/// Outcome of one tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Returned a payload
    Ok,
    /// Failed, timed out or was aborted
    Error,
    /// Not issued
    Skipped,
}

impl StepStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

/// One tool call, as recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Issue order within the run, starting at 1
    pub sequence: usize,
    /// Capability called
    pub tool: Capability,
    /// Stage that issued the call
    pub stage: Stage,
    /// Arguments sent
    pub arguments: serde_json::Value,
    /// Outcome
    pub status: StepStatus,
    /// Summary of the payload (never the payload itself)
    pub output_summary: Option<PayloadSummary>,
    /// Error or skip reason
    pub error: Option<String>,
    /// Issue time
    pub started_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl StepRecord {
    fn base(tool: Capability, stage: Stage, arguments: serde_json::Value, status: StepStatus) -> Self {
        Self {
            sequence: 0,
            tool,
            stage,
            arguments,
            status,
            output_summary: None,
            error: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Successful call
    #[must_use]
    pub fn ok(
        tool: Capability,
        stage: Stage,
        arguments: serde_json::Value,
        summary: PayloadSummary,
    ) -> Self {
        Self {
            output_summary: Some(summary),
            ..Self::base(tool, stage, arguments, StepStatus::Ok)
        }
    }

    /// Failed call
    #[must_use]
    pub fn error(
        tool: Capability,
        stage: Stage,
        arguments: serde_json::Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::base(tool, stage, arguments, StepStatus::Error)
        }
    }

    /// Call that was planned but not issued
    #[must_use]
    pub fn skipped(tool: Capability, stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::base(tool, stage, serde_json::json!({}), StepStatus::Skipped)
        }
    }

    /// Set timing
    #[must_use]
    pub fn with_timing(mut self, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        self.started_at = started_at;
        self.duration_ms = duration_ms;
        self
    }

    /// Compact single-line rendering of the arguments
    #[must_use]
    pub fn args_summary(&self) -> String {
        let rendered = self.arguments.to_string();
        if rendered.chars().count() <= ARGS_SUMMARY_CHARS {
            rendered
        } else {
            let head: String = rendered.chars().take(ARGS_SUMMARY_CHARS).collect();
            format!("{}…", head)
        }
    }
}

/// Aggregate counts over a run's records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records of any status
    pub tool_count: usize,
    /// Successful calls
    pub ok_count: usize,
    /// Failed calls
    pub error_count: usize,
    /// Skipped calls
    pub skipped_count: usize,
    /// Wall-clock time since run start
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Calls actually issued
    #[must_use]
    pub fn issued(&self) -> usize {
        self.ok_count + self.error_count
    }
}

/// Ordered, append-only list of step records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTracker {
    records: Vec<StepRecord>,
}

impl ExecutionTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning its sequence number
    pub fn record(&mut self, mut step: StepRecord) -> usize {
        step.sequence = self.records.len() + 1;
        let sequence = step.sequence;
        self.records.push(step);
        sequence
    }

    /// Records in insertion order
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counts and elapsed time
    #[must_use]
    pub fn summary(&self, started_at: DateTime<Utc>) -> RunSummary {
        let count = |status| self.records.iter().filter(|r| r.status == status).count();
        RunSummary {
            tool_count: self.records.len(),
            ok_count: count(StepStatus::Ok),
            error_count: count(StepStatus::Error),
            skipped_count: count(StepStatus::Skipped),
            elapsed_ms: (Utc::now() - started_at).num_milliseconds().max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_tools::Payload;

    #[test]
    fn test_sequence_and_order() {
        let mut tracker = ExecutionTracker::new();
        let first = tracker.record(StepRecord::ok(
            Capability::FetchCampaigns,
            Stage::FetchData,
            serde_json::json!({"platform": "facebook"}),
            Payload::Text("x".into()).summary(),
        ));
        let second = tracker.record(StepRecord::error(
            Capability::FetchCampaigns,
            Stage::FetchData,
            serde_json::json!({"platform": "instagram"}),
            "timeout",
        ));
        tracker.record(StepRecord::skipped(
            Capability::UpdateCampaign,
            Stage::Mutate,
            "no mutation requested",
        ));

        assert_eq!((first, second), (1, 2));
        let tools: Vec<_> = tracker.records().iter().map(|r| r.sequence).collect();
        assert_eq!(tools, vec![1, 2, 3]);

        let summary = tracker.summary(Utc::now());
        assert_eq!(summary.tool_count, 3);
        assert_eq!(summary.ok_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.skipped_count, 1);
        assert_eq!(summary.issued(), 2);
    }

    #[test]
    fn test_args_summary_is_bounded() {
        let step = StepRecord::error(
            Capability::MarketingAssistant,
            Stage::Analyze,
            serde_json::json!({"query": "x".repeat(500)}),
            "boom",
        );
        assert!(step.args_summary().chars().count() <= ARGS_SUMMARY_CHARS + 1);
    }
}
