//! Stage graph definitions

use crate::intent::{IntentCategory, IntentRecord, Requirement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One step of the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Read campaign data
    FetchData,
    /// Generated analysis
    Analyze,
    /// Web or encyclopedia research
    Research,
    /// Generated marketing content
    GenerateContent,
    /// Campaign writes
    Mutate,
    /// Answer synthesis
    Compile,
}

impl Stage {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchData => "fetch-data",
            Self::Analyze => "analyze",
            Self::Research => "research",
            Self::GenerateContent => "generate-content",
            Self::Mutate => "mutate",
            Self::Compile => "compile",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceilings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// Stages per run, compile included
    pub max_stages: usize,
    /// Tool calls per stage
    pub max_calls_per_stage: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_stages: 6,
            max_calls_per_stage: 3,
        }
    }
}

impl EngineLimits {
    /// Upper bound on tool calls in one run
    #[must_use]
    pub fn max_calls(&self) -> usize {
        self.max_stages * self.max_calls_per_stage
    }
}

/// Immutable intent-to-stages table
#[derive(Debug, Clone)]
pub struct StageTable {
    rows: HashMap<IntentCategory, Vec<Stage>>,
}

impl Default for StageTable {
    fn default() -> Self {
        use Stage::*;
        let rows = HashMap::from([
            (IntentCategory::InformationalRanking, vec![FetchData, Compile]),
            (IntentCategory::InformationalAnalysis, vec![FetchData, Analyze, Compile]),
            (IntentCategory::ActionMutation, vec![FetchData, Mutate, Compile]),
            (IntentCategory::Hybrid, vec![FetchData, Analyze, Mutate, Compile]),
            (IntentCategory::Brainstorm, vec![FetchData, Research, Analyze, Compile]),
        ]);
        Self { rows }
    }
}

impl StageTable {
    /// Stages for a category, as listed in the table
    #[must_use]
    pub fn row(&self, category: IntentCategory) -> &[Stage] {
        self.rows.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stages for an intent, with generate-content inserted before compile
    /// when content generation is required
    #[must_use]
    pub fn stages_for(&self, intent: &IntentRecord) -> Vec<Stage> {
        let mut stages = self.row(intent.category).to_vec();
        if stages.is_empty() {
            stages.push(Stage::Compile);
        }
        if intent.requires(Requirement::ContentGeneration) && !stages.contains(&Stage::GenerateContent) {
            let at = stages
                .iter()
                .position(|s| *s == Stage::Compile)
                .unwrap_or(stages.len());
            stages.insert(at, Stage::GenerateContent);
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Entities, IntentSource};

    fn intent(category: IntentCategory, wants_content: bool) -> IntentRecord {
        let entities = Entities {
            wants_content,
            ..Default::default()
        };
        IntentRecord::new(category, 0.7, entities, IntentSource::Keyword)
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::FetchData.to_string(), "fetch-data");
        assert_eq!(
            serde_json::to_string(&Stage::GenerateContent).unwrap(),
            "\"generate-content\""
        );
    }

    #[test]
    fn test_rows_end_with_compile() {
        let table = StageTable::default();
        for category in IntentCategory::ALL {
            let row = table.row(category);
            assert_eq!(row.first(), Some(&Stage::FetchData));
            assert_eq!(row.last(), Some(&Stage::Compile));
        }
        assert_eq!(
            table.row(IntentCategory::Brainstorm),
            &[Stage::FetchData, Stage::Research, Stage::Analyze, Stage::Compile]
        );
    }

    #[test]
    fn test_content_inserted_before_compile() {
        let table = StageTable::default();
        let stages = table.stages_for(&intent(IntentCategory::Hybrid, true));
        assert_eq!(
            stages,
            vec![
                Stage::FetchData,
                Stage::Analyze,
                Stage::Mutate,
                Stage::GenerateContent,
                Stage::Compile
            ]
        );
        assert!(stages.len() <= EngineLimits::default().max_stages);
    }

    #[test]
    fn test_limits() {
        assert_eq!(EngineLimits::default().max_calls(), 18);
    }
}
