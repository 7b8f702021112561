//! Capability - the fixed set of named tool capabilities
//!
//! Every tool registered by [`crate::register_builtins`] is addressed by one of
//! these names. `ComposeAnswer` is never registered; it names the
//! synthesizer's own generation call in step records.

use crate::registry::ToolCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named capability exposed by the tool layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Campaigns of one platform
    FetchCampaigns,
    /// One campaign by id
    CampaignDetail,
    /// Campaigns matching a filter
    ListCampaigns,
    /// Create a campaign
    CreateCampaign,
    /// Update one campaign
    UpdateCampaign,
    /// Update every campaign matching a filter
    BulkUpdateCampaigns,
    /// Ranked text search over the campaign corpus
    SearchCampaigns,
    /// Per-platform trend aggregation
    AnalyzeTrends,
    /// Web search
    WebSearch,
    /// Encyclopedia search
    EncyclopediaSearch,
    /// Generated performance analysis
    AnalyzePerformance,
    /// Generated marketing content
    GenerateContent,
    /// Generated strategy recommendations
    OptimizeStrategy,
    /// General marketing question answering
    MarketingAssistant,
    /// Final answer composition
    ComposeAnswer,
}

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 15] = [
        Self::FetchCampaigns,
        Self::CampaignDetail,
        Self::ListCampaigns,
        Self::CreateCampaign,
        Self::UpdateCampaign,
        Self::BulkUpdateCampaigns,
        Self::SearchCampaigns,
        Self::AnalyzeTrends,
        Self::WebSearch,
        Self::EncyclopediaSearch,
        Self::AnalyzePerformance,
        Self::GenerateContent,
        Self::OptimizeStrategy,
        Self::MarketingAssistant,
        Self::ComposeAnswer,
    ];

    /// Returns the tool name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchCampaigns => "fetch_campaigns",
            Self::CampaignDetail => "campaign_detail",
            Self::ListCampaigns => "list_campaigns",
            Self::CreateCampaign => "create_campaign",
            Self::UpdateCampaign => "update_campaign",
            Self::BulkUpdateCampaigns => "bulk_update_campaigns",
            Self::SearchCampaigns => "search_campaigns",
            Self::AnalyzeTrends => "analyze_trends",
            Self::WebSearch => "web_search",
            Self::EncyclopediaSearch => "encyclopedia_search",
            Self::AnalyzePerformance => "analyze_performance",
            Self::GenerateContent => "generate_content",
            Self::OptimizeStrategy => "optimize_strategy",
            Self::MarketingAssistant => "marketing_assistant",
            Self::ComposeAnswer => "compose_answer",
        }
    }

    /// Category used for timeout selection
    #[must_use]
    pub fn category(&self) -> ToolCategory {
        match self {
            Self::FetchCampaigns | Self::CampaignDetail | Self::ListCampaigns => ToolCategory::Data,
            Self::CreateCampaign | Self::UpdateCampaign | Self::BulkUpdateCampaigns => {
                ToolCategory::Mutation
            }
            Self::SearchCampaigns
            | Self::AnalyzeTrends
            | Self::WebSearch
            | Self::EncyclopediaSearch => ToolCategory::Search,
            Self::AnalyzePerformance
            | Self::GenerateContent
            | Self::OptimizeStrategy
            | Self::MarketingAssistant
            | Self::ComposeAnswer => ToolCategory::Generation,
        }
    }

    /// Whether the capability writes to the campaign store
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        self.category() == ToolCategory::Mutation
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::Error::NotFound(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_parse_back() {
        let mut names: Vec<_> = Capability::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Capability::ALL.len());

        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
        assert!("drop_table".parse::<Capability>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(Capability::FetchCampaigns.category(), ToolCategory::Data);
        assert_eq!(Capability::WebSearch.category(), ToolCategory::Search);
        assert_eq!(Capability::ComposeAnswer.category(), ToolCategory::Generation);
        assert!(Capability::BulkUpdateCampaigns.is_mutation());
        assert!(!Capability::ListCampaigns.is_mutation());
    }

    #[test]
    fn test_serde_uses_tool_names() {
        let json = serde_json::to_string(&Capability::BulkUpdateCampaigns).unwrap();
        assert_eq!(json, "\"bulk_update_campaigns\"");
    }
}
