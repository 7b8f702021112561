//! Intent types

use adpilot_tools::{
    CampaignFilter, CampaignStatus, CampaignUpdate, Metric, MetricThreshold, Platform,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// "Show me the top campaigns"
    InformationalRanking,
    /// "How are my campaigns doing?"
    InformationalAnalysis,
    /// "Pause campaigns with CTR below 2%"
    ActionMutation,
    /// Analysis plus a mutation
    Hybrid,
    /// "Give me fresh ideas"
    Brainstorm,
}

impl IntentCategory {
    /// Every category
    pub const ALL: [IntentCategory; 5] = [
        Self::InformationalRanking,
        Self::InformationalAnalysis,
        Self::ActionMutation,
        Self::Hybrid,
        Self::Brainstorm,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InformationalRanking => "informational_ranking",
            Self::InformationalAnalysis => "informational_analysis",
            Self::ActionMutation => "action_mutation",
            Self::Hybrid => "hybrid",
            Self::Brainstorm => "brainstorm",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "informational_ranking" | "ranking" => Ok(Self::InformationalRanking),
            "informational_analysis" | "analysis" => Ok(Self::InformationalAnalysis),
            "action_mutation" | "mutation" | "action" => Ok(Self::ActionMutation),
            "hybrid" => Ok(Self::Hybrid),
            "brainstorm" | "brainstorming" => Ok(Self::Brainstorm),
            _ => Err(format!("unknown intent category '{}'", s)),
        }
    }
}

/// Capability family a question needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Campaign reads
    DataFetch,
    /// Generated analysis
    Analysis,
    /// Web or encyclopedia research
    WebResearch,
    /// Generated marketing content
    ContentGeneration,
    /// Campaign writes
    Mutation,
}

/// Which tier produced the final classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    /// Trigger table only
    Keyword,
    /// Generative classifier
    Generative,
    /// Generative tier failed; keyword category with reduced confidence
    Fallback,
}

/// Requested change to campaigns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationAction {
    /// Set status to paused
    Pause,
    /// Set status to active
    Activate,
    /// Multiply the budget
    ScaleBudget {
        /// Multiplier
        factor: f64,
    },
    /// Set an absolute budget
    SetBudget {
        /// New budget
        amount: f64,
    },
    /// Create a campaign
    Create {
        /// Name, if given
        name: Option<String>,
        /// Budget, if given
        budget: Option<f64>,
    },
}

impl MutationAction {
    /// The update this action applies to existing campaigns
    #[must_use]
    pub fn to_update(&self) -> Option<CampaignUpdate> {
        match self {
            Self::Pause => Some(CampaignUpdate::status(CampaignStatus::Paused)),
            Self::Activate => Some(CampaignUpdate::status(CampaignStatus::Active)),
            Self::ScaleBudget { factor } => Some(CampaignUpdate::budget_factor(*factor)),
            Self::SetBudget { amount } => Some(CampaignUpdate {
                budget: Some(*amount),
                ..Default::default()
            }),
            Self::Create { .. } => None,
        }
    }
}

/// Entity hints extracted from the question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    /// Platforms named
    #[serde(default)]
    pub platforms: Vec<Platform>,
    /// Metric thresholds ("CTR below 2%")
    #[serde(default)]
    pub thresholds: Vec<MetricThreshold>,
    /// Status qualifier ("active campaigns")
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    /// Campaign ids mentioned
    #[serde(default)]
    pub campaign_ids: Vec<String>,
    /// Requested list size ("top 10")
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Metric to rank by
    #[serde(default)]
    pub ranking_metric: Option<Metric>,
    /// Rank worst performers first
    #[serde(default)]
    pub worst_first: bool,
    /// Requested mutation
    #[serde(default)]
    pub action: Option<MutationAction>,
    /// "all campaigns" / "every campaign" wording
    #[serde(default)]
    pub all_campaigns: bool,
    /// Quoted names
    #[serde(default)]
    pub quoted_names: Vec<String>,
    /// Topic words for research
    #[serde(default)]
    pub topics: Vec<String>,
    /// Content-generation wording present
    #[serde(default)]
    pub wants_content: bool,
}

fn union_into<T: PartialEq + Clone>(target: &mut Vec<T>, extra: &[T]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

impl Entities {
    /// Union with entities from the generative tier.
    ///
    /// Thresholds, status, actions and ranking hints stay as extracted here.
    pub fn merge_generative(&mut self, other: &Entities) {
        union_into(&mut self.platforms, &other.platforms);
        union_into(&mut self.campaign_ids, &other.campaign_ids);
        union_into(&mut self.topics, &other.topics);
    }

    /// Name used to select existing campaigns (create actions name a new one)
    fn selecting_name(&self) -> Option<&String> {
        match self.action {
            Some(MutationAction::Create { .. }) => None,
            _ => self.quoted_names.first(),
        }
    }

    /// Filter for reads: thresholds, status or a quoted name must be present
    #[must_use]
    pub fn filter(&self) -> Option<CampaignFilter> {
        let name = self.selecting_name();
        if self.thresholds.is_empty() && self.status.is_none() && name.is_none() {
            return None;
        }
        Some(self.build_filter())
    }

    /// Whether campaigns are selected by rank ("3 worst by CTR")
    #[must_use]
    pub fn ranked_selection(&self) -> bool {
        self.top_n.is_some() || self.worst_first || self.ranking_metric.is_some()
    }

    /// Whether an update targets campaigns chosen by rank rather than by id
    #[must_use]
    pub fn ranked_update(&self) -> bool {
        self.campaign_ids.is_empty()
            && self.ranked_selection()
            && self.action.as_ref().is_some_and(|a| a.to_update().is_some())
    }

    /// Filter for bulk writes: a single named platform is also enough
    #[must_use]
    pub fn mutation_filter(&self) -> Option<CampaignFilter> {
        self.filter().or_else(|| {
            (self.platforms.len() == 1).then(|| self.build_filter())
        })
    }

    fn build_filter(&self) -> CampaignFilter {
        let mut filter = CampaignFilter::new();
        if let [platform] = self.platforms.as_slice() {
            filter.platform = Some(*platform);
        }
        filter.status = self.status;
        filter.thresholds = self.thresholds.clone();
        filter.name_contains = self.selecting_name().cloned();
        filter
    }
}

/// Classified intent of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Category
    pub category: IntentCategory,
    /// Required capability families
    pub capabilities: BTreeSet<Requirement>,
    /// Confidence, within 0.0..=1.0
    pub confidence: f64,
    /// Extracted entities
    pub entities: Entities,
    /// Which tier decided
    pub source: IntentSource,
}

impl IntentRecord {
    /// Build a record, deriving capabilities and clamping confidence
    #[must_use]
    pub fn new(
        category: IntentCategory,
        confidence: f64,
        entities: Entities,
        source: IntentSource,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            capabilities: Self::derive_capabilities(category, &entities),
            category,
            confidence,
            entities,
            source,
        }
    }

    /// Capability families implied by a category and its entities
    #[must_use]
    pub fn derive_capabilities(category: IntentCategory, entities: &Entities) -> BTreeSet<Requirement> {
        use Requirement::*;
        let mut caps: BTreeSet<Requirement> = match category {
            IntentCategory::InformationalRanking => [DataFetch].into(),
            IntentCategory::InformationalAnalysis => [DataFetch, Analysis].into(),
            IntentCategory::ActionMutation => [Mutation].into(),
            IntentCategory::Hybrid => [DataFetch, Analysis, Mutation].into(),
            IntentCategory::Brainstorm => [DataFetch, WebResearch, Analysis].into(),
        };
        if category == IntentCategory::ActionMutation
            && (entities.mutation_filter().is_some() || entities.ranked_update())
        {
            caps.insert(DataFetch);
        }
        if entities.wants_content {
            caps.insert(ContentGeneration);
        }
        caps
    }

    /// Whether fetched campaigns are merged and ranked before later stages
    #[must_use]
    pub fn ranks_campaigns(&self) -> bool {
        match self.category {
            IntentCategory::InformationalRanking => true,
            IntentCategory::ActionMutation | IntentCategory::Hybrid => self.entities.ranked_update(),
            _ => false,
        }
    }

    /// Whether a capability family is required
    #[must_use]
    pub fn requires(&self, requirement: Requirement) -> bool {
        self.capabilities.contains(&requirement)
    }
}
