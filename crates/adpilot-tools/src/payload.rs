//! Payload - typed adapter output
//!
//! Adapters decode whatever their collaborator returns into a [`Payload`]
//! before handing it back, so the engine and the synthesizer never parse
//! free text.

use crate::campaign::{Campaign, MutationSummary, Platform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ranked text snippet from a search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Title
    pub title: String,
    /// Snippet text
    pub content: String,
    /// Source URL or identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Relevance score (higher is better)
    #[serde(default)]
    pub score: f64,
}

impl Snippet {
    /// Create a snippet
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: None,
            score: 0.0,
        }
    }

    /// Set the source
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the score
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// Aggregated performance of one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTrend {
    /// Platform
    pub platform: Platform,
    /// Number of campaigns
    pub campaigns: usize,
    /// Number of active campaigns
    pub active: usize,
    /// Total spend
    pub spend: f64,
    /// Total revenue
    pub revenue: f64,
    /// Total conversions
    pub conversions: u64,
    /// Revenue / spend over all campaigns
    pub roas: f64,
    /// Clicks / impressions over all campaigns (%)
    pub ctr: f64,
    /// Best campaign by ROAS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_campaign: Option<String>,
}

/// Typed output of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Campaign records
    Campaigns(Vec<Campaign>),
    /// Result of a mutation
    Mutation(MutationSummary),
    /// Search snippets
    Snippets(Vec<Snippet>),
    /// Per-platform aggregates
    Trends(Vec<PlatformTrend>),
    /// Generated text
    Text(String),
}

/// Compact description of a payload, safe to log and store in step records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSummary {
    /// Payload kind
    pub kind: String,
    /// Number of items
    pub items: usize,
    /// Length of the rendered form in characters
    pub chars: usize,
}

impl fmt::Display for PayloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} items, {} chars", self.kind, self.items, self.chars)
    }
}

impl Payload {
    /// Payload kind name
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Campaigns(_) => "campaigns",
            Self::Mutation(_) => "mutation",
            Self::Snippets(_) => "snippets",
            Self::Trends(_) => "trends",
            Self::Text(_) => "text",
        }
    }

    /// Number of items carried
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Campaigns(c) => c.len(),
            Self::Mutation(m) => m.count(),
            Self::Snippets(s) => s.len(),
            Self::Trends(t) => t.len(),
            Self::Text(t) => usize::from(!t.trim().is_empty()),
        }
    }

    /// Whether the payload carries anything worth reporting.
    ///
    /// A mutation that touched zero campaigns is still a usable answer.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self {
            Self::Mutation(_) => true,
            _ => self.item_count() > 0,
        }
    }

    /// Summary for step records
    #[must_use]
    pub fn summary(&self) -> PayloadSummary {
        PayloadSummary {
            kind: self.kind().to_string(),
            items: self.item_count(),
            chars: self.render().chars().count(),
        }
    }

    /// Plain-text rendering, most relevant content first
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Campaigns(campaigns) => {
                if campaigns.is_empty() {
                    return "No campaigns found.".to_string();
                }
                campaigns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}. {}", i + 1, c.render_line()))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Self::Mutation(summary) => {
                let mut out = format!(
                    "{} campaign(s) changed by {} ({})",
                    summary.count(),
                    summary.action,
                    summary.change
                );
                for campaign in &summary.affected {
                    out.push_str(&format!(
                        "\n- [{}] {} now {} with budget ${:.2}",
                        campaign.id, campaign.name, campaign.status, campaign.budget
                    ));
                }
                if !summary.not_found.is_empty() {
                    out.push_str(&format!("\nNot found: {}", summary.not_found.join(", ")));
                }
                out
            }
            Self::Snippets(snippets) => {
                if snippets.is_empty() {
                    return "No search results.".to_string();
                }
                snippets
                    .iter()
                    .map(|s| match &s.source {
                        Some(source) => format!("- {}: {} ({})", s.title, s.content, source),
                        None => format!("- {}: {}", s.title, s.content),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Self::Trends(trends) => trends
                .iter()
                .map(|t| {
                    format!(
                        "- {}: {} campaigns ({} active) · spend ${:.2} · revenue ${:.2} · ROAS {:.2} · CTR {:.2}% · conversions {}{}",
                        t.platform,
                        t.campaigns,
                        t.active,
                        t.spend,
                        t.revenue,
                        t.roas,
                        t.ctr,
                        t.conversions,
                        t.top_campaign
                            .as_deref()
                            .map(|id| format!(" · top {}", id))
                            .unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Text(text) => text.trim().to_string(),
        }
    }
}
