//! Search and trend tools over the campaign corpus

use super::parse_args;
use crate::campaign::{Campaign, CampaignFilter, CampaignStatus, Metric, Platform};
use crate::capability::Capability;
use crate::error::Result;
use crate::payload::{Payload, PlatformTrend, Snippet};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::store::CampaignStore;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const DEFAULT_SEARCH_LIMIT: usize = 5;
const MAX_SEARCH_LIMIT: usize = 20;

/// BM25 term-frequency saturation
const K1: f64 = 1.2;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "are", "was", "what", "which", "how", "show", "me", "my", "our",
    "all", "any", "campaign", "campaigns", "about", "from", "that", "this", "have", "has",
];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn document(campaign: &Campaign) -> Vec<String> {
    tokenize(&format!(
        "{} {} {} {}",
        campaign.id, campaign.name, campaign.platform, campaign.status
    ))
}

/// Rank campaigns against a query by term overlap with BM25-style weighting.
///
/// Campaigns without any query term are dropped; an empty query ranks by ROAS.
pub(crate) fn rank_by_terms(campaigns: &[Campaign], query: &str, limit: usize) -> Vec<(f64, Campaign)> {
    let terms: HashSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() {
        let mut by_roas: Vec<_> = campaigns.iter().cloned().map(|c| (0.0, c)).collect();
        by_roas.sort_by(|a, b| b.1.roas.total_cmp(&a.1.roas));
        by_roas.truncate(limit);
        return by_roas;
    }

    let docs: Vec<Vec<String>> = campaigns.iter().map(document).collect();
    let n = docs.len() as f64;

    let mut scored: Vec<(f64, Campaign)> = campaigns
        .iter()
        .zip(&docs)
        .filter_map(|(campaign, doc)| {
            let score: f64 = terms
                .iter()
                .map(|term| {
                    let tf = doc.iter().filter(|t| *t == term).count() as f64;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let df = docs.iter().filter(|d| d.contains(term)).count() as f64;
                    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                    idf * tf * (K1 + 1.0) / (tf + K1)
                })
                .sum();
            (score > 0.0).then(|| (score, campaign.clone()))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.roas.total_cmp(&a.1.roas)));
    scored.truncate(limit);
    scored
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

/// Ranked text search over stored campaigns
pub struct SearchCampaignsTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl SearchCampaignsTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::SearchCampaigns,
            "Search campaigns by keywords in their id, name, platform and status.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "description": "Maximum results (default 5)" }
            },
            "required": ["query"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for SearchCampaignsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let args: SearchArgs = parse_args(input)?;
        let limit = args
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let corpus = self.store.list(&CampaignFilter::new()).await?;
        let ranked = rank_by_terms(&corpus, &args.query, limit);
        debug!(query = %args.query, corpus = corpus.len(), hits = ranked.len(), "Searched campaigns");

        let snippets = ranked
            .into_iter()
            .map(|(score, c)| {
                Snippet::new(c.name.clone(), c.render_line())
                    .with_source(c.id)
                    .with_score(score)
            })
            .collect();

        Ok(ToolResult::success(
            Payload::Snippets(snippets),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Aggregate campaigns of one platform
pub(crate) fn aggregate(platform: Platform, campaigns: &[Campaign]) -> PlatformTrend {
    let own: Vec<&Campaign> = campaigns.iter().filter(|c| c.platform == platform).collect();
    let spend: f64 = own.iter().map(|c| c.spend).sum();
    let revenue: f64 = own.iter().map(|c| c.revenue).sum();
    let clicks: u64 = own.iter().map(|c| c.clicks).sum();
    let impressions: u64 = own.iter().map(|c| c.impressions).sum();

    PlatformTrend {
        platform,
        campaigns: own.len(),
        active: own.iter().filter(|c| c.status == CampaignStatus::Active).count(),
        spend,
        revenue,
        conversions: own.iter().map(|c| c.conversions).sum(),
        roas: if spend > 0.0 { revenue / spend } else { 0.0 },
        ctr: if impressions > 0 {
            clicks as f64 / impressions as f64 * 100.0
        } else {
            0.0
        },
        top_campaign: own
            .iter()
            .max_by(|a, b| a.metric(Metric::Roas).total_cmp(&b.metric(Metric::Roas)))
            .map(|c| c.id.clone()),
    }
}

#[derive(Debug, Default, Deserialize)]
struct TrendArgs {
    #[serde(default)]
    platform: Option<Platform>,
}

/// Per-platform trend aggregation
pub struct AnalyzeTrendsTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl AnalyzeTrendsTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::AnalyzeTrends,
            "Aggregate spend, revenue, ROAS and CTR per platform across stored campaigns.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "platform": { "type": "string", "enum": ["facebook", "instagram"] }
            },
            "required": []
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for AnalyzeTrendsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let args: TrendArgs = parse_args(input)?;

        let mut filter = CampaignFilter::new();
        filter.platform = args.platform;
        let campaigns = self.store.list(&filter).await?;

        let trends: Vec<PlatformTrend> = Platform::ALL
            .iter()
            .filter(|p| args.platform.map_or(true, |only| only == **p))
            .map(|p| aggregate(*p, &campaigns))
            .filter(|t| t.campaigns > 0)
            .collect();

        Ok(ToolResult::success(
            Payload::Trends(trends),
            start.elapsed().as_millis() as u64,
        ))
    }
}
