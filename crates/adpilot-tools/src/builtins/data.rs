//! Campaign read tools

use super::parse_args;
use crate::campaign::{CampaignFilter, Platform};
use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::store::CampaignStore;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default number of campaigns per platform fetch
const DEFAULT_LIMIT: usize = 10;

/// Upper bound on any fetch
const MAX_LIMIT: usize = 100;

fn filter_schema() -> serde_json::Value {
    serde_json::json!({
        "platform": { "type": "string", "enum": ["facebook", "instagram"] },
        "status": { "type": "string", "enum": ["active", "paused", "completed", "draft"] },
        "thresholds": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "metric": { "type": "string" },
                    "comparison": { "type": "string", "enum": ["below", "above"] },
                    "value": { "type": "number" }
                },
                "required": ["metric", "comparison", "value"]
            }
        },
        "name_contains": { "type": "string" },
        "limit": { "type": "integer" }
    })
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    platform: Platform,
    #[serde(default)]
    limit: Option<usize>,
}

/// Campaigns of one platform
pub struct FetchCampaignsTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl FetchCampaignsTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::FetchCampaigns,
            "Fetch campaigns of one advertising platform with their performance metrics.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "platform": { "type": "string", "enum": ["facebook", "instagram"] },
                "limit": { "type": "integer", "description": "Maximum campaigns (default 10)" }
            },
            "required": ["platform"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for FetchCampaignsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let args: FetchArgs = parse_args(input)?;
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let filter = CampaignFilter::new()
            .with_platform(args.platform)
            .with_limit(limit);
        let campaigns = self.store.list(&filter).await?;
        debug!(platform = %args.platform, count = campaigns.len(), "Fetched campaigns");

        Ok(ToolResult::success(
            Payload::Campaigns(campaigns),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DetailArgs {
    campaign_id: String,
}

/// One campaign by id
pub struct CampaignDetailTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl CampaignDetailTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::CampaignDetail,
            "Get the full record of one campaign by id.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "campaign_id": { "type": "string" }
            },
            "required": ["campaign_id"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for CampaignDetailTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let args: DetailArgs = parse_args(input)?;

        let campaign = self
            .store
            .get(&args.campaign_id)
            .await?
            .ok_or_else(|| Error::Execution(format!("campaign '{}' not found", args.campaign_id)))?;

        Ok(ToolResult::success(
            Payload::Campaigns(vec![campaign]),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Campaigns matching a filter
pub struct ListCampaignsTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl ListCampaignsTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::ListCampaigns,
            "List campaigns matching platform, status, metric thresholds or a name substring.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": filter_schema(),
            "required": []
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for ListCampaignsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let mut filter: CampaignFilter = parse_args(input)?;
        filter.limit = Some(filter.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT));

        let campaigns = self.store.list(&filter).await?;
        debug!(filter = %filter, count = campaigns.len(), "Listed campaigns");

        Ok(ToolResult::success(
            Payload::Campaigns(campaigns),
            start.elapsed().as_millis() as u64,
        ))
    }
}
