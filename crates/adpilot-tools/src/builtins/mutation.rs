//! Campaign write tools

use super::parse_args;
use crate::campaign::{CampaignFilter, CampaignUpdate, MutationSummary, NewCampaign};
use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::store::CampaignStore;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Upper bound on campaigns touched by one bulk update
const MAX_BULK: usize = 100;

fn update_schema() -> serde_json::Value {
    serde_json::json!({
        "status": { "type": "string", "enum": ["active", "paused", "completed", "draft"] },
        "budget": { "type": "number", "description": "New absolute budget" },
        "budget_factor": { "type": "number", "description": "Budget multiplier, e.g. 1.2 for +20%" },
        "name": { "type": "string" }
    })
}

/// Create a campaign
pub struct CreateCampaignTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl CreateCampaignTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::CreateCampaign,
            "Create a new campaign. New campaigns start as drafts unless a status is given.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "platform": { "type": "string", "enum": ["facebook", "instagram"] },
                "budget": { "type": "number" },
                "status": { "type": "string", "enum": ["active", "paused", "completed", "draft"] }
            },
            "required": ["name", "platform"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for CreateCampaignTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let new: NewCampaign = parse_args(input)?;
        new.validate()?;

        let change = format!("new {} campaign \"{}\"", new.platform, new.name);
        let created = self.store.create(new).await?;
        info!(id = %created.id, "Campaign created");

        let mut summary = MutationSummary::new("create", change);
        summary.affected.push(created);
        Ok(ToolResult::success(
            Payload::Mutation(summary),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    campaign_id: String,
    #[serde(flatten)]
    update: CampaignUpdate,
}

/// Update one campaign
pub struct UpdateCampaignTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl UpdateCampaignTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let mut properties = update_schema();
        properties["campaign_id"] = serde_json::json!({ "type": "string" });

        let definition = ToolDefinition::new(
            Capability::UpdateCampaign,
            "Update status, budget or name of one campaign.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["campaign_id"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateCampaignTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let args: UpdateArgs = parse_args(input)?;
        args.update.validate()?;

        let mut summary = MutationSummary::new("update", args.update.to_string());
        match self.store.update(&args.campaign_id, &args.update).await? {
            Some(campaign) => {
                info!(id = %campaign.id, change = %args.update, "Campaign updated");
                summary.affected.push(campaign);
            }
            None => {
                warn!(id = %args.campaign_id, "Campaign to update not found");
                summary.not_found.push(args.campaign_id);
            }
        }

        Ok(ToolResult::success(
            Payload::Mutation(summary),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct BulkArgs {
    #[serde(default)]
    filter: CampaignFilter,
    update: CampaignUpdate,
    /// Explicit opt-in to update every campaign
    #[serde(default)]
    all: bool,
}

/// Update every campaign matching a filter
pub struct BulkUpdateCampaignsTool {
    definition: ToolDefinition,
    store: Arc<dyn CampaignStore>,
}

impl BulkUpdateCampaignsTool {
    /// Create the tool
    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        let definition = ToolDefinition::new(
            Capability::BulkUpdateCampaigns,
            "Apply one update to every campaign matching a filter. The filter must select on \
             something unless `all` is set; an empty filter alone is rejected.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "filter": { "type": "object" },
                "update": { "type": "object", "properties": update_schema() },
                "all": { "type": "boolean", "description": "Update every campaign" }
            },
            "required": ["update"]
        }));
        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for BulkUpdateCampaignsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let mut args: BulkArgs = parse_args(input)?;
        if !args.filter.is_selective() && !args.all {
            return Err(Error::InvalidInput(
                "bulk update requires a selective filter".to_string(),
            ));
        }
        args.update.validate()?;
        args.filter.limit = Some(args.filter.limit.unwrap_or(MAX_BULK).min(MAX_BULK));

        let matching = self.store.list(&args.filter).await?;
        let mut summary = MutationSummary::new(
            "bulk_update",
            format!("{} where {}", args.update, args.filter),
        );

        for campaign in matching {
            match self.store.update(&campaign.id, &args.update).await? {
                Some(updated) => summary.affected.push(updated),
                None => summary.not_found.push(campaign.id),
            }
        }
        info!(
            count = summary.count(),
            change = %summary.change,
            "Bulk update applied"
        );

        Ok(ToolResult::success(
            Payload::Mutation(summary),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{Campaign, CampaignStatus, Platform};
    use crate::store::MemoryStore;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_campaigns(vec![
            Campaign::new("fb_low", "Low CTR", Platform::Facebook)
                .with_budget(100.0)
                .with_performance(50.0, 10_000, 100, 2, 60.0),
            Campaign::new("ig_low", "Also Low", Platform::Instagram)
                .with_performance(50.0, 10_000, 150, 2, 60.0),
            Campaign::new("ig_high", "High CTR", Platform::Instagram)
                .with_performance(50.0, 1_000, 80, 8, 400.0),
        ]))
    }

    fn mutation(result: ToolResult) -> MutationSummary {
        match result.payload {
            Some(Payload::Mutation(summary)) => summary,
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bulk_pause_low_ctr() {
        let store = store();
        let tool = BulkUpdateCampaignsTool::new(store.clone());
        let result = tool
            .execute(serde_json::json!({
                "filter": {"thresholds": [{"metric": "ctr", "comparison": "below", "value": 2.0}]},
                "update": {"status": "paused"}
            }))
            .await
            .unwrap();

        let summary = mutation(result);
        assert_eq!(summary.count(), 2);
        assert!(summary.affected.iter().all(|c| c.status == CampaignStatus::Paused));

        let untouched = store.get("ig_high").await.unwrap().unwrap();
        assert_eq!(untouched.status, CampaignStatus::Active);
    }

    #[tokio::test]
    async fn test_bulk_rejects_empty_filter() {
        let tool = BulkUpdateCampaignsTool::new(store());
        let err = tool
            .execute(serde_json::json!({"filter": {}, "update": {"status": "paused"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_bulk_all_requires_opt_in() {
        let store = store();
        let tool = BulkUpdateCampaignsTool::new(store.clone());
        let summary = mutation(
            tool.execute(serde_json::json!({"all": true, "update": {"status": "paused"}}))
                .await
                .unwrap(),
        );
        assert_eq!(summary.count(), 3);
        assert_eq!(summary.change, "status -> paused where all campaigns");
    }

    #[tokio::test]
    async fn test_bulk_by_ids() {
        let store = store();
        let tool = BulkUpdateCampaignsTool::new(store.clone());
        let summary = mutation(
            tool.execute(serde_json::json!({
                "filter": {"ids": ["ig_low", "ig_high"]},
                "update": {"status": "paused"}
            }))
            .await
            .unwrap(),
        );
        assert_eq!(summary.count(), 2);
        let untouched = store.get("fb_low").await.unwrap().unwrap();
        assert_eq!(untouched.status, CampaignStatus::Active);
    }

    #[tokio::test]
    async fn test_update_flattened_fields() {
        let tool = UpdateCampaignTool::new(store());
        let summary = mutation(
            tool.execute(serde_json::json!({"campaign_id": "fb_low", "budget_factor": 1.5}))
                .await
                .unwrap(),
        );
        assert_eq!(summary.count(), 1);
        assert!((summary.affected[0].budget - 150.0).abs() < 1e-9);

        let summary = mutation(
            tool.execute(serde_json::json!({"campaign_id": "fb_gone", "status": "paused"}))
                .await
                .unwrap(),
        );
        assert_eq!(summary.count(), 0);
        assert_eq!(summary.not_found, vec!["fb_gone".to_string()]);
    }

    #[tokio::test]
    async fn test_create() {
        let store = store();
        let tool = CreateCampaignTool::new(store.clone());
        let summary = mutation(
            tool.execute(serde_json::json!({"name": "Holiday", "platform": "instagram", "budget": 300.0}))
                .await
                .unwrap(),
        );
        assert_eq!(summary.action, "create");
        assert_eq!(summary.affected[0].status, CampaignStatus::Draft);
        assert_eq!(store.len().await, 4);
    }
}
