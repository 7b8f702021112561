//! In-process campaign store

use super::CampaignStore;
use crate::campaign::{Campaign, CampaignFilter, CampaignUpdate, NewCampaign};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Campaign store held in memory
#[derive(Default)]
pub struct MemoryStore {
    campaigns: RwLock<Vec<Campaign>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given campaigns
    #[must_use]
    pub fn with_campaigns(campaigns: Vec<Campaign>) -> Self {
        Self {
            campaigns: RwLock::new(campaigns),
            next_id: AtomicU64::new(0),
        }
    }

    /// Load campaigns from a JSON array file
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut campaigns: Vec<Campaign> = serde_json::from_str(&raw)?;
        for campaign in &mut campaigns {
            // fixtures may omit the derived rates
            if campaign.roas == 0.0 && campaign.spend > 0.0 {
                campaign.recompute_rates();
            }
        }
        info!(path = %path.display(), count = campaigns.len(), "Loaded campaign fixture");
        Ok(Self::with_campaigns(campaigns))
    }

    /// Number of stored campaigns
    pub async fn len(&self) -> usize {
        self.campaigns.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.campaigns.read().await.is_empty()
    }

    fn generate_id(&self, campaign: &NewCampaign) -> String {
        let slug: String = campaign
            .name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!(
            "{}_{}_{}",
            campaign.platform.id_prefix(),
            slug.trim_matches('_'),
            seq
        )
    }
}

#[async_trait::async_trait]
impl CampaignStore for MemoryStore {
    async fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(filter.apply(campaigns.iter()))
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, campaign: NewCampaign) -> Result<Campaign> {
        campaign.validate()?;
        let id = self.generate_id(&campaign);
        let record = campaign.into_campaign(id);

        let mut campaigns = self.campaigns.write().await;
        if campaigns.iter().any(|c| c.id == record.id) {
            return Err(Error::Store(format!("duplicate campaign id '{}'", record.id)));
        }
        debug!(id = %record.id, "Created campaign");
        campaigns.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, update: &CampaignUpdate) -> Result<Option<Campaign>> {
        update.validate()?;
        let mut campaigns = self.campaigns.write().await;
        let Some(campaign) = campaigns.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        update.apply(campaign);
        debug!(id = %id, change = %update, "Updated campaign");
        Ok(Some(campaign.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignStatus, Platform};
    use std::io::Write;

    fn store() -> MemoryStore {
        MemoryStore::with_campaigns(vec![
            Campaign::new("fb_1", "Spring Launch", Platform::Facebook)
                .with_performance(100.0, 1000, 10, 1, 150.0),
            Campaign::new("ig_1", "Reels Push", Platform::Instagram)
                .with_performance(100.0, 1000, 40, 4, 500.0),
        ])
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let store = store();
        let ig = store
            .list(&CampaignFilter::new().with_platform(Platform::Instagram))
            .await
            .unwrap();
        assert_eq!(ig.len(), 1);
        assert_eq!(ig[0].id, "ig_1");

        assert!(store.get("fb_1").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_generates_prefixed_id() {
        let store = store();
        let created = store
            .create(NewCampaign::new("Black Friday!", Platform::Facebook, 500.0))
            .await
            .unwrap();
        assert_eq!(created.id, "fb_black_friday_1");
        assert_eq!(created.status, CampaignStatus::Draft);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_update() {
        let store = store();
        let updated = store
            .update("fb_1", &CampaignUpdate::status(CampaignStatus::Paused))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, CampaignStatus::Paused);

        let missing = store
            .update("nope", &CampaignUpdate::status(CampaignStatus::Paused))
            .await
            .unwrap();
        assert!(missing.is_none());

        assert!(store.update("fb_1", &CampaignUpdate::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_fixture_recomputes_rates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"fb_9","name":"Fixture","platform":"facebook","status":"active","spend":200.0,"impressions":4000,"clicks":80,"conversions":8,"revenue":600.0}}]"#
        )
        .unwrap();

        let store = MemoryStore::from_fixture(file.path()).unwrap();
        let campaign = store.get("fb_9").await.unwrap().unwrap();
        assert!((campaign.roas - 3.0).abs() < 1e-9);
        assert!((campaign.ctr - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fixture() {
        assert!(matches!(
            MemoryStore::from_fixture("/nonexistent/campaigns.json"),
            Err(Error::Io(_))
        ));
    }
}
