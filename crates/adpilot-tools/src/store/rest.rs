//! PostgREST campaign store
//!
//! Speaks the PostgREST dialect used by Supabase: filters are query
//! parameters (`platform=eq.facebook`, `ctr=lt.2`), writes ask for the stored
//! representation back.

use super::CampaignStore;
use crate::campaign::{Campaign, CampaignFilter, CampaignUpdate, Comparison, NewCampaign};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for [`RestStore`]
#[derive(Clone)]
pub struct RestStoreConfig {
    /// Project URL (without `/rest/v1`)
    pub url: String,
    /// Service or anon key
    pub api_key: String,
    /// Table name
    pub table: String,
    /// Request timeout
    pub timeout: Duration,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for RestStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStoreConfig")
            .field("url", &self.url)
            .field("api_key", &adpilot_llm::util::mask_api_key(&self.api_key))
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RestStoreConfig {
    /// Create a configuration for the `campaigns` table
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            table: "campaigns".to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    /// Set the table name
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), self.table)
    }
}

/// Campaign store backed by a PostgREST endpoint
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

impl RestStore {
    /// Create a store
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Store(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "{}: {}",
                status,
                adpilot_llm::util::sanitize_api_error(&body)
            )));
        }
        Ok(response)
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Campaign>> {
        self.send(request)
            .await?
            .json::<Vec<Campaign>>()
            .await
            .map_err(|e| Error::Store(format!("unexpected row format: {}", e)))
    }
}

/// PostgREST query parameters for a filter
pub(crate) fn filter_params(filter: &CampaignFilter) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    if let Some(platform) = filter.platform {
        params.push(("platform".to_string(), format!("eq.{}", platform)));
    }
    if let Some(status) = filter.status {
        params.push(("status".to_string(), format!("eq.{}", status)));
    }
    for threshold in &filter.thresholds {
        let op = match threshold.comparison {
            Comparison::Below => "lt",
            Comparison::Above => "gt",
        };
        params.push((
            threshold.metric.as_str().to_string(),
            format!("{}.{}", op, threshold.value),
        ));
    }
    if let Some(name) = &filter.name_contains {
        params.push(("name".to_string(), format!("ilike.*{}*", name)));
    }
    if !filter.ids.is_empty() {
        params.push(("id".to_string(), format!("in.({})", filter.ids.join(","))));
    }
    if let Some(limit) = filter.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait::async_trait]
impl CampaignStore for RestStore {
    #[instrument(skip(self, filter), fields(filter = %filter))]
    async fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        let url = format!("{}?{}", self.config.endpoint(), encode_query(&filter_params(filter)));
        let rows = self.rows(self.client.get(url)).await?;
        debug!(count = rows.len(), "Listed campaigns");
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>> {
        let url = format!(
            "{}?select=*&id=eq.{}&limit=1",
            self.config.endpoint(),
            urlencoding::encode(id)
        );
        Ok(self.rows(self.client.get(url)).await?.into_iter().next())
    }

    async fn create(&self, campaign: NewCampaign) -> Result<Campaign> {
        campaign.validate()?;
        let id = format!(
            "{}_{}_{}",
            campaign.platform.id_prefix(),
            campaign.name.to_lowercase().replace(' ', "_"),
            chrono::Utc::now().timestamp()
        );
        let record = campaign.into_campaign(id);

        let request = self
            .client
            .post(self.config.endpoint())
            .header("Prefer", "return=representation")
            .json(&record);
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Store("insert returned no row".to_string()))
    }

    async fn update(&self, id: &str, update: &CampaignUpdate) -> Result<Option<Campaign>> {
        update.validate()?;
        // relative budget changes need the current value
        let Some(mut current) = self.get(id).await? else {
            return Ok(None);
        };
        update.apply(&mut current);

        let mut body = serde_json::Map::new();
        if update.status.is_some() {
            body.insert("status".into(), serde_json::json!(current.status));
        }
        if update.budget.is_some() || update.budget_factor.is_some() {
            body.insert("budget".into(), serde_json::json!(current.budget));
        }
        if update.name.is_some() {
            body.insert("name".into(), serde_json::json!(current.name));
        }

        let url = format!("{}?id=eq.{}", self.config.endpoint(), urlencoding::encode(id));
        let request = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(&body);
        Ok(self.rows(request).await?.into_iter().next())
    }
}
