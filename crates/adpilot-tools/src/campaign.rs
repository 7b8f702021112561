//! Campaign data model
//!
//! Campaign records, filters and updates shared by the store, the data and
//! mutation adapters, and the workflow engine. Rate metrics (`ctr`,
//! `conversion_rate`) are percentages; `roas` is a ratio.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Advertising platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Facebook
    Facebook,
    /// Instagram
    Instagram,
}

impl Platform {
    /// Every known platform
    pub const ALL: [Platform; 2] = [Self::Facebook, Self::Instagram];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
        }
    }

    /// Short prefix used in generated campaign ids
    #[must_use]
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Facebook => "fb",
            Self::Instagram => "ig",
        }
    }

    /// Lenient parse accepting common abbreviations
    #[must_use]
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "facebook" | "fb" => Some(Self::Facebook),
            "instagram" | "ig" | "insta" => Some(Self::Instagram),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_loose(s).ok_or_else(|| Error::InvalidInput(format!("unknown platform '{}'", s)))
    }
}

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Running
    Active,
    /// Paused by an operator
    Paused,
    /// Finished
    Completed,
    /// Not yet launched
    Draft,
}

impl CampaignStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "draft" => Ok(Self::Draft),
            other => Err(Error::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

/// Numeric campaign metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Return on ad spend
    Roas,
    /// Click-through rate (%)
    Ctr,
    /// Cost per click
    Cpc,
    /// Conversion rate (%)
    ConversionRate,
    /// Conversions
    Conversions,
    /// Revenue
    Revenue,
    /// Spend
    Spend,
    /// Budget
    Budget,
    /// Clicks
    Clicks,
    /// Impressions
    Impressions,
}

impl Metric {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roas => "roas",
            Self::Ctr => "ctr",
            Self::Cpc => "cpc",
            Self::ConversionRate => "conversion_rate",
            Self::Conversions => "conversions",
            Self::Revenue => "revenue",
            Self::Spend => "spend",
            Self::Budget => "budget",
            Self::Clicks => "clicks",
            Self::Impressions => "impressions",
        }
    }

    /// Whether a smaller value ranks better
    #[must_use]
    pub fn lower_is_better(&self) -> bool {
        matches!(self, Self::Cpc)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "roas" | "return_on_ad_spend" => Ok(Self::Roas),
            "ctr" | "click_through_rate" => Ok(Self::Ctr),
            "cpc" | "cost_per_click" => Ok(Self::Cpc),
            "conversion_rate" | "cvr" => Ok(Self::ConversionRate),
            "conversions" => Ok(Self::Conversions),
            "revenue" => Ok(Self::Revenue),
            "spend" => Ok(Self::Spend),
            "budget" => Ok(Self::Budget),
            "clicks" => Ok(Self::Clicks),
            "impressions" => Ok(Self::Impressions),
            _ => Err(Error::InvalidInput(format!("unknown metric '{}'", s))),
        }
    }
}

/// Threshold comparison direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Strictly below
    Below,
    /// Strictly above
    Above,
}

/// A metric bound such as "CTR below 2%"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    /// Metric to compare
    pub metric: Metric,
    /// Direction
    pub comparison: Comparison,
    /// Bound, in the metric's own unit
    pub value: f64,
}

impl MetricThreshold {
    /// Create a threshold
    #[must_use]
    pub fn new(metric: Metric, comparison: Comparison, value: f64) -> Self {
        Self {
            metric,
            comparison,
            value,
        }
    }

    /// Check a campaign against the bound
    #[must_use]
    pub fn matches(&self, campaign: &Campaign) -> bool {
        let actual = campaign.metric(self.metric);
        match self.comparison {
            Comparison::Below => actual < self.value,
            Comparison::Above => actual > self.value,
        }
    }
}

impl fmt::Display for MetricThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.comparison {
            Comparison::Below => "<",
            Comparison::Above => ">",
        };
        write!(f, "{} {} {}", self.metric, op, self.value)
    }
}

/// A campaign record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign id
    #[serde(alias = "campaign_id")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Platform
    pub platform: Platform,
    /// Status
    pub status: CampaignStatus,
    /// Budget
    #[serde(default)]
    pub budget: f64,
    /// Amount spent
    #[serde(default)]
    pub spend: f64,
    /// Impressions
    #[serde(default)]
    pub impressions: u64,
    /// Clicks
    #[serde(default)]
    pub clicks: u64,
    /// Conversions
    #[serde(default)]
    pub conversions: u64,
    /// Revenue
    #[serde(default)]
    pub revenue: f64,
    /// Click-through rate (%)
    #[serde(default)]
    pub ctr: f64,
    /// Cost per click
    #[serde(default)]
    pub cpc: f64,
    /// Conversion rate (%)
    #[serde(default)]
    pub conversion_rate: f64,
    /// Return on ad spend
    #[serde(default)]
    pub roas: f64,
}

impl Campaign {
    /// Create an active campaign with zeroed metrics
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            platform,
            status: CampaignStatus::Active,
            budget: 0.0,
            spend: 0.0,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            revenue: 0.0,
            ctr: 0.0,
            cpc: 0.0,
            conversion_rate: 0.0,
            roas: 0.0,
        }
    }

    /// Set the status
    #[must_use]
    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the budget
    #[must_use]
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    /// Set raw counters and recompute the derived rates
    #[must_use]
    pub fn with_performance(
        mut self,
        spend: f64,
        impressions: u64,
        clicks: u64,
        conversions: u64,
        revenue: f64,
    ) -> Self {
        self.spend = spend;
        self.impressions = impressions;
        self.clicks = clicks;
        self.conversions = conversions;
        self.revenue = revenue;
        self.recompute_rates();
        self
    }

    /// Recompute ctr, cpc, conversion rate and roas from the counters
    pub fn recompute_rates(&mut self) {
        self.ctr = ratio(self.clicks as f64, self.impressions as f64) * 100.0;
        self.cpc = ratio(self.spend, self.clicks as f64);
        self.conversion_rate = ratio(self.conversions as f64, self.clicks as f64) * 100.0;
        self.roas = ratio(self.revenue, self.spend);
    }

    /// Value of a metric
    #[must_use]
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Roas => self.roas,
            Metric::Ctr => self.ctr,
            Metric::Cpc => self.cpc,
            Metric::ConversionRate => self.conversion_rate,
            Metric::Conversions => self.conversions as f64,
            Metric::Revenue => self.revenue,
            Metric::Spend => self.spend,
            Metric::Budget => self.budget,
            Metric::Clicks => self.clicks as f64,
            Metric::Impressions => self.impressions as f64,
        }
    }

    /// One-line rendering used in prompts and fallback answers
    #[must_use]
    pub fn render_line(&self) -> String {
        format!(
            "[{}] {} ({}, {}) · ROAS {:.2} · CTR {:.2}% · CPC ${:.2} · spend ${:.2} · conversions {}",
            self.id,
            self.name,
            self.platform,
            self.status,
            self.roas,
            self.ctr,
            self.cpc,
            self.spend,
            self.conversions
        )
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Selection criteria over campaigns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignFilter {
    /// Restrict to one platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Restrict to one status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    /// Metric bounds, all of which must hold
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<MetricThreshold>,
    /// Case-insensitive name substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    /// Restrict to these campaign ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    /// Maximum number of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl CampaignFilter {
    /// Create an empty filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Restrict to a status
    #[must_use]
    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a metric bound
    #[must_use]
    pub fn with_threshold(mut self, threshold: MetricThreshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    /// Restrict by name substring
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_contains = Some(name.into());
        self
    }

    /// Restrict to campaign ids
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Cap the number of results
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when the filter selects on something other than the limit
    #[must_use]
    pub fn is_selective(&self) -> bool {
        self.platform.is_some()
            || self.status.is_some()
            || !self.thresholds.is_empty()
            || self.name_contains.is_some()
            || !self.ids.is_empty()
    }

    /// Check one campaign (the limit is not considered)
    #[must_use]
    pub fn matches(&self, campaign: &Campaign) -> bool {
        if self.platform.is_some_and(|p| p != campaign.platform) {
            return false;
        }
        if self.status.is_some_and(|s| s != campaign.status) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&campaign.id) {
            return false;
        }
        if let Some(name) = &self.name_contains {
            if !campaign.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        self.thresholds.iter().all(|t| t.matches(campaign))
    }

    /// Select matching campaigns, honouring the limit
    #[must_use]
    pub fn apply<'a>(&self, campaigns: impl IntoIterator<Item = &'a Campaign>) -> Vec<Campaign> {
        campaigns
            .into_iter()
            .filter(|c| self.matches(c))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

impl fmt::Display for CampaignFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(platform) = self.platform {
            parts.push(format!("platform = {}", platform));
        }
        if let Some(status) = self.status {
            parts.push(format!("status = {}", status));
        }
        parts.extend(self.thresholds.iter().map(ToString::to_string));
        if let Some(name) = &self.name_contains {
            parts.push(format!("name ~ \"{}\"", name));
        }
        if !self.ids.is_empty() {
            parts.push(format!("id in [{}]", self.ids.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("all campaigns")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Changes to apply to a campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    /// New absolute budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Multiplier applied to the current budget (1.2 = +20%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_factor: Option<f64>,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CampaignUpdate {
    /// Status-only update
    #[must_use]
    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Relative budget update
    #[must_use]
    pub fn budget_factor(factor: f64) -> Self {
        Self {
            budget_factor: Some(factor),
            ..Default::default()
        }
    }

    /// True when nothing would change
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.budget.is_none()
            && self.budget_factor.is_none()
            && self.name.is_none()
    }

    /// Reject empty or out-of-range updates
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("update has no fields".to_string()));
        }
        if self.budget.is_some_and(|b| !(b.is_finite() && b >= 0.0)) {
            return Err(Error::InvalidInput("budget must be non-negative".to_string()));
        }
        if self.budget_factor.is_some_and(|f| !(f.is_finite() && f > 0.0)) {
            return Err(Error::InvalidInput("budget factor must be positive".to_string()));
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::InvalidInput("name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply to a campaign in place; an absolute budget wins over a factor
    pub fn apply(&self, campaign: &mut Campaign) {
        if let Some(status) = self.status {
            campaign.status = status;
        }
        if let Some(budget) = self.budget {
            campaign.budget = budget;
        } else if let Some(factor) = self.budget_factor {
            campaign.budget = (campaign.budget * factor * 100.0).round() / 100.0;
        }
        if let Some(name) = &self.name {
            campaign.name = name.clone();
        }
    }
}

impl fmt::Display for CampaignUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status -> {}", status));
        }
        if let Some(budget) = self.budget {
            parts.push(format!("budget -> ${:.2}", budget));
        } else if let Some(factor) = self.budget_factor {
            parts.push(format!("budget x{:.2}", factor));
        }
        if let Some(name) = &self.name {
            parts.push(format!("name -> \"{}\"", name));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Input for creating a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCampaign {
    /// Display name
    pub name: String,
    /// Platform
    pub platform: Platform,
    /// Budget
    #[serde(default)]
    pub budget: f64,
    /// Initial status (draft when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
}

impl NewCampaign {
    /// Create a draft campaign request
    #[must_use]
    pub fn new(name: impl Into<String>, platform: Platform, budget: f64) -> Self {
        Self {
            name: name.into(),
            platform,
            budget,
            status: None,
        }
    }

    /// Reject blank names and negative budgets
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("campaign name must not be empty".to_string()));
        }
        if !(self.budget.is_finite() && self.budget >= 0.0) {
            return Err(Error::InvalidInput("budget must be non-negative".to_string()));
        }
        Ok(())
    }

    /// Materialize into a record with the given id
    #[must_use]
    pub fn into_campaign(self, id: impl Into<String>) -> Campaign {
        let status = self.status.unwrap_or(CampaignStatus::Draft);
        Campaign::new(id, self.name, self.platform)
            .with_status(status)
            .with_budget(self.budget)
    }
}

/// Outcome of a mutation adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationSummary {
    /// Action performed (`create`, `update`, `bulk_update`)
    pub action: String,
    /// Human-readable description of the change
    pub change: String,
    /// Campaigns after the change
    pub affected: Vec<Campaign>,
    /// Requested ids that did not exist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_found: Vec<String>,
}

impl MutationSummary {
    /// Create a summary
    #[must_use]
    pub fn new(action: impl Into<String>, change: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            change: change.into(),
            affected: Vec::new(),
            not_found: Vec::new(),
        }
    }

    /// Number of campaigns changed
    #[must_use]
    pub fn count(&self) -> usize {
        self.affected.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Campaign {
        Campaign::new("fb_summer", "Summer Sale", Platform::Facebook)
            .with_budget(1000.0)
            .with_performance(500.0, 10_000, 150, 15, 2000.0)
    }

    #[test]
    fn test_derived_rates() {
        let c = sample();
        assert!((c.ctr - 1.5).abs() < 1e-9);
        assert!((c.roas - 4.0).abs() < 1e-9);
        assert!((c.conversion_rate - 10.0).abs() < 1e-9);
        assert!((c.cpc - 500.0 / 150.0).abs() < 1e-9);

        let empty = Campaign::new("x", "x", Platform::Instagram).with_performance(0.0, 0, 0, 0, 0.0);
        assert_eq!(empty.roas, 0.0);
        assert_eq!(empty.ctr, 0.0);
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("FB".parse::<Platform>().unwrap(), Platform::Facebook);
        assert_eq!(Platform::parse_loose(" Instagram "), Some(Platform::Instagram));
        assert!("tiktok".parse::<Platform>().is_err());
    }

    #[test]
    fn test_filter_matching() {
        let c = sample();
        let filter = CampaignFilter::new()
            .with_platform(Platform::Facebook)
            .with_threshold(MetricThreshold::new(Metric::Ctr, Comparison::Below, 2.0));
        assert!(filter.matches(&c));
        assert!(filter.is_selective());

        let filter = filter.with_status(CampaignStatus::Paused);
        assert!(!filter.matches(&c));

        assert!(CampaignFilter::new().with_name("summer").matches(&c));
        assert!(!CampaignFilter::new().with_limit(3).is_selective());
    }

    #[test]
    fn test_filter_limit() {
        let campaigns: Vec<_> = (0..5)
            .map(|i| Campaign::new(format!("fb_{i}"), "c", Platform::Facebook))
            .collect();
        let selected = CampaignFilter::new().with_limit(2).apply(&campaigns);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, "fb_0");
    }

    #[test]
    fn test_update_apply_and_validate() {
        let mut c = sample();
        let update = CampaignUpdate::budget_factor(1.2);
        update.validate().unwrap();
        update.apply(&mut c);
        assert!((c.budget - 1200.0).abs() < 1e-9);

        CampaignUpdate::status(CampaignStatus::Paused).apply(&mut c);
        assert_eq!(c.status, CampaignStatus::Paused);

        assert!(CampaignUpdate::default().validate().is_err());
        assert!(CampaignUpdate::budget_factor(0.0).validate().is_err());
    }

    #[test]
    fn test_new_campaign_defaults_to_draft() {
        let new = NewCampaign::new("Launch", Platform::Instagram, 250.0);
        new.validate().unwrap();
        let c = new.into_campaign("ig_launch_1");
        assert_eq!(c.status, CampaignStatus::Draft);
        assert_eq!(c.budget, 250.0);

        assert!(NewCampaign::new("  ", Platform::Facebook, 1.0).validate().is_err());
    }

    #[test]
    fn test_deserialize_campaign_id_alias() {
        let c: Campaign = serde_json::from_value(serde_json::json!({
            "campaign_id": "fb_1",
            "name": "Legacy",
            "platform": "facebook",
            "status": "active",
            "roas": 2.5
        }))
        .unwrap();
        assert_eq!(c.id, "fb_1");
        assert_eq!(c.roas, 2.5);
        assert_eq!(c.clicks, 0);
    }

    #[test]
    fn test_filter_display() {
        let filter = CampaignFilter::new()
            .with_threshold(MetricThreshold::new(Metric::Ctr, Comparison::Below, 2.0));
        assert_eq!(filter.to_string(), "ctr < 2");
        assert_eq!(CampaignFilter::new().to_string(), "all campaigns");
    }

    #[test]
    fn test_filter_by_ids() {
        let filter = CampaignFilter::new().with_ids(["fb_summer", "ig_2"]);
        assert!(filter.is_selective());
        assert!(filter.matches(&sample()));
        assert!(!filter.matches(&Campaign::new("fb_other", "Other", Platform::Facebook)));
        assert_eq!(filter.to_string(), "id in [fb_summer, ig_2]");
    }
}
