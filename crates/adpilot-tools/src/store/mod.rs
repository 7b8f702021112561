//! Store - campaign persistence
//!
//! This module contains:
//! - `CampaignStore`: the collaborator contract used by data and mutation tools
//! - `MemoryStore`: in-process store, optionally loaded from a JSON fixture
//! - `RestStore`: PostgREST (Supabase) backed store

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::{RestStore, RestStoreConfig};

use crate::campaign::{Campaign, CampaignFilter, CampaignUpdate, NewCampaign};
use crate::error::Result;

/// CRUD and filtering over campaign records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CampaignStore: Send + Sync {
    /// Campaigns matching the filter, in store order
    async fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>>;

    /// One campaign by id
    async fn get(&self, id: &str) -> Result<Option<Campaign>>;

    /// Insert a campaign and return the stored record
    async fn create(&self, campaign: NewCampaign) -> Result<Campaign>;

    /// Apply an update; `None` when the id does not exist
    async fn update(&self, id: &str, update: &CampaignUpdate) -> Result<Option<Campaign>>;
}
