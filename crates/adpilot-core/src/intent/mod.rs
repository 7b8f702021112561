//! Intent - question classification
//!
//! This module contains:
//! - `types`: intent records, categories and extracted entities
//! - `keywords`: the trigger table and regex entity extraction (tier 1)
//! - `classifier`: tier-1 and generative (tier 2) classification with fallbacks

mod classifier;
mod keywords;
mod types;

pub use classifier::{Classification, IntentClassifier};
pub use keywords::{KeywordMatch, TriggerGroup, TriggerTable};
pub use types::{Entities, IntentCategory, IntentRecord, IntentSource, MutationAction, Requirement};
