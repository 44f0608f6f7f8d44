//! Plan tiers, feature gates and the free-tier usage counter.

use thiserror::Error;

pub mod handlers;
pub mod models;
pub mod tracker;

pub use models::{Feature, PlanTier, UsageState};

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("You've reached the free usage limit ({limit} analyses). Upgrade to Premium for unlimited analyses.")]
    UsageLimitReached { limit: u32 },

    #[error("{0} requires premium access")]
    FeatureUnavailable(&'static str),
}
