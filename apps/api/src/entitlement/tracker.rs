//! Usage/entitlement policy.
//!
//! One policy for every caller: the gate is checked before any extraction or
//! provider call, and the charge happens only after the provider returned an
//! evaluation. Paid tiers are never charged. A free session past its quota
//! spends one purchased credit per evaluation.

use chrono::{DateTime, Duration, Utc};

use super::models::{AccountSummary, AnalysisGrant, Feature, Features, PlanTier, UsageState};
use super::EntitlementError;

const BILLING_PERIOD_DAYS: i64 = 30;

/// Decides whether an evaluation may start.
pub fn check_analysis(usage: &UsageState, free_limit: u32) -> Result<AnalysisGrant, EntitlementError> {
    if usage.tier.is_paid() {
        return Ok(AnalysisGrant::Unlimited);
    }
    if usage.usage_count < free_limit {
        return Ok(AnalysisGrant::FreeQuota);
    }
    if usage.purchased_credits > 0 {
        return Ok(AnalysisGrant::PurchasedCredit);
    }
    Err(EntitlementError::UsageLimitReached { limit: free_limit })
}

/// Charges a completed evaluation against the grant that allowed it.
pub fn record_analysis(usage: &mut UsageState, grant: AnalysisGrant) {
    match grant {
        AnalysisGrant::Unlimited => {}
        AnalysisGrant::FreeQuota => usage.usage_count = usage.usage_count.saturating_add(1),
        AnalysisGrant::PurchasedCredit => {
            usage.purchased_credits = usage.purchased_credits.saturating_sub(1)
        }
    }
}

pub fn require_feature(usage: &UsageState, feature: Feature, free_limit: u32) -> Result<(), EntitlementError> {
    if Features::for_tier(usage.tier, free_limit).allows(feature) {
        Ok(())
    } else {
        Err(EntitlementError::FeatureUnavailable(feature.label()))
    }
}

/// Moves the session to `tier`. Dropping to free restarts the quota.
pub fn switch_plan(usage: &mut UsageState, tier: PlanTier, now: DateTime<Utc>) {
    usage.tier = tier;
    usage.subscription_start = now;
    if tier == PlanTier::Free {
        usage.usage_count = 0;
    }
}

pub fn reset_usage(usage: &mut UsageState) {
    usage.usage_count = 0;
}

pub fn add_purchased_credit(usage: &mut UsageState) {
    usage.purchased_credits = usage.purchased_credits.saturating_add(1);
}

/// Free analyses left; `None` for unlimited tiers.
pub fn remaining(usage: &UsageState, free_limit: u32) -> Option<u32> {
    if usage.tier.is_paid() {
        None
    } else {
        Some(free_limit.saturating_sub(usage.usage_count))
    }
}

pub fn next_billing_date(usage: &UsageState) -> Option<DateTime<Utc>> {
    usage
        .tier
        .is_paid()
        .then(|| usage.subscription_start + Duration::days(BILLING_PERIOD_DAYS))
}

pub fn account_summary(usage: &UsageState, email: Option<String>, free_limit: u32) -> AccountSummary {
    AccountSummary {
        tier: usage.tier,
        usage_count: usage.usage_count,
        remaining_analyses: remaining(usage, free_limit),
        purchased_credits: usage.purchased_credits,
        features: Features::for_tier(usage.tier, free_limit),
        subscription_start: usage.subscription_start,
        next_billing_date: next_billing_date(usage),
        email,
    }
}
