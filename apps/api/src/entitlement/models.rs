use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
    Pro,
}

impl PlanTier {
    pub fn is_paid(self) -> bool {
        !matches!(self, PlanTier::Free)
    }
}

/// Capabilities unlocked by a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Features {
    /// `None` means unlimited.
    pub max_analyses: Option<u32>,
    pub job_optimization: bool,
    pub premium_templates: bool,
    pub priority_support: bool,
    pub cover_letter: bool,
}

/// Capabilities enforced by a server-side gate. The other `Features` flags
/// are reported in the account view only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    JobOptimization,
}

impl Feature {
    pub fn label(self) -> &'static str {
        match self {
            Feature::JobOptimization => "Job optimization",
        }
    }
}

impl Features {
    pub fn for_tier(tier: PlanTier, free_limit: u32) -> Self {
        match tier {
            PlanTier::Free => Features {
                max_analyses: Some(free_limit),
                job_optimization: false,
                premium_templates: false,
                priority_support: false,
                cover_letter: false,
            },
            PlanTier::Premium => Features {
                max_analyses: None,
                job_optimization: true,
                premium_templates: true,
                priority_support: false,
                cover_letter: false,
            },
            PlanTier::Pro => Features {
                max_analyses: None,
                job_optimization: true,
                premium_templates: true,
                priority_support: true,
                cover_letter: true,
            },
        }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::JobOptimization => self.job_optimization,
        }
    }
}

/// Per-session usage and plan state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub tier: PlanTier,
    pub usage_count: u32,
    pub subscription_start: DateTime<Utc>,
    /// Single analyses bought with a one-time payment.
    #[serde(default)]
    pub purchased_credits: u32,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub paypal_subscription_id: Option<String>,
}

impl Default for UsageState {
    fn default() -> Self {
        Self {
            tier: PlanTier::Free,
            usage_count: 0,
            subscription_start: Utc::now(),
            purchased_credits: 0,
            stripe_customer_id: None,
            paypal_subscription_id: None,
        }
    }
}

/// What allowed a particular evaluation to run; decides what gets charged
/// once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisGrant {
    Unlimited,
    FreeQuota,
    PurchasedCredit,
}

/// Account view returned by `GET /api/v1/account`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub tier: PlanTier,
    pub usage_count: u32,
    /// `None` means unlimited.
    pub remaining_analyses: Option<u32>,
    pub purchased_credits: u32,
    pub features: Features,
    pub subscription_start: DateTime<Utc>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_matrix() {
        let free = Features::for_tier(PlanTier::Free, 3);
        assert_eq!(free.max_analyses, Some(3));
        assert!(!free.allows(Feature::JobOptimization));

        let premium = Features::for_tier(PlanTier::Premium, 3);
        assert_eq!(premium.max_analyses, None);
        assert!(premium.allows(Feature::JobOptimization));
        assert!(premium.allows(Feature::PremiumTemplates));
        assert!(!premium.allows(Feature::CoverLetter));

        let pro = Features::for_tier(PlanTier::Pro, 3);
        assert!(pro.allows(Feature::PrioritySupport));
        assert!(pro.allows(Feature::CoverLetter));
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanTier::Premium).unwrap(), "\"premium\"");
        let tier: PlanTier = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(tier, PlanTier::Pro);
    }

    #[test]
    fn test_usage_state_tolerates_missing_optional_fields() {
        let usage: UsageState = serde_json::from_str(
            r#"{"tier":"free","usage_count":2,"subscription_start":"2024-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(usage.usage_count, 2);
        assert_eq!(usage.purchased_credits, 0);
        assert!(usage.stripe_customer_id.is_none());
    }
}
