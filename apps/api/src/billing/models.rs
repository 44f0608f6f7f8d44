use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entitlement::PlanTier;

/// Catalog entry a customer can buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    PremiumMonthly,
    ProMonthly,
    SingleAnalysis,
}

impl PlanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanKind::PremiumMonthly => "premium_monthly",
            PlanKind::ProMonthly => "pro_monthly",
            PlanKind::SingleAnalysis => "single_analysis",
        }
    }

    /// Tier granted by a subscription; `None` for one-time purchases.
    pub fn tier(self) -> Option<PlanTier> {
        match self {
            PlanKind::PremiumMonthly => Some(PlanTier::Premium),
            PlanKind::ProMonthly => Some(PlanTier::Pro),
            PlanKind::SingleAnalysis => None,
        }
    }

    pub fn is_subscription(self) -> bool {
        self.tier().is_some()
    }

    /// USD price as the providers expect it in request bodies.
    pub fn price_usd(self) -> &'static str {
        match self {
            PlanKind::PremiumMonthly => "9.99",
            PlanKind::ProMonthly => "19.99",
            PlanKind::SingleAnalysis => "2.99",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PlanKind::PremiumMonthly => "Premium Plan (monthly)",
            PlanKind::ProMonthly => "Pro Plan (monthly)",
            PlanKind::SingleAnalysis => "Single Analysis",
        }
    }
}

impl FromStr for PlanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "premium_monthly" => Ok(PlanKind::PremiumMonthly),
            "pro_monthly" => Ok(PlanKind::ProMonthly),
            "single_analysis" => Ok(PlanKind::SingleAnalysis),
            other => Err(format!("Unknown plan: {other}")),
        }
    }
}

/// Redirect target returned by a provider's checkout API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub provider: &'static str,
    pub checkout_id: String,
    pub url: String,
}

/// Provider-side identity of a paying customer, used to route cancellations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    StripeCustomer(String),
    PayPalSubscription(String),
}

impl CustomerRef {
    pub fn link_key(&self) -> String {
        match self {
            CustomerRef::StripeCustomer(id) => format!("stripe:{id}"),
            CustomerRef::PayPalSubscription(id) => format!("paypal:{id}"),
        }
    }
}

/// A provider webhook reduced to what it means for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    PlanActivated {
        session_id: Uuid,
        tier: PlanTier,
        customer: Option<CustomerRef>,
    },
    CreditPurchased {
        session_id: Uuid,
    },
    SubscriptionCancelled {
        customer: CustomerRef,
    },
    Ignored {
        event_type: String,
    },
}
