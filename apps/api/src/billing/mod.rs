//! Payment provider adapters.
//!
//! Stripe and PayPal are opaque collaborators: checkout creates a redirect URL,
//! and verified webhooks are reduced to a [`BillingEvent`] that only changes
//! the plan tier (or credit balance) of the owning session.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entitlement::tracker::{add_purchased_credit, switch_plan};
use crate::entitlement::PlanTier;
use crate::session::{SessionError, SessionStore};

pub mod handlers;
pub mod models;
pub mod paypal;
pub mod stripe;

pub use models::{BillingEvent, CheckoutSession, CustomerRef, PlanKind};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("{0} payments are not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
    },
}

/// A provider that can start a hosted checkout for a plan.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_checkout(
        &self,
        session_id: Uuid,
        plan: PlanKind,
        email: Option<&str>,
    ) -> Result<CheckoutSession, BillingError>;
}

/// Reads a provider error body: `error.message`, a bare `message`, or the raw text.
pub(crate) async fn provider_error(provider: &'static str, response: reqwest::Response) -> BillingError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);
    BillingError::Provider {
        provider,
        status,
        message,
    }
}

/// Top-level `id` of a webhook payload. Both providers put the event id there.
pub fn event_id(payload: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Applies a webhook event once. Providers redeliver events, so an id already
/// claimed within the session TTL is skipped.
pub async fn apply_webhook(
    store: &dyn SessionStore,
    provider: &str,
    event_id: Option<&str>,
    event: BillingEvent,
) -> Result<(), SessionError> {
    if let Some(id) = event_id {
        if !store.claim_event(&format!("{provider}:{id}")).await? {
            info!("Skipping redelivered {provider} event {id}");
            return Ok(());
        }
    }
    apply_event(store, event).await
}

/// Applies a verified billing event to the session it belongs to.
pub async fn apply_event(store: &dyn SessionStore, event: BillingEvent) -> Result<(), SessionError> {
    match event {
        BillingEvent::PlanActivated {
            session_id,
            tier,
            customer,
        } => {
            let mut session = store.load_or_default(session_id).await?;
            switch_plan(&mut session.usage, tier, Utc::now());
            if let Some(customer) = &customer {
                match customer {
                    CustomerRef::StripeCustomer(id) => session.usage.stripe_customer_id = Some(id.clone()),
                    CustomerRef::PayPalSubscription(id) => {
                        session.usage.paypal_subscription_id = Some(id.clone())
                    }
                }
                store.link(&customer.link_key(), session_id).await?;
            }
            store.save(session_id, &session).await?;
            info!("Session {session_id} activated plan {tier:?}");
        }
        BillingEvent::CreditPurchased { session_id } => {
            let mut session = store.load_or_default(session_id).await?;
            add_purchased_credit(&mut session.usage);
            store.save(session_id, &session).await?;
            info!(
                "Session {session_id} purchased a single analysis ({} credits)",
                session.usage.purchased_credits
            );
        }
        BillingEvent::SubscriptionCancelled { customer } => {
            let key = customer.link_key();
            let Some(session_id) = store.resolve(&key).await? else {
                warn!("Cancellation for unknown customer {key}, ignoring");
                return Ok(());
            };
            let mut session = store.load_or_default(session_id).await?;
            switch_plan(&mut session.usage, PlanTier::Free, Utc::now());
            store.save(session_id, &session).await?;
            info!("Session {session_id} cancelled its subscription");
        }
        BillingEvent::Ignored { event_type } => {
            info!("Ignoring billing event {event_type}");
        }
    }
    Ok(())
}
