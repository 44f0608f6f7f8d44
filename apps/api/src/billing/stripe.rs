//! Stripe: hosted checkout, customer portal and signed webhooks.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

use super::models::{BillingEvent, CheckoutSession, CustomerRef, PlanKind};
use super::{provider_error, BillingError, CheckoutProvider};
use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com";
const PROVIDER: &str = "Stripe";
/// Maximum age of a signed webhook.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    api_base: String,
    config: StripeConfig,
    app_url: String,
}

#[derive(Debug, Deserialize)]
struct HostedSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

impl StripeClient {
    pub fn new(config: StripeConfig, app_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Stripe HTTP client")?;
        Ok(Self {
            http,
            api_base: STRIPE_API_BASE.to_string(),
            config,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn price_id(&self, plan: PlanKind) -> &str {
        match plan {
            PlanKind::PremiumMonthly => &self.config.premium_price_id,
            PlanKind::ProMonthly => &self.config.pro_price_id,
            PlanKind::SingleAnalysis => &self.config.single_price_id,
        }
    }

    async fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<HostedSession, BillingError> {
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Opens the billing portal for an existing customer.
    pub async fn create_portal_session(&self, customer_id: &str) -> Result<String, BillingError> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), format!("{}/account", self.app_url)),
        ];
        let session = self.post_form("/v1/billing_portal/sessions", &form).await?;
        session
            .url
            .ok_or_else(|| BillingError::InvalidRequest("Stripe portal session has no URL".to_string()))
    }

    /// Checks a `Stripe-Signature` header (`t=…,v1=…`) against the raw body.
    pub fn verify_signature(&self, payload: &[u8], header: &str, now: i64) -> Result<(), BillingError> {
        verify_signature(&self.config.webhook_secret, payload, header, now)
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout(
        &self,
        session_id: Uuid,
        plan: PlanKind,
        email: Option<&str>,
    ) -> Result<CheckoutSession, BillingError> {
        let mode = if plan.is_subscription() { "subscription" } else { "payment" };
        let mut form = vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), self.price_id(plan).to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("mode".to_string(), mode.to_string()),
            ("success_url".to_string(), format!("{}/account?success=true", self.app_url)),
            ("cancel_url".to_string(), format!("{}/pricing?canceled=true", self.app_url)),
            ("client_reference_id".to_string(), session_id.to_string()),
            ("metadata[session_id]".to_string(), session_id.to_string()),
            ("metadata[plan_type]".to_string(), plan.as_str().to_string()),
        ];
        if let Some(email) = email {
            form.push(("customer_email".to_string(), email.to_string()));
        }

        let session = self.post_form("/v1/checkout/sessions", &form).await?;
        let url = session
            .url
            .ok_or_else(|| BillingError::InvalidRequest("Stripe checkout session has no URL".to_string()))?;
        info!("Stripe checkout {} created for session {session_id} ({})", session.id, plan.as_str());

        Ok(CheckoutSession {
            provider: "stripe",
            checkout_id: session.id,
            url,
        })
    }
}

/// HMAC-SHA256 over `"{t}.{payload}"`, compared against every `v1` entry.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> Result<(), BillingError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature)?;
    if signatures.is_empty() || (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(BillingError::InvalidSignature);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| BillingError::InvalidSignature)?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);

    if signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok())
    {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature)
    }
}

/// Reduces a verified Stripe event to a [`BillingEvent`].
pub fn parse_event(payload: &[u8]) -> Result<BillingEvent, BillingError> {
    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|e| BillingError::InvalidRequest(format!("Malformed Stripe event: {e}")))?;
    let object = &event.data.object;
    let customer = object
        .get("customer")
        .and_then(Value::as_str)
        .map(|id| CustomerRef::StripeCustomer(id.to_string()));

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session_id = object
                .pointer("/metadata/session_id")
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or_else(|| {
                    BillingError::InvalidRequest("Checkout session has no session_id metadata".to_string())
                })?;
            let plan: PlanKind = object
                .pointer("/metadata/plan_type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .parse()
                .map_err(BillingError::InvalidRequest)?;

            Ok(match plan.tier() {
                Some(tier) => BillingEvent::PlanActivated {
                    session_id,
                    tier,
                    customer,
                },
                None => BillingEvent::CreditPurchased { session_id },
            })
        }
        "customer.subscription.deleted" => {
            let customer = customer.ok_or_else(|| {
                BillingError::InvalidRequest("Subscription event has no customer".to_string())
            })?;
            Ok(BillingEvent::SubscriptionCancelled { customer })
        }
        other => Ok(BillingEvent::Ignored {
            event_type: other.to_string(),
        }),
    }
}
