//! PayPal: OAuth client-credentials, subscriptions, one-time orders and
//! webhook verification through the verify-webhook-signature API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{BillingEvent, CheckoutSession, CustomerRef, PlanKind};
use super::{provider_error, BillingError, CheckoutProvider};
use crate::config::PayPalConfig;
use crate::entitlement::PlanTier;

const PROVIDER: &str = "PayPal";
const BRAND_NAME: &str = "AI Resume Analyzer";

/// Transmission headers PayPal signs every webhook delivery with.
const TRANSMISSION_HEADERS: [(&str, &str); 5] = [
    ("auth_algo", "paypal-auth-algo"),
    ("cert_url", "paypal-cert-url"),
    ("transmission_id", "paypal-transmission-id"),
    ("transmission_sig", "paypal-transmission-sig"),
    ("transmission_time", "paypal-transmission-time"),
];

#[derive(Clone)]
pub struct PayPalClient {
    http: Client,
    config: PayPalConfig,
    app_url: String,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct ApprovalResource {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

impl ApprovalResource {
    fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    verification_status: String,
}

#[derive(Debug, Deserialize)]
struct PayPalEvent {
    event_type: String,
    #[serde(default)]
    resource: Value,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig, app_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build PayPal HTTP client")?;
        Ok(Self {
            http,
            config,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn access_token(&self) -> Result<String, BillingError> {
        let response = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header("Accept", "application/json")
            .header("Accept-Language", "en_US")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(provider_error(PROVIDER, response).await);
        }
        let token: AccessToken = response.json().await?;
        Ok(token.access_token)
    }

    async fn post_json<T>(&self, path: &str, request_id: Option<String>, body: &Value) -> Result<T, BillingError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(body);
        if let Some(id) = request_id {
            request = request.header("PayPal-Request-Id", id);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(provider_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    fn plan_id(&self, plan: PlanKind) -> Option<&str> {
        match plan {
            PlanKind::PremiumMonthly => Some(&self.config.premium_plan_id),
            PlanKind::ProMonthly => Some(&self.config.pro_plan_id),
            PlanKind::SingleAnalysis => None,
        }
    }

    fn tier_for_plan_id(&self, plan_id: &str) -> Option<PlanTier> {
        if plan_id == self.config.premium_plan_id {
            Some(PlanTier::Premium)
        } else if plan_id == self.config.pro_plan_id {
            Some(PlanTier::Pro)
        } else {
            None
        }
    }

    fn return_urls(&self) -> (String, String) {
        (
            format!("{}/account?paypal_success=true", self.app_url),
            format!("{}/pricing?paypal_canceled=true", self.app_url),
        )
    }

    async fn create_subscription(
        &self,
        session_id: Uuid,
        plan_id: &str,
        email: Option<&str>,
    ) -> Result<ApprovalResource, BillingError> {
        let (return_url, cancel_url) = self.return_urls();
        let mut body = json!({
            "plan_id": plan_id,
            "custom_id": session_id.to_string(),
            "application_context": {
                "brand_name": BRAND_NAME,
                "locale": "en-US",
                "shipping_preference": "NO_SHIPPING",
                "user_action": "SUBSCRIBE_NOW",
                "payment_method": {
                    "payer_selected": "PAYPAL",
                    "payee_preferred": "IMMEDIATE_PAYMENT_REQUIRED"
                },
                "return_url": return_url,
                "cancel_url": cancel_url
            }
        });
        if let Some(email) = email {
            body["subscriber"] = json!({ "email_address": email });
        }
        self.post_json(
            "/v1/billing/subscriptions",
            Some(format!("subscription-{}", Uuid::new_v4())),
            &body,
        )
        .await
    }

    async fn create_order(&self, session_id: Uuid, plan: PlanKind) -> Result<ApprovalResource, BillingError> {
        let (return_url, cancel_url) = self.return_urls();
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": { "currency_code": "USD", "value": plan.price_usd() },
                "description": plan.description(),
                "custom_id": session_id.to_string()
            }],
            "application_context": {
                "brand_name": BRAND_NAME,
                "landing_page": "NO_PREFERENCE",
                "shipping_preference": "NO_SHIPPING",
                "user_action": "PAY_NOW",
                "return_url": return_url,
                "cancel_url": cancel_url
            }
        });
        self.post_json("/v2/checkout/orders", Some(format!("order-{}", Uuid::new_v4())), &body)
            .await
    }

    /// Asks PayPal whether a webhook delivery is authentic.
    pub async fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), BillingError> {
        let mut request = serde_json::Map::new();
        for (field, header) in TRANSMISSION_HEADERS {
            let value = headers
                .get(header)
                .and_then(|v| v.to_str().ok())
                .ok_or(BillingError::InvalidSignature)?;
            request.insert(field.to_string(), Value::String(value.to_string()));
        }
        let event: Value = serde_json::from_slice(body)
            .map_err(|e| BillingError::InvalidRequest(format!("Malformed PayPal event: {e}")))?;
        request.insert("webhook_id".to_string(), Value::String(self.config.webhook_id.clone()));
        request.insert("webhook_event".to_string(), event);

        let verification: VerificationResponse = self
            .post_json("/v1/notifications/verify-webhook-signature", None, &Value::Object(request))
            .await?;
        if verification.verification_status == "SUCCESS" {
            Ok(())
        } else {
            warn!("PayPal webhook verification returned {}", verification.verification_status);
            Err(BillingError::InvalidSignature)
        }
    }

    /// Reduces a verified PayPal event to a [`BillingEvent`].
    pub fn parse_event(&self, body: &[u8]) -> Result<BillingEvent, BillingError> {
        let event: PayPalEvent = serde_json::from_slice(body)
            .map_err(|e| BillingError::InvalidRequest(format!("Malformed PayPal event: {e}")))?;
        let resource = &event.resource;
        let field = |name: &str| resource.get(name).and_then(Value::as_str);

        match event.event_type.as_str() {
            "BILLING.SUBSCRIPTION.ACTIVATED" => {
                let subscription_id = field("id").ok_or_else(|| missing("id"))?;
                let session_id = session_id_from(field("custom_id"))?;
                let plan_id = field("plan_id").unwrap_or_default();
                let Some(tier) = self.tier_for_plan_id(plan_id) else {
                    warn!("PayPal subscription {subscription_id} has unknown plan '{plan_id}'");
                    return Ok(BillingEvent::Ignored {
                        event_type: event.event_type.clone(),
                    });
                };
                Ok(BillingEvent::PlanActivated {
                    session_id,
                    tier,
                    customer: Some(CustomerRef::PayPalSubscription(subscription_id.to_string())),
                })
            }
            "BILLING.SUBSCRIPTION.CANCELLED" => {
                let subscription_id = field("id").ok_or_else(|| missing("id"))?;
                Ok(BillingEvent::SubscriptionCancelled {
                    customer: CustomerRef::PayPalSubscription(subscription_id.to_string()),
                })
            }
            "PAYMENT.CAPTURE.COMPLETED" => {
                let session_id = session_id_from(field("custom_id"))?;
                Ok(BillingEvent::CreditPurchased { session_id })
            }
            other => Ok(BillingEvent::Ignored {
                event_type: other.to_string(),
            }),
        }
    }
}

fn missing(field: &str) -> BillingError {
    BillingError::InvalidRequest(format!("PayPal event resource has no {field}"))
}

fn session_id_from(custom_id: Option<&str>) -> Result<Uuid, BillingError> {
    custom_id
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| missing("session custom_id"))
}

#[async_trait]
impl CheckoutProvider for PayPalClient {
    fn name(&self) -> &'static str {
        "paypal"
    }

    async fn create_checkout(
        &self,
        session_id: Uuid,
        plan: PlanKind,
        email: Option<&str>,
    ) -> Result<CheckoutSession, BillingError> {
        let resource = match self.plan_id(plan) {
            Some(plan_id) => self.create_subscription(session_id, plan_id, email).await?,
            None => self.create_order(session_id, plan).await?,
        };
        let url = resource
            .approval_url()
            .ok_or_else(|| BillingError::InvalidRequest("PayPal response has no approval link".to_string()))?
            .to_string();
        info!("PayPal checkout {} created for session {session_id} ({})", resource.id, plan.as_str());

        Ok(CheckoutSession {
            provider: "paypal",
            checkout_id: resource.id,
            url,
        })
    }
}
