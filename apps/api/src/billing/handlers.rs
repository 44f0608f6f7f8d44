//! Axum route handlers for checkout, the Stripe portal and provider webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::billing::models::{CheckoutSession, PlanKind};
use crate::billing::{apply_webhook, event_id, stripe, BillingError, CheckoutProvider};
use crate::errors::AppError;
use crate::session::SessionId;
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: PlanKind,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Provider {
    Stripe,
    PayPal,
}

fn checkout_provider(state: &AppState, provider: Provider) -> Result<Arc<dyn CheckoutProvider>, BillingError> {
    let client: Option<Arc<dyn CheckoutProvider>> = match provider {
        Provider::Stripe => state.stripe.clone().map(|c| c as Arc<dyn CheckoutProvider>),
        Provider::PayPal => state.paypal.clone().map(|c| c as Arc<dyn CheckoutProvider>),
    };
    client.ok_or(BillingError::NotConfigured(match provider {
        Provider::Stripe => "Stripe",
        Provider::PayPal => "PayPal",
    }))
}

/// POST /api/v1/billing/stripe/checkout
pub async fn handle_stripe_checkout(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    start_checkout(&state, session_id, Provider::Stripe, request).await
}

/// POST /api/v1/billing/paypal/checkout
pub async fn handle_paypal_checkout(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    start_checkout(&state, session_id, Provider::PayPal, request).await
}

/// Starts a hosted checkout and returns the URL to redirect the browser to.
async fn start_checkout(
    state: &AppState,
    session_id: Uuid,
    provider: Provider,
    request: CheckoutRequest,
) -> Result<Json<CheckoutSession>, AppError> {
    let checkout = checkout_provider(state, provider)?;

    let mut session = state.sessions.load_or_default(session_id).await?;
    if let Some(email) = request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        session.email = Some(email.to_string());
        state.sessions.save(session_id, &session).await?;
    }

    let created = checkout
        .create_checkout(session_id, request.plan, session.email.as_deref())
        .await?;
    info!(
        "Checkout via {} for session {session_id}: {}",
        checkout.name(),
        request.plan.as_str()
    );
    Ok(Json(created))
}

/// POST /api/v1/billing/stripe/portal
pub async fn handle_stripe_portal(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<Json<PortalResponse>, AppError> {
    let client = state
        .stripe
        .as_ref()
        .ok_or(BillingError::NotConfigured("Stripe"))?;
    let session = state.sessions.load_or_default(session_id).await?;
    let customer_id = session
        .usage
        .stripe_customer_id
        .as_deref()
        .ok_or_else(|| AppError::NotFound("No active subscription found.".to_string()))?;

    let url = client.create_portal_session(customer_id).await?;
    Ok(Json(PortalResponse { url }))
}

/// POST /api/v1/billing/stripe/webhook
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let client = state
        .stripe
        .as_ref()
        .ok_or(BillingError::NotConfigured("Stripe"))?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(BillingError::InvalidSignature)?;

    client.verify_signature(&body, signature, Utc::now().timestamp())?;
    let event = stripe::parse_event(&body)?;
    apply_webhook(state.sessions.as_ref(), "stripe", event_id(&body).as_deref(), event).await?;

    Ok(Json(json!({ "received": true })))
}

/// POST /api/v1/billing/paypal/webhook
pub async fn handle_paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let client = state
        .paypal
        .as_deref()
        .ok_or(BillingError::NotConfigured("PayPal"))?;

    client.verify_webhook(&headers, &body).await?;
    let event = client.parse_event(&body)?;
    apply_webhook(state.sessions.as_ref(), "paypal", event_id(&body).as_deref(), event).await?;

    Ok(Json(json!({ "received": true })))
}
