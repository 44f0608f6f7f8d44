pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::billing::handlers as billing;
use crate::entitlement::handlers as account;
use crate::session::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        // Analysis
        .route("/api/v1/analysis/positions", get(analysis::handle_positions))
        .route("/api/v1/analysis/evaluate", post(analysis::handle_evaluate))
        .route("/api/v1/analysis", delete(analysis::handle_clear_analysis))
        .route("/api/v1/analysis/optimize", post(analysis::handle_optimize))
        .route(
            "/api/v1/analysis/optimization",
            delete(analysis::handle_clear_optimization),
        )
        // Exports
        .route("/api/v1/exports/report.pdf", get(analysis::handle_report_pdf))
        .route("/api/v1/exports/resume.docx", get(analysis::handle_resume_docx))
        .route("/api/v1/exports/resume.txt", get(analysis::handle_resume_txt))
        // Account
        .route("/api/v1/account", get(account::handle_get_account))
        .route("/api/v1/account/plan", post(account::handle_switch_plan))
        .route(
            "/api/v1/account/usage/reset",
            post(account::handle_reset_usage),
        )
        // Billing
        .route(
            "/api/v1/billing/stripe/checkout",
            post(billing::handle_stripe_checkout),
        )
        .route(
            "/api/v1/billing/paypal/checkout",
            post(billing::handle_paypal_checkout),
        )
        .route("/api/v1/billing/stripe/portal", post(billing::handle_stripe_portal))
        .route(
            "/api/v1/billing/stripe/webhook",
            post(billing::handle_stripe_webhook),
        )
        .route(
            "/api/v1/billing/paypal/webhook",
            post(billing::handle_paypal_webhook),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
