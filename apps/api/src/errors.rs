use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::billing::BillingError;
use crate::entitlement::EntitlementError;
use crate::extraction::ExtractionError;
use crate::llm_client::{FailureKind, LlmError};
use crate::render::RenderError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Extraction(e @ ExtractionError::UnsupportedFileType(_)) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FILE_TYPE",
                e.to_string(),
            ),
            AppError::Extraction(e @ ExtractionError::FileCorrupt(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "FILE_CORRUPT",
                e.to_string(),
            ),
            AppError::Llm(e) => match e.kind() {
                FailureKind::MissingCredential => {
                    (StatusCode::BAD_REQUEST, "MISSING_CREDENTIAL", e.to_string())
                }
                FailureKind::Auth => {
                    tracing::error!("LLM error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_AUTH_ERROR",
                        "The AI provider rejected the API key".to_string(),
                    )
                }
                FailureKind::RateLimit => {
                    tracing::error!("LLM error: {e}");
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        "PROVIDER_RATE_LIMIT",
                        "The AI provider is rate limiting requests, try again shortly".to_string(),
                    )
                }
                FailureKind::Network => {
                    tracing::error!("LLM error: {e}");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "PROVIDER_NETWORK_ERROR",
                        "The AI provider could not be reached".to_string(),
                    )
                }
                FailureKind::UnknownProvider => {
                    tracing::error!("LLM error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_ERROR",
                        "An AI processing error occurred".to_string(),
                    )
                }
            },
            AppError::Entitlement(e @ EntitlementError::UsageLimitReached { .. }) => (
                StatusCode::PAYMENT_REQUIRED,
                "USAGE_LIMIT_REACHED",
                e.to_string(),
            ),
            AppError::Entitlement(e @ EntitlementError::FeatureUnavailable(_)) => {
                (StatusCode::FORBIDDEN, "PREMIUM_REQUIRED", e.to_string())
            }
            AppError::Billing(e) => match e {
                BillingError::InvalidSignature => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
                }
                BillingError::NotConfigured(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    e.to_string(),
                ),
                BillingError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                BillingError::Http(_) | BillingError::Provider { .. } => {
                    tracing::error!("Payment provider error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "PAYMENT_PROVIDER_ERROR",
                        "The payment provider returned an error".to_string(),
                    )
                }
            },
            AppError::Session(e) => {
                tracing::error!("Session store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_STORE_ERROR",
                    "Session storage is unavailable".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Rendering error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDERING_FAILURE",
                    "The document could not be generated".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
