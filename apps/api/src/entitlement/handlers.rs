//! Axum route handlers for the account view and the demo plan controls.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::entitlement::models::{AccountSummary, PlanTier};
use crate::entitlement::tracker::{account_summary, reset_usage, switch_plan};
use crate::errors::AppError;
use crate::session::SessionId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanSwitchRequest {
    pub tier: PlanTier,
}

/// GET /api/v1/account
pub async fn handle_get_account(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<Json<AccountSummary>, AppError> {
    let session = state.sessions.load_or_default(session_id).await?;
    Ok(Json(account_summary(
        &session.usage,
        session.email.clone(),
        state.config.free_analysis_limit,
    )))
}

/// POST /api/v1/account/plan
///
/// Demo plan switch. Real upgrades arrive through the billing webhooks.
pub async fn handle_switch_plan(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(request): Json<PlanSwitchRequest>,
) -> Result<Json<AccountSummary>, AppError> {
    let mut session = state.sessions.load_or_default(session_id).await?;
    switch_plan(&mut session.usage, request.tier, Utc::now());
    state.sessions.save(session_id, &session).await?;
    info!("Session {session_id} switched to {:?}", request.tier);

    Ok(Json(account_summary(
        &session.usage,
        session.email.clone(),
        state.config.free_analysis_limit,
    )))
}

/// POST /api/v1/account/usage/reset
pub async fn handle_reset_usage(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<Json<AccountSummary>, AppError> {
    let mut session = state.sessions.load_or_default(session_id).await?;
    reset_usage(&mut session.usage);
    state.sessions.save(session_id, &session).await?;

    Ok(Json(account_summary(
        &session.usage,
        session.email.clone(),
        state.config.free_analysis_limit,
    )))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::routes::build_router;
    use crate::session::extract::SESSION_HEADER;
    use crate::state::AppState;

    async fn call(state: &AppState, method: &str, uri: &str, session: Uuid, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SESSION_HEADER, session.to_string());
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_new_session_reports_free_quota() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let (status, body) = call(&state, "GET", "/api/v1/account", Uuid::new_v4(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "free");
        assert_eq!(body["remaining_analyses"], 3);
        assert_eq!(body["features"]["job_optimization"], false);
        assert!(body["next_billing_date"].is_null());
    }

    #[tokio::test]
    async fn test_plan_switch_and_reset() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let session = Uuid::new_v4();

        let mut stored = state.sessions.load_or_default(session).await.unwrap();
        stored.usage.usage_count = 2;
        state.sessions.save(session, &stored).await.unwrap();

        let (status, body) =
            call(&state, "POST", "/api/v1/account/plan", session, Some(r#"{"tier":"pro"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "pro");
        assert!(body["remaining_analyses"].is_null());
        assert_eq!(body["features"]["cover_letter"], true);
        assert!(body["next_billing_date"].is_string());

        let (_, body) =
            call(&state, "POST", "/api/v1/account/plan", session, Some(r#"{"tier":"free"}"#)).await;
        assert_eq!(body["usage_count"], 0);

        let mut stored = state.sessions.load_or_default(session).await.unwrap();
        stored.usage.usage_count = 3;
        state.sessions.save(session, &stored).await.unwrap();

        let (status, body) = call(&state, "POST", "/api/v1/account/usage/reset", session, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage_count"], 0);
        assert_eq!(body["remaining_analyses"], 3);
    }

    #[tokio::test]
    async fn test_missing_session_header_is_rejected() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let request = Request::builder()
            .uri("/api/v1/account")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
