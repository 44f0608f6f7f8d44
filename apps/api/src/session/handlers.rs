use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::entitlement::models::AccountSummary;
use crate::entitlement::tracker::account_summary;
use crate::errors::AppError;
use crate::models::session::SessionState;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub account: AccountSummary,
}

/// POST /api/v1/sessions
///
/// Starts a free-tier session. The returned id goes in the `x-session-id` header.
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let session_id = Uuid::new_v4();
    let session = SessionState::default();
    state.sessions.save(session_id, &session).await?;
    info!("Created session {session_id}");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            account: account_summary(&session.usage, None, state.config.free_analysis_limit),
        }),
    ))
}
