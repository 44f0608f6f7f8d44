//! Axum route handlers for the analysis pipeline and document exports.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::service::{self, Optimization};
use crate::analysis::{AnalysisRequest, TARGET_POSITIONS};
use crate::entitlement::tracker::{check_analysis, record_analysis, remaining, require_feature};
use crate::entitlement::{Feature, UsageState};
use crate::errors::AppError;
use crate::extraction::{extract_blocking, UploadedDocument};
use crate::models::session::{EvaluationRecord, OptimizationRecord};
use crate::render::report::render_report;
use crate::render::resume_doc::{render_resume_docx, render_resume_txt};
use crate::render::{render_blocking, RenderedArtifact};
use crate::session::SessionId;
use crate::state::AppState;

/// Header carrying the caller's LLM API key.
pub const LLM_KEY_HEADER: &str = "x-llm-api-key";

const FILE_FIELDS: [&str; 2] = ["file", "job_file"];

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub analysis: String,
    pub target_position: String,
    pub candidate_name: Option<String>,
    /// `None` means unlimited.
    pub remaining_analyses: Option<u32>,
    pub purchased_credits: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub candidate_name: Option<String>,
}

/// Multipart form split into uploaded files and text fields.
#[derive(Debug, Default)]
struct UploadForm {
    files: HashMap<String, UploadedDocument>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if FILE_FIELDS.contains(&name.as_str()) || field.file_name().is_some() {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read upload '{name}': {e}")))?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.files
                        .insert(name, UploadedDocument::new(bytes, content_type, file_name));
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Text of the uploaded `file_field` if present, else the `text_field` value.
    async fn document_or_text(&mut self, file_field: &str, text_field: &str) -> Result<Option<String>, AppError> {
        if let Some(document) = self.files.remove(file_field) {
            let text = extract_blocking(document).await?;
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
        Ok(self.text(text_field).map(str::to_string))
    }
}

/// The caller's key, or the managed key for paid sessions that did not send one.
fn resolve_credential(headers: &HeaderMap, usage: &UsageState, managed_key: Option<&str>) -> String {
    let provided = headers
        .get(LLM_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    match managed_key {
        Some(managed) if provided.is_empty() && usage.tier.is_paid() => managed.to_string(),
        _ => provided.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/analysis/positions
pub async fn handle_positions() -> Json<PositionsResponse> {
    Json(PositionsResponse {
        positions: TARGET_POSITIONS.to_vec(),
    })
}

/// POST /api/v1/analysis/evaluate
///
/// Multipart: `file` or `resume_text`, `target_position`, optional `candidate_name`.
/// The usage gate runs before the upload is read or the provider is called;
/// the charge is recorded only after the provider returned an evaluation.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<EvaluateResponse>, AppError> {
    let limit = state.config.free_analysis_limit;
    let session = state.sessions.load_or_default(session_id).await?;
    let grant = check_analysis(&session.usage, limit)?;
    let credential = resolve_credential(
        &headers,
        &session.usage,
        state.config.managed_llm_api_key.as_deref(),
    );

    let mut form = UploadForm::read(multipart).await?;
    let resume_text = form
        .document_or_text("file", "resume_text")
        .await?
        .unwrap_or_default();
    let target_position = form.text("target_position").unwrap_or_default().to_string();
    let candidate_name = form.text("candidate_name").map(str::to_string);

    let request = AnalysisRequest::new(resume_text, target_position)?;
    let analysis = service::evaluate(&state.llm, &credential, &request).await?;

    // Re-read so a concurrent plan change is not overwritten with stale usage.
    let mut session = state.sessions.load_or_default(session_id).await?;
    record_analysis(&mut session.usage, grant);
    session.set_evaluation(EvaluationRecord {
        resume_text: request.resume_text.clone(),
        target_position: request.target_position.clone(),
        candidate_name: candidate_name.clone(),
        analysis: analysis.clone(),
        created_at: Utc::now(),
    });
    state.sessions.save(session_id, &session).await?;
    info!(
        "Session {session_id} evaluated for '{}' (usage {})",
        request.target_position, session.usage.usage_count
    );

    Ok(Json(EvaluateResponse {
        analysis,
        target_position: request.target_position,
        candidate_name,
        remaining_analyses: remaining(&session.usage, limit),
        purchased_credits: session.usage.purchased_credits,
    }))
}

/// DELETE /api/v1/analysis
///
/// "Evaluate again": drops the evaluation and any optimization built on it.
pub async fn handle_clear_analysis(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<StatusCode, AppError> {
    let mut session = state.sessions.load_or_default(session_id).await?;
    session.clear_evaluation();
    state.sessions.save(session_id, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/analysis/optimize
///
/// Multipart: `job_file` or `job_description`. Premium only; needs a prior evaluation.
pub async fn handle_optimize(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Optimization>, AppError> {
    let session = state.sessions.load_or_default(session_id).await?;
    require_feature(&session.usage, Feature::JobOptimization, state.config.free_analysis_limit)?;
    let evaluation = session.evaluation.clone().ok_or_else(|| {
        AppError::NotFound("No analysis available. Evaluate your resume first.".to_string())
    })?;
    let credential = resolve_credential(
        &headers,
        &session.usage,
        state.config.managed_llm_api_key.as_deref(),
    );

    let mut form = UploadForm::read(multipart).await?;
    let job_posting = form
        .document_or_text("job_file", "job_description")
        .await?
        .ok_or_else(|| {
            AppError::Validation("Please upload a job posting or paste the job description".to_string())
        })?;

    let request = AnalysisRequest::new(evaluation.resume_text, evaluation.target_position)?
        .with_job_posting(job_posting)
        .with_prior_analysis(evaluation.analysis);
    let optimization = service::optimize(&state.llm, &credential, &request).await?;

    let mut session = state.sessions.load_or_default(session_id).await?;
    session.optimization = Some(OptimizationRecord {
        job_analysis: optimization.job_analysis.clone(),
        optimized_resume: optimization.optimized_resume.clone(),
        created_at: Utc::now(),
    });
    state.sessions.save(session_id, &session).await?;
    info!("Session {session_id} optimized resume for '{}'", request.target_position);

    Ok(Json(optimization))
}

/// DELETE /api/v1/analysis/optimization
///
/// "Try a different job": keeps the evaluation.
pub async fn handle_clear_optimization(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<StatusCode, AppError> {
    let mut session = state.sessions.load_or_default(session_id).await?;
    session.optimization = None;
    state.sessions.save(session_id, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/exports/report.pdf
pub async fn handle_report_pdf(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Query(query): Query<ReportQuery>,
) -> Result<RenderedArtifact, AppError> {
    let session = state.sessions.load_or_default(session_id).await?;
    let evaluation = session.evaluation.ok_or_else(|| {
        AppError::NotFound("No analysis available. Evaluate your resume first.".to_string())
    })?;
    let candidate = query.candidate_name.or(evaluation.candidate_name);

    render_blocking(move || {
        render_report(
            &evaluation.analysis,
            &evaluation.target_position,
            candidate.as_deref(),
        )
    })
    .await
}

async fn optimized_resume(state: &AppState, session_id: uuid::Uuid) -> Result<String, AppError> {
    let session = state.sessions.load_or_default(session_id).await?;
    session
        .optimization
        .map(|o| o.optimized_resume)
        .ok_or_else(|| AppError::NotFound("No optimized resume available. Optimize your resume first.".to_string()))
}

/// GET /api/v1/exports/resume.docx
pub async fn handle_resume_docx(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<RenderedArtifact, AppError> {
    let resume = optimized_resume(&state, session_id).await?;
    render_blocking(move || render_resume_docx(&resume)).await
}

/// GET /api/v1/exports/resume.txt
pub async fn handle_resume_txt(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<RenderedArtifact, AppError> {
    let resume = optimized_resume(&state, session_id).await?;
    Ok(render_resume_txt(&resume))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::LLM_KEY_HEADER;
    use crate::entitlement::PlanTier;
    use crate::models::session::{EvaluationRecord, SessionState};
    use crate::render::sanitizer::sanitize;
    use crate::routes::build_router;
    use crate::session::extract::SESSION_HEADER;
    use crate::state::AppState;

    const BOUNDARY: &str = "----resume-analyzer-test";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File {
            name: &'a str,
            file_name: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                    );
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, session: Uuid, api_key: &str, parts: &[Part]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(SESSION_HEADER, session.to_string())
            .header(LLM_KEY_HEADER, api_key)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn get(uri: &str, session: Uuid) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(SESSION_HEADER, session.to_string())
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn completion(text: &str) -> String {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] }).to_string()
    }

    const ANALYSIS: &str = "## Overall Score: 72/100\n\n• Strong backend skills ✅\n\n**Suggestions**: add metrics. Quantify impact.";

    fn plain_resume() -> Part<'static> {
        Part::File {
            name: "file",
            file_name: "resume.txt",
            content_type: "text/plain",
            bytes: b"John Doe\nSoftware Engineer",
        }
    }

    async fn seed(state: &AppState, session: Uuid, edit: impl FnOnce(&mut SessionState)) {
        let mut stored = state.sessions.load_or_default(session).await.unwrap();
        edit(&mut stored);
        state.sessions.save(session, &stored).await.unwrap();
    }

    #[tokio::test]
    async fn test_positions_are_listed() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let request = Request::builder()
            .uri("/api/v1/analysis/positions")
            .body(Body::empty())
            .unwrap();
        let body = json_body(send(&state, request).await).await;
        assert_eq!(body["positions"].as_array().unwrap().len(), 4);
        assert_eq!(body["positions"][1], "BackEnd Developer");
    }

    #[tokio::test]
    async fn test_plain_text_resume_flows_to_pdf_report() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-valid")
            .match_body(Matcher::Regex("BackEnd Developer".to_string()))
            .with_status(200)
            .with_body(completion(ANALYSIS))
            .expect(1)
            .create_async()
            .await;
        let state = AppState::for_tests(&server.url());
        let session = Uuid::new_v4();

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                session,
                "sk-valid",
                &[plain_resume(), Part::Text("target_position", "BackEnd Developer")],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let analysis = body["analysis"].as_str().unwrap();
        assert!(!analysis.is_empty());
        assert_eq!(body["remaining_analyses"], 2);

        let clean = sanitize(analysis);
        assert!(!clean.contains('•'));
        assert!(!clean.contains('✅'));

        let response = send(&state, get("/api/v1/exports/report.pdf", session)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let stored = state.sessions.load(session).await.unwrap().unwrap();
        assert_eq!(stored.usage.usage_count, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_api_key_is_rejected_without_provider_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;
        let state = AppState::for_tests(&server.url());
        let session = Uuid::new_v4();

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                session,
                "",
                &[plain_resume(), Part::Text("target_position", "BackEnd Developer")],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Enter your API key");
        let stored = state.sessions.load_or_default(session).await.unwrap();
        assert_eq!(stored.usage.usage_count, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_free_session_is_rejected_before_extraction() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;
        let state = AppState::for_tests(&server.url());
        let session = Uuid::new_v4();
        seed(&state, session, |s| s.usage.usage_count = 3).await;

        // An unsupported upload would be a 415 if extraction ran.
        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                session,
                "sk-valid",
                &[
                    Part::File {
                        name: "file",
                        file_name: "photo.png",
                        content_type: "image/png",
                        bytes: b"\x89PNG",
                    },
                    Part::Text("target_position", "BackEnd Developer"),
                ],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "USAGE_LIMIT_REACHED");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_purchased_credit_is_spent_past_the_quota() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("Score: 80/100"))
            .create_async()
            .await;
        let state = AppState::for_tests(&server.url());
        let session = Uuid::new_v4();
        seed(&state, session, |s| {
            s.usage.usage_count = 3;
            s.usage.purchased_credits = 1;
        })
        .await;

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                session,
                "sk-valid",
                &[
                    Part::Text("resume_text", "Jane Roe\nData Analyst"),
                    Part::Text("target_position", "Data Analytics Developer"),
                ],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let stored = state.sessions.load(session).await.unwrap().unwrap();
        assert_eq!(stored.usage.usage_count, 3);
        assert_eq!(stored.usage.purchased_credits, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_does_not_charge() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad key"}}"#)
            .create_async()
            .await;
        let state = AppState::for_tests(&server.url());
        let session = Uuid::new_v4();

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                session,
                "sk-wrong",
                &[
                    Part::Text("resume_text", "John Doe"),
                    Part::Text("target_position", "BackEnd Developer"),
                ],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "PROVIDER_AUTH_ERROR");
        let stored = state.sessions.load_or_default(session).await.unwrap();
        assert_eq!(stored.usage.usage_count, 0);
    }

    #[tokio::test]
    async fn test_missing_resume_is_validation_error() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                Uuid::new_v4(),
                "sk-valid",
                &[Part::Text("target_position", "BackEnd Developer")],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "Please submit your resume file or input resume text"
        );
    }

    fn evaluated(s: &mut SessionState) {
        s.set_evaluation(EvaluationRecord {
            resume_text: "John Doe\nSoftware Engineer".into(),
            target_position: "BackEnd Developer".into(),
            candidate_name: Some("John Doe".into()),
            analysis: "Score: 70/100".into(),
            created_at: chrono::Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_optimize_requires_premium() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let session = Uuid::new_v4();
        seed(&state, session, evaluated).await;

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/optimize",
                session,
                "sk-valid",
                &[Part::Text("job_description", "Senior Rust engineer")],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"]["code"], "PREMIUM_REQUIRED");
    }

    #[tokio::test]
    async fn test_optimize_without_evaluation_is_not_found() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let session = Uuid::new_v4();
        seed(&state, session, |s| s.usage.tier = PlanTier::Premium).await;

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/optimize",
                session,
                "sk-valid",
                &[Part::Text("job_description", "Senior Rust engineer")],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_premium_optimize_with_managed_key_then_export() {
        let mut server = Server::new_async().await;
        let job = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer managed-key")
            .match_body(Matcher::PartialJson(json!({ "max_tokens": 1500 })))
            .with_status(200)
            .with_body(completion("Required: Rust, PostgreSQL"))
            .expect(1)
            .create_async()
            .await;
        let rewrite = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer managed-key")
            .match_body(Matcher::PartialJson(json!({ "max_tokens": 2500 })))
            .with_status(200)
            .with_body(completion(
                "Here is your resume:\nJOHN DOE\nSKILLS\n- Rust\n- PostgreSQL\nNote: tailored for the role",
            ))
            .expect(1)
            .create_async()
            .await;

        let mut state = AppState::for_tests(&server.url());
        state.config.managed_llm_api_key = Some("managed-key".into());
        let session = Uuid::new_v4();
        seed(&state, session, |s| {
            evaluated(s);
            s.usage.tier = PlanTier::Premium;
        })
        .await;

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/optimize",
                session,
                "",
                &[Part::Text("job_description", "Senior Rust engineer")],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["job_analysis"], "Required: Rust, PostgreSQL");

        let response = send(&state, get("/api/v1/exports/resume.txt", session)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&text[..], b"JOHN DOE\nSKILLS\n- Rust\n- PostgreSQL");

        let response = send(&state, get("/api/v1/exports/resume.docx", session)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::extraction::DOCX_MIME
        );
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("Optimized_Resume_"));

        // "Try a different job" keeps the evaluation but drops the rewrite.
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/analysis/optimization")
            .header(SESSION_HEADER, session.to_string())
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, request).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            send(&state, get("/api/v1/exports/resume.txt", session)).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            send(&state, get("/api/v1/exports/report.pdf", session)).await.status(),
            StatusCode::OK
        );

        job.assert_async().await;
        rewrite.assert_async().await;
    }

    #[tokio::test]
    async fn test_free_session_never_uses_managed_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;
        let mut state = AppState::for_tests(&server.url());
        state.config.managed_llm_api_key = Some("managed-key".into());

        let response = send(
            &state,
            multipart_request(
                "/api/v1/analysis/evaluate",
                Uuid::new_v4(),
                "",
                &[
                    Part::Text("resume_text", "John Doe"),
                    Part::Text("target_position", "BackEnd Developer"),
                ],
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_evaluate_again_clears_report() {
        let state = AppState::for_tests("http://127.0.0.1:9");
        let session = Uuid::new_v4();
        seed(&state, session, evaluated).await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/analysis")
            .header(SESSION_HEADER, session.to_string())
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, request).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            send(&state, get("/api/v1/exports/report.pdf", session)).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
