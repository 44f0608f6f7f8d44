//! Document rendering: sanitized analysis → PDF report, rewritten résumé → DOCX/TXT.
//!
//! Every renderer has an explicit primary path and a simpler fallback path,
//! composed with [`render_with_fallback`]. Only a failing fallback surfaces
//! as an error.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;

pub mod classify;
pub mod docx_writer;
pub mod pdf_canvas;
pub mod report;
pub mod resume_doc;
pub mod sanitizer;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = crate::extraction::DOCX_MIME;
pub const TEXT_MIME: &str = "text/plain; charset=utf-8";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("DOCX packaging failed: {0}")]
    Docx(String),
}

impl From<zip::result::ZipError> for RenderError {
    fn from(e: zip::result::ZipError) -> Self {
        RenderError::Docx(e.to_string())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Docx(e.to_string())
    }
}

/// A generated document ready to be sent as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub filename: String,
}

impl IntoResponse for RenderedArtifact {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [
                (header::CONTENT_TYPE, self.mime.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// `{stem}_{YYYYMMDD_HHMMSS}.{ext}` in UTC.
pub fn timestamped_filename(stem: &str, ext: &str) -> String {
    format!("{stem}_{}.{ext}", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Runs `primary`; if it fails, logs the failure and runs `fallback` instead.
pub fn render_with_fallback<T>(
    what: &str,
    primary: impl FnOnce() -> Result<T, RenderError>,
    fallback: impl FnOnce() -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    primary().or_else(|e| {
        warn!("{what}: primary rendering failed, using fallback: {e}");
        fallback()
    })
}

/// Runs a renderer on the blocking pool.
pub async fn render_blocking<T, F>(render: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RenderError> + Send + 'static,
{
    let artifact = tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in rendering: {e}")))??;
    Ok(artifact)
}
