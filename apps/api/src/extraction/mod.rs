//! Text extraction from uploaded résumés and job postings.
//!
//! Supported inputs are plain text, PDF and DOCX. Every failure is a typed
//! [`ExtractionError`] whose `Display` is the message shown to the user.
//!
//! Parsing is CPU-bound; async callers go through [`extract_blocking`], which
//! runs the work on the blocking pool.

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

pub mod docx;
pub mod pdf;

pub const TEXT_MIME: &str = "text/plain";
pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}. Please upload a TXT, PDF, or DOCX file.")]
    UnsupportedFileType(String),

    #[error("Error reading file: {0}. Please ensure the file is not corrupted and try again.")]
    FileCorrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Resolves the document kind from the declared media type.
    /// The file extension is consulted only when no specific type was declared.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, ExtractionError> {
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty());

        match declared.as_deref() {
            Some(TEXT_MIME) => Ok(DocumentKind::PlainText),
            Some(PDF_MIME) => Ok(DocumentKind::Pdf),
            Some(DOCX_MIME) => Ok(DocumentKind::Docx),
            None | Some(OCTET_STREAM) => file_name
                .and_then(Self::from_extension)
                .ok_or_else(|| {
                    ExtractionError::UnsupportedFileType(
                        declared.unwrap_or_else(|| "unknown".to_string()),
                    )
                }),
            Some(other) => Err(ExtractionError::UnsupportedFileType(other.to_string())),
        }
    }

    fn from_extension(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(DocumentKind::PlainText),
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

/// An uploaded file as received from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>, file_name: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            file_name,
        }
    }
}

/// Extracts trimmed text from an uploaded document.
pub fn extract_text(document: &UploadedDocument) -> Result<String, ExtractionError> {
    let kind = DocumentKind::detect(
        document.content_type.as_deref(),
        document.file_name.as_deref(),
    )?;
    debug!(
        "Extracting {:?} ({} bytes, file={:?})",
        kind,
        document.bytes.len(),
        document.file_name
    );

    let text = match kind {
        DocumentKind::PlainText => decode_utf8(&document.bytes)?,
        DocumentKind::Pdf => pdf::extract(&document.bytes)?,
        DocumentKind::Docx => docx::extract(&document.bytes)?,
    };

    Ok(text.trim().to_string())
}

/// Runs [`extract_text`] on the blocking pool.
pub async fn extract_blocking(document: UploadedDocument) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || extract_text(&document))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))??;
    Ok(text)
}

fn decode_utf8(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ExtractionError::FileCorrupt(format!("invalid UTF-8 text ({e})")))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(bytes: &'static [u8], content_type: Option<&str>, file_name: Option<&str>) -> UploadedDocument {
        UploadedDocument::new(
            Bytes::from_static(bytes),
            content_type.map(String::from),
            file_name.map(String::from),
        )
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let text = extract_text(&doc(
            b"\n  John Doe\nSoftware Engineer  \n\n",
            Some("text/plain"),
            Some("resume.txt"),
        ))
        .unwrap();
        assert_eq!(text, "John Doe\nSoftware Engineer");
    }

    #[test]
    fn test_charset_parameter_is_ignored() {
        let text = extract_text(&doc(b"Jane", Some("text/plain; charset=utf-8"), None)).unwrap();
        assert_eq!(text, "Jane");
    }

    #[test]
    fn test_invalid_utf8_is_file_corrupt() {
        let err = extract_text(&doc(b"ab\xff\xfecd", Some("text/plain"), None)).unwrap_err();
        assert!(matches!(err, ExtractionError::FileCorrupt(_)));
        let message = err.to_string();
        assert!(message.starts_with("Error reading file: "));
        assert!(message.ends_with("Please ensure the file is not corrupted and try again."));
    }

    #[test]
    fn test_unsupported_type_names_the_rejected_type() {
        let err = extract_text(&doc(b"\x89PNG", Some("image/png"), Some("photo.png"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported file type: image/png. Please upload a TXT, PDF, or DOCX file."
        );
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        let err = extract_text(&doc(b"hello", Some("image/jpeg"), Some("resume.txt"))).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFileType(t) if t == "image/jpeg"));
    }

    #[test]
    fn test_extension_fallback_for_generic_types() {
        assert_eq!(
            DocumentKind::detect(Some("application/octet-stream"), Some("CV.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(None, Some("cv.docx")).unwrap(),
            DocumentKind::Docx
        );
        assert!(matches!(
            DocumentKind::detect(None, Some("cv.odt")),
            Err(ExtractionError::UnsupportedFileType(t)) if t == "unknown"
        ));
    }

    #[test]
    fn test_docx_round_trips_through_writer() {
        let lines = vec![
            "JOHN DOE".to_string(),
            "Built APIs in Rust & Go".to_string(),
        ];
        let bytes = crate::render::docx_writer::build_docx(&crate::render::classify::classify_lines(&lines))
            .unwrap();
        let text = extract_text(&UploadedDocument::new(bytes, Some(DOCX_MIME.to_string()), None)).unwrap();
        assert!(text.contains("JOHN DOE"));
        assert!(text.contains("Built APIs in Rust & Go"));
    }

    #[test]
    fn test_pdf_produced_by_report_renderer_is_readable() {
        let artifact = crate::render::report::render_report_primary(
            "Overall score: 80.\n\nStrong Rust background.",
            "BackEnd Developer",
            "John Doe",
        )
        .unwrap();
        let text = extract_text(&UploadedDocument::new(
            artifact.bytes,
            Some(PDF_MIME.to_string()),
            Some("report.pdf".to_string()),
        ))
        .unwrap();
        assert!(text.contains("Analysis Results"));
    }

    #[test]
    fn test_garbage_pdf_is_file_corrupt() {
        let err = extract_text(&doc(b"%PDF-1.4 not really", Some("application/pdf"), None)).unwrap_err();
        assert!(matches!(err, ExtractionError::FileCorrupt(_)));
    }

    #[tokio::test]
    async fn test_extract_blocking_maps_errors() {
        let err = extract_blocking(doc(b"x", Some("image/gif"), None)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::UnsupportedFileType(_))
        ));
    }
}
