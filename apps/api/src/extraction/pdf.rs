//! PDF text extraction via `pdf-extract`.
//!
//! `pdf-extract` panics on some malformed inputs instead of returning an
//! error, so the call is wrapped in `catch_unwind`.

use std::panic::{self, AssertUnwindSafe};

use super::ExtractionError;

pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match result {
        Ok(Ok(text)) => Ok(normalize(&text)),
        Ok(Err(e)) => Err(ExtractionError::FileCorrupt(format!("PDF parse failed ({e})"))),
        Err(_) => Err(ExtractionError::FileCorrupt(
            "PDF structure is malformed".to_string(),
        )),
    }
}

/// Strips trailing whitespace and form feeds so pages join with plain newlines.
fn normalize(raw: &str) -> String {
    raw.replace('\u{c}', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
