//! Optimized résumé export as DOCX or plain text.

use super::classify::classify_lines;
use super::docx_writer::build_docx;
use super::{render_with_fallback, timestamped_filename, RenderError, RenderedArtifact, DOCX_MIME, TEXT_MIME};

const FILE_STEM: &str = "Optimized_Resume";

/// Lines mentioning any of these (case-insensitive) are model commentary,
/// not résumé content.
const COMMENTARY_PHRASES: [&str; 15] = [
    "analysis:",
    "evaluation:",
    "suggestion:",
    "recommendation:",
    "improvement:",
    "based on",
    "here is",
    "here's",
    "this resume",
    "the candidate",
    "overall assessment",
    "score:",
    "commentary:",
    "note:",
    "explanation:",
];

/// Trimmed, non-empty lines of `text` that carry no commentary phrase.
pub fn filter_commentary(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !COMMENTARY_PHRASES.iter().any(|phrase| lower.contains(phrase))
        })
        .map(str::to_string)
        .collect()
}

/// DOCX export. Never fails: if packaging fails the raw text goes out as `text/plain`.
pub fn render_resume_docx(text: &str) -> Result<RenderedArtifact, RenderError> {
    render_with_fallback(
        "resume DOCX",
        || {
            let lines = classify_lines(&filter_commentary(text));
            Ok(RenderedArtifact {
                bytes: build_docx(&lines)?,
                mime: DOCX_MIME,
                filename: timestamped_filename(FILE_STEM, "docx"),
            })
        },
        || Ok(raw_text(text)),
    )
}

pub fn render_resume_txt(text: &str) -> RenderedArtifact {
    RenderedArtifact {
        bytes: filter_commentary(text).join("\n").into_bytes(),
        mime: TEXT_MIME,
        filename: timestamped_filename(FILE_STEM, "txt"),
    }
}

fn raw_text(text: &str) -> RenderedArtifact {
    RenderedArtifact {
        bytes: text.as_bytes().to_vec(),
        mime: TEXT_MIME,
        filename: timestamped_filename(FILE_STEM, "txt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    const REWRITE: &str = "Here is the optimized resume:\n\nJOHN DOE\njohn@example.com\n\nPROFESSIONAL SUMMARY\nBackend engineer with 6 years in Rust and Go.\n\nWork Experience\n- Built payment APIs serving 2M users\n• Cut p99 latency by 40%\n\nNote: tailored for BackEnd Developer roles.\nThe candidate should add metrics.";

    #[test]
    fn test_filter_drops_commentary_and_blank_lines() {
        let lines = filter_commentary(REWRITE);
        assert_eq!(lines.first().map(String::as_str), Some("JOHN DOE"));
        assert!(lines.iter().all(|l| !l.is_empty()));
        assert!(!lines.iter().any(|l| l.starts_with("Here is")));
        assert!(!lines.iter().any(|l| l.starts_with("Note:")));
        assert!(!lines.iter().any(|l| l.contains("candidate")));
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        assert!(filter_commentary("OVERALL ASSESSMENT: strong\nSCORE: 90").is_empty());
        assert!(filter_commentary("here's your resume").is_empty());
    }

    #[test]
    fn test_txt_joins_surviving_lines() {
        let artifact = render_resume_txt(REWRITE);
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("JOHN DOE\njohn@example.com\nPROFESSIONAL SUMMARY"));
        assert!(!text.contains("Note:"));
        assert_eq!(artifact.mime, TEXT_MIME);
        assert!(artifact.filename.starts_with("Optimized_Resume_"));
        assert!(artifact.filename.ends_with(".txt"));
    }

    #[test]
    fn test_docx_contains_document_part_with_content() {
        let artifact = render_resume_docx(REWRITE).unwrap();
        assert_eq!(artifact.mime, DOCX_MIME);
        assert!(artifact.filename.ends_with(".docx"));

        let mut archive = ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("Built payment APIs serving 2M users"));
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/>"#));
        assert!(!xml.contains("Here is the optimized resume"));
    }

    #[test]
    fn test_raw_text_fallback_keeps_original() {
        let artifact = raw_text("Here is everything\nverbatim");
        assert_eq!(artifact.bytes, b"Here is everything\nverbatim");
        assert_eq!(artifact.mime, TEXT_MIME);
    }
}
