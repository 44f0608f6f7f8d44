//! DOCX text extraction.
//!
//! Reads `word/document.xml` from the package and concatenates paragraph text.
//! Runs (`w:t`) are joined as-is, `w:tab` becomes a tab and `w:br`/`w:cr` a
//! newline. Paragraphs are separated by newlines.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use zip::ZipArchive;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*?)?/>|<w:p(?:\s[^>]*)?>.*?</w:p>").expect("paragraph regex")
});
static RUN_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>")
        .expect("run token regex")
});
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity regex"));

pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::FileCorrupt(format!("not a valid DOCX package ({e})")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| ExtractionError::FileCorrupt(format!("{DOCUMENT_PART} is missing")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::FileCorrupt(format!("{DOCUMENT_PART} is unreadable ({e})")))?;

    Ok(document_text(&xml))
}

/// Paragraph text of a WordprocessingML body, one line per paragraph.
pub fn document_text(xml: &str) -> String {
    PARAGRAPH
        .find_iter(xml)
        .map(|p| paragraph_text(p.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(paragraph: &str) -> String {
    let mut out = String::new();
    for token in RUN_TOKEN.captures_iter(paragraph) {
        match token.get(1) {
            Some(text) => out.push_str(&unescape(text.as_str())),
            None if token[0].starts_with("<w:tab") => out.push('\t'),
            None => out.push('\n'),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
