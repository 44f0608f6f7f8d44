//! PDF report of a résumé evaluation.
//!
//! Primary layout: centered title, metadata lines, "Analysis Results" heading,
//! the sanitized analysis as capped paragraphs, centered footer.
//! Fallback layout: one plain style with the analysis in fixed-size chunks.

use chrono::Utc;

use super::pdf_canvas::{PdfCanvas, TextStyle, BLACK, DARK_BLUE, GREY};
use super::sanitizer::sanitize;
use super::{render_with_fallback, timestamped_filename, RenderError, RenderedArtifact, PDF_MIME};
use crate::layout::{report_page_config, Font};

pub const REPORT_TITLE: &str = "AI Resume Analysis Report";
pub const RESULTS_HEADING: &str = "Analysis Results";
pub const FOOTER: &str = "Generated by AI Resume Analyzer";
pub const DEFAULT_CANDIDATE: &str = "Candidate";

/// Upper bound on a body paragraph in the primary layout.
pub const MAX_CHUNK_CHARS: usize = 800;
const FALLBACK_CHUNK_CHARS: usize = 1000;

const TITLE_STYLE: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size_pt: 24.0,
    color: DARK_BLUE,
    centered: true,
    space_before_pt: 0.0,
    space_after_pt: 30.0,
};

const HEADING_STYLE: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size_pt: 16.0,
    color: DARK_BLUE,
    centered: false,
    space_before_pt: 20.0,
    space_after_pt: 12.0,
};

const SUBHEADING_STYLE: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size_pt: 13.0,
    color: DARK_BLUE,
    centered: false,
    space_before_pt: 12.0,
    space_after_pt: 6.0,
};

const META_STYLE: TextStyle = TextStyle {
    font: Font::Helvetica,
    size_pt: 11.0,
    color: BLACK,
    centered: false,
    space_before_pt: 0.0,
    space_after_pt: 12.0,
};

const FOOTER_STYLE: TextStyle = TextStyle {
    font: Font::Helvetica,
    size_pt: 10.0,
    color: GREY,
    centered: true,
    space_before_pt: 0.0,
    space_after_pt: 0.0,
};

/// Renders the report, falling back to the plain layout if the primary one fails.
pub fn render_report(
    analysis: &str,
    target_position: &str,
    candidate_name: Option<&str>,
) -> Result<RenderedArtifact, RenderError> {
    let candidate = candidate_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CANDIDATE);

    render_with_fallback(
        "PDF report",
        || render_report_primary(analysis, target_position, candidate),
        || render_report_fallback(analysis, target_position),
    )
}

pub fn render_report_primary(
    analysis: &str,
    target_position: &str,
    candidate_name: &str,
) -> Result<RenderedArtifact, RenderError> {
    let position = sanitize(target_position);
    let candidate = sanitize(candidate_name);
    let mut canvas = PdfCanvas::new(&document_title(&position), report_page_config())?;

    canvas.paragraph(REPORT_TITLE, &TITLE_STYLE);
    canvas.space(20.0);

    let generated = Utc::now().format("%B %d, %Y").to_string();
    canvas.paragraph(&format!("Report Generated: {generated}"), &META_STYLE);
    canvas.paragraph(&format!("Target Position: {position}"), &META_STYLE);
    canvas.paragraph(&format!("Candidate: {candidate}"), &META_STYLE);
    canvas.space(30.0);

    canvas.paragraph(RESULTS_HEADING, &HEADING_STYLE);

    let body = TextStyle::body(11.0);
    for paragraph in sanitize(analysis).split("\n\n") {
        for block in split_headings(paragraph) {
            match block {
                Block::Heading(text) => canvas.paragraph(&text, &SUBHEADING_STYLE),
                Block::Body(text) => {
                    let chunks = chunk_paragraph(&text.replace("**", ""), MAX_CHUNK_CHARS);
                    let last = chunks.len().saturating_sub(1);
                    for (i, chunk) in chunks.iter().enumerate() {
                        canvas.paragraph(chunk, &body);
                        canvas.space(if i == last { 12.0 } else { 8.0 });
                    }
                }
            }
        }
    }

    canvas.space(50.0);
    canvas.paragraph(FOOTER, &FOOTER_STYLE);

    Ok(pdf_artifact(canvas.finish()?))
}

pub fn render_report_fallback(
    analysis: &str,
    target_position: &str,
) -> Result<RenderedArtifact, RenderError> {
    let position = sanitize(target_position);
    let mut canvas = PdfCanvas::new(&document_title(&position), report_page_config())?;

    let title = TextStyle {
        font: Font::HelveticaBold,
        size_pt: 18.0,
        centered: true,
        ..TextStyle::body(18.0)
    };
    let heading = TextStyle {
        font: Font::HelveticaBold,
        ..TextStyle::body(14.0)
    };
    let body = TextStyle::body(10.0);

    canvas.paragraph(REPORT_TITLE, &title);
    canvas.space(20.0);
    canvas.paragraph(&format!("Target Position: {position}"), &body);
    canvas.space(20.0);
    canvas.paragraph(&format!("{RESULTS_HEADING}:"), &heading);
    canvas.space(10.0);

    let text = sanitize(analysis);
    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(FALLBACK_CHUNK_CHARS) {
        let chunk: String = chunk.iter().collect();
        if !chunk.trim().is_empty() {
            canvas.paragraph(chunk.trim(), &body);
            canvas.space(10.0);
        }
    }

    Ok(pdf_artifact(canvas.finish()?))
}

fn document_title(position: &str) -> String {
    format!("{REPORT_TITLE} - {position}")
}

fn pdf_artifact(bytes: Vec<u8>) -> RenderedArtifact {
    RenderedArtifact {
        bytes,
        mime: PDF_MIME,
        filename: timestamped_filename("Resume_Analysis_Report", "pdf"),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Block {
    Heading(String),
    Body(String),
}

/// Text of an ATX heading line (`#` to `######` followed by whitespace).
fn heading_text(line: &str) -> Option<&str> {
    let level = line.chars().take_while(|c| *c == '#').count();
    let rest = &line[level..];
    ((1..=6).contains(&level) && rest.starts_with(char::is_whitespace)).then(|| rest.trim())
}

/// Splits a paragraph into Markdown heading lines and runs of body lines.
fn split_headings(paragraph: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in paragraph.lines() {
        let trimmed = line.trim();
        if let Some(heading) = heading_text(trimmed) {
            if !body.is_empty() {
                blocks.push(Block::Body(body.join("\n")));
                body.clear();
            }
            let heading = heading.replace("**", "");
            if !heading.is_empty() {
                blocks.push(Block::Heading(heading));
            }
        } else if !trimmed.is_empty() {
            body.push(trimmed);
        }
    }
    if !body.is_empty() {
        blocks.push(Block::Body(body.join("\n")));
    }
    blocks
}

/// Re-packs a paragraph into chunks of at most `max_chars` characters,
/// breaking at sentence boundaries (`". "`). A sentence longer than the cap is
/// broken at word boundaries, and a single word longer than the cap at
/// character boundaries.
pub fn chunk_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in paragraph.split_inclusive(". ") {
        if char_len(&current) + char_len(sentence) > max_chars {
            push_trimmed(&mut chunks, &current);
            current.clear();
        }

        if char_len(sentence) > max_chars {
            let mut pieces = split_words(sentence, max_chars);
            if let Some(tail) = pieces.pop() {
                chunks.extend(pieces);
                current = tail;
                current.push(' ');
            }
        } else {
            current.push_str(sentence);
        }
    }
    push_trimmed(&mut chunks, &current);
    chunks
}

fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        let sep = usize::from(!current.is_empty());
        if char_len(&current) + sep + word_len > max_chars && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            let mut parts = chars.chunks(max_chars).map(|c| c.iter().collect::<String>());
            if let Some(first) = parts.next() {
                current = first;
            }
            for part in parts {
                pieces.push(std::mem::replace(&mut current, part));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
