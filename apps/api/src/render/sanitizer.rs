//! Text sanitizer for model output headed into fixed-encoding documents.
//!
//! Output contains only printable ASCII (0x20..=0x7E) and `\n`. Lossy.

use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on re-applying the pass; real inputs settle in one or two.
const MAX_PASSES: usize = 8;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|[-\s|]+\|\s*$").expect("table separator regex"));
static NON_PRINTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x20-\x7E\n]+").expect("non-printable regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank lines regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("spaces regex"));

const SYMBOLS: [(&str, &str); 7] = [
    ("•", "* "),
    ("✅", "[YES] "),
    ("❌", "[NO] "),
    ("🔍", "[FOCUS] "),
    ("💡", "[TIP] "),
    ("🌟", "[STAR] "),
    ("🚀", "[GROWTH] "),
];

/// Sanitizes `text`, re-applying the pass until it stops changing so that
/// `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_pass(text);
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_pass(text: &str) -> String {
    let without_tags = TAG.replace_all(text, "");
    let mut out = flatten_tables(&without_tags);

    for (symbol, replacement) in SYMBOLS {
        out = out.replace(symbol, replacement);
    }

    let out = NON_PRINTABLE.replace_all(&out, " ");
    let out = BLANK_LINES.replace_all(&out, "\n\n");
    let out = SPACES.replace_all(&out, " ");
    out.trim().to_string()
}

/// Drops Markdown table separator rows and turns table rows into
/// `cell - cell - cell` lines.
fn flatten_tables(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        if TABLE_SEPARATOR.is_match(line) {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.starts_with('|') {
            let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
            if inner.is_empty() {
                continue;
            }
            let cells: Vec<&str> = inner
                .split('|')
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .collect();
            lines.push(cells.join(" - "));
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}
