use super::font_metrics::FontMetricTable;

/// Greedy word-wrap of a single line of text into lines no wider than `max_width_pt`.
///
/// Words wider than a full line are split at character boundaries. An empty or
/// all-whitespace input returns no lines.
pub fn wrap_text(
    text: &str,
    metrics: &FontMetricTable,
    size_pt: f32,
    max_width_pt: f32,
) -> Vec<String> {
    let space_w = metrics.space_width * size_pt;
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        for piece in split_oversized(word, metrics, size_pt, max_width_pt) {
            let word_w = metrics.width_pt(&piece, size_pt);

            if !current.is_empty() && current_width + space_w + word_w > max_width_pt {
                // Line is full, start a new one.
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if !current.is_empty() {
                current.push(' ');
                current_width += space_w;
            }
            current.push_str(&piece);
            current_width += word_w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_oversized(
    word: &str,
    metrics: &FontMetricTable,
    size_pt: f32,
    max_width_pt: f32,
) -> Vec<String> {
    if metrics.width_pt(word, size_pt) <= max_width_pt {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0_f32;
    for c in word.chars() {
        let mut buf = [0u8; 4];
        let char_w = metrics.width_pt(c.encode_utf8(&mut buf), size_pt);
        if !piece.is_empty() && width + char_w > max_width_pt {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += char_w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
