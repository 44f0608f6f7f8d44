/// Keywords that mark a résumé section header regardless of case.
const SECTION_KEYWORDS: [&str; 8] = [
    "PROFESSIONAL SUMMARY",
    "WORK EXPERIENCE",
    "EDUCATION",
    "SKILLS",
    "CONTACT",
    "CERTIFICATIONS",
    "PROJECTS",
    "EXPERIENCE",
];

const BULLET_MARKERS: [char; 3] = ['-', '•', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    SectionHeader,
    Bullet,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub kind: LineKind,
    /// Display text; bullet markers are removed.
    pub text: String,
}

/// Classifies one trimmed résumé line.
///
/// A line is a section header when all of its cased letters are upper-case
/// or when it mentions a section keyword; otherwise a bullet when it starts
/// with `-`, `•` or `*`; otherwise body text.
pub fn classify_line(line: &str) -> ClassifiedLine {
    let line = line.trim();

    if is_all_caps(line) || mentions_section(line) {
        return ClassifiedLine {
            kind: LineKind::SectionHeader,
            text: line.to_string(),
        };
    }

    if let Some(rest) = line.strip_prefix(BULLET_MARKERS) {
        return ClassifiedLine {
            kind: LineKind::Bullet,
            text: rest.trim().to_string(),
        };
    }

    ClassifiedLine {
        kind: LineKind::Body,
        text: line.to_string(),
    }
}

pub fn classify_lines(lines: &[String]) -> Vec<ClassifiedLine> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| classify_line(l))
        .collect()
}

fn is_all_caps(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

fn mentions_section(line: &str) -> bool {
    let upper = line.to_uppercase();
    SECTION_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_caps_line_is_header() {
        assert_eq!(classify_line("JOHN DOE").kind, LineKind::SectionHeader);
        assert_eq!(classify_line("AWS / GCP 2024").kind, LineKind::SectionHeader);
    }

    #[test]
    fn test_section_keyword_is_header_in_any_case() {
        assert_eq!(classify_line("Work Experience").kind, LineKind::SectionHeader);
        assert_eq!(classify_line("Technical skills:").kind, LineKind::SectionHeader);
    }

    #[test]
    fn test_bullet_markers_are_removed() {
        for line in ["- Built APIs", "• Built APIs", "* Built APIs"] {
            let classified = classify_line(line);
            assert_eq!(classified.kind, LineKind::Bullet, "{line}");
            assert_eq!(classified.text, "Built APIs");
        }
    }

    #[test]
    fn test_header_check_wins_over_bullet() {
        // Upper-case bullet text reads as a header.
        assert_eq!(classify_line("- AWS CERTIFIED").kind, LineKind::SectionHeader);
    }

    #[test]
    fn test_plain_sentence_is_body() {
        let classified = classify_line("Led a team of five engineers.");
        assert_eq!(classified.kind, LineKind::Body);
        assert_eq!(classified.text, "Led a team of five engineers.");
    }

    #[test]
    fn test_line_without_letters_is_not_header() {
        assert_eq!(classify_line("2019 - 2023").kind, LineKind::Body);
    }

    #[test]
    fn test_classify_lines_skips_blanks() {
        let lines = vec!["SKILLS".to_string(), "   ".to_string(), "- Rust".to_string()];
        let classified = classify_lines(&lines);
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[1].kind, LineKind::Bullet);
    }
}
