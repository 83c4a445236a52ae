//! Text helpers shared by the parsers.

/// Placeholders spreadsheet tooling writes into empty cells.
const BLANK_TOKENS: &[&str] = &["nan", "none", "nat", "null", "<na>"];

/// Markers that explicitly record an unknown value.
const UNKNOWN_TOKENS: &[&str] = &[
    "unk",
    "unknown",
    "nd",
    "not done",
    "n/a",
    "na",
    "not available",
];

/// True for empty cells and for export placeholders like `nan`.
pub fn is_blank(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || BLANK_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

pub fn is_unknown_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    UNKNOWN_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
