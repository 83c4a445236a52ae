//! Numeric parsing with unit suffixes and locale separators.

use std::sync::LazyLock;

use cdm_model::{Normalized, NormalizedNumber, ParseFailure, ParseOutcome};
use regex::Regex;

use crate::text::{is_blank, is_unknown_token};

/// Leading number, then anything that follows (the unit).
static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d[\d.,]*|[.,]\d+))\s*(.*)$").expect("Invalid number regex")
});

/// Parse a raw cell as a number, keeping the raw text.
pub fn parse_number(raw: &str) -> NormalizedNumber {
    Normalized::new(raw, parse_number_outcome(raw))
}

/// Parse a raw cell as a number.
///
/// `"72 bpm"` → 72, `"1,234.5"` → 1234.5, `"1.234,5"` → 1234.5,
/// `"12,5"` → 12.5. A single comma followed by exactly three digits
/// (`"1,234"`) could be grouping or a decimal comma and is ambiguous.
/// Text that is not a number fails; it is never read as zero.
pub fn parse_number_outcome(raw: &str) -> ParseOutcome<f64> {
    if is_blank(raw) {
        return ParseOutcome::Empty;
    }
    let trimmed = raw.trim();
    if is_unknown_token(trimmed) {
        return ParseOutcome::Failed(ParseFailure::UnknownToken);
    }
    let Some(captures) = NUMBER_WITH_UNIT.captures(trimmed) else {
        return ParseOutcome::Failed(ParseFailure::NotNumeric);
    };
    let number = captures[1].trim_end_matches(['.', ',']);
    let unit = captures[2].trim();
    if !is_unit_text(unit) {
        return ParseOutcome::Failed(ParseFailure::NotNumeric);
    }
    let candidates = separator_readings(number);
    let values: Vec<f64> = candidates
        .iter()
        .filter_map(|text| text.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .collect();
    match values.as_slice() {
        [] => ParseOutcome::Failed(ParseFailure::NotNumeric),
        [value] => ParseOutcome::Parsed(*value),
        _ => ParseOutcome::Ambiguous(values),
    }
}

/// Unit text starts with a letter or a unit symbol (`%`, `/`, `µ`, `°`).
fn is_unit_text(unit: &str) -> bool {
    match unit.chars().next() {
        None => true,
        Some(first) => first.is_alphabetic() || matches!(first, '%' | '/' | '°' | 'µ' | '×'),
    }
}

/// Plain `f64` spellings of a number written with locale separators.
fn separator_readings(number: &str) -> Vec<String> {
    let commas = number.matches(',').count();
    let dots = number.matches('.').count();
    match (commas, dots) {
        (0, 0) => vec![number.to_string()],
        (0, 1) => vec![number.to_string()],
        (0, _) => vec![number.replace('.', "")],
        (1, 0) => {
            let (head, tail) = number.split_once(',').unwrap_or((number, ""));
            let digits_before = head.trim_start_matches(['+', '-']).len();
            let decimal = format!("{head}.{tail}");
            if tail.len() == 3 && (1..=3).contains(&digits_before) && head != "0" {
                vec![format!("{head}{tail}"), decimal]
            } else {
                vec![decimal]
            }
        }
        (_, 0) => vec![number.replace(',', "")],
        _ => {
            let last_comma = number.rfind(',').unwrap_or(0);
            let last_dot = number.rfind('.').unwrap_or(0);
            if last_dot > last_comma {
                if dots > 1 {
                    return Vec::new();
                }
                vec![number.replace(',', "")]
            } else {
                if commas > 1 {
                    return Vec::new();
                }
                vec![number.replace('.', "").replace(',', ".")]
            }
        }
    }
}
