//! Date parsing for heterogeneous spreadsheet encodings.
//!
//! Accepted encodings:
//!
//! - ISO `YYYY-MM-DD` / `YYYY/MM/DD`, optionally followed by a time
//! - day-first `DD-MM-YYYY` and `DD.MM.YYYY`
//! - slashed `A/B/YYYY`, ambiguous when both day/month orders are valid
//! - month names: `05-Feb-2025`, `5 February 2025`, `Feb 5, 2025`
//! - partial dates: `UN-Feb-2025`, `Feb-2025`, `2025-02`, `2025`
//! - Excel serial day numbers (1900 date system)
//!
//! Parsing never panics and never guesses: an input with more than one
//! plausible reading comes back as [`ParseOutcome::Ambiguous`].

use std::sync::LazyLock;

use cdm_model::{DateValue, NormalizedDate, Normalized, ParseFailure, ParseOutcome, PartialDate};
use chrono::{Days, NaiveDate};
use regex::Regex;

use crate::text::{is_blank, is_unknown_token};

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})$").expect("Invalid ISO date regex")
});

static ISO_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("Invalid ISO month regex"));

static YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})$").expect("Invalid year regex"));

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})([-./])(\d{1,2})([-./])(\d{4})$").expect("Invalid numeric date regex")
});

static DAY_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([0-9]{1,2}|[A-Za-z]{2,3})[-\s/]+)?([A-Za-z]{2,9})\.?[-\s/,]+(\d{4})$")
        .expect("Invalid month name regex")
});

static MONTH_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})$")
        .expect("Invalid month-first regex")
});

static EXCEL_SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5})(?:\.\d+)?$").expect("Invalid serial regex"));

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Day placeholders used in partial dates (`UN-Feb-2025`).
const UNKNOWN_DAY: &[&str] = &["un", "unk", "uk", "xx"];

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2200;

/// Parse a raw cell into a normalized date, keeping the raw text.
pub fn parse_date(raw: &str) -> NormalizedDate {
    Normalized::new(raw, parse_date_outcome(raw))
}

/// Parse a raw cell into a date outcome.
pub fn parse_date_outcome(raw: &str) -> ParseOutcome<DateValue> {
    if is_blank(raw) {
        return ParseOutcome::Empty;
    }
    let cleaned = clean_date_text(raw);
    if cleaned.is_empty() {
        return ParseOutcome::Empty;
    }
    if is_unknown_token(&cleaned) {
        return ParseOutcome::Failed(ParseFailure::UnknownToken);
    }
    parse_excel_serial(&cleaned)
        .or_else(|| parse_iso(&cleaned))
        .or_else(|| parse_numeric(&cleaned))
        .or_else(|| parse_month_name(&cleaned))
        .unwrap_or(ParseOutcome::Failed(ParseFailure::Unrecognized))
}

/// Canonical text for a date: `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
pub fn format_date(value: &DateValue) -> String {
    value.to_string()
}

/// Canonical text for a normalized value, when it has a single reading.
pub fn canonical(value: &NormalizedDate) -> Option<String> {
    value.parsed().map(format_date)
}

/// Strip time components, the "Time unknown" suffix and trailing punctuation.
fn clean_date_text(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if let Some(index) = text.to_ascii_lowercase().find(", time unknown") {
        text.truncate(index);
    }
    // ISO datetime: 2024-01-15T10:30:00
    if text.len() > 10 && text.is_char_boundary(10) {
        let (head, tail) = text.split_at(10);
        if (tail.starts_with('T') || tail.starts_with('t')) && ISO_DATE.is_match(head) {
            text = head.to_string();
        }
    }
    let without_time = text
        .split_whitespace()
        .filter(|token| !token.contains(':'))
        .collect::<Vec<_>>()
        .join(" ");
    without_time
        .trim_end_matches([',', ';', '.'])
        .trim()
        .to_string()
}

fn parse_excel_serial(text: &str) -> Option<ParseOutcome<DateValue>> {
    let captures = EXCEL_SERIAL.captures(text)?;
    let days: u64 = captures[1].parse().ok()?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some(match epoch.checked_add_days(Days::new(days)) {
        Some(date) => ParseOutcome::Parsed(DateValue::Complete(date)),
        None => ParseOutcome::Failed(ParseFailure::InvalidCalendarDate),
    })
}

fn parse_iso(text: &str) -> Option<ParseOutcome<DateValue>> {
    if let Some(captures) = ISO_DATE.captures(text) {
        let year = captures[1].parse().ok()?;
        let month = captures[2].parse().ok()?;
        let day = captures[3].parse().ok()?;
        return Some(complete(year, month, day));
    }
    if let Some(captures) = ISO_MONTH.captures(text) {
        let year = captures[1].parse().ok()?;
        let month = captures[2].parse().ok()?;
        return Some(partial(year, Some(month)));
    }
    if let Some(captures) = YEAR_ONLY.captures(text) {
        let year = captures[1].parse().ok()?;
        return Some(partial(year, None));
    }
    None
}

/// `A?B?YYYY` with `-`, `.` or `/` separators.
///
/// Dashes and dots are day-first. Slashes are read both ways; when both
/// readings are valid and differ, the result is ambiguous.
fn parse_numeric(text: &str) -> Option<ParseOutcome<DateValue>> {
    let captures = NUMERIC_DATE.captures(text)?;
    if captures[2] != captures[4] {
        return None;
    }
    let first: u32 = captures[1].parse().ok()?;
    let second: u32 = captures[3].parse().ok()?;
    let year: i32 = captures[5].parse().ok()?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Some(ParseOutcome::Failed(ParseFailure::InvalidCalendarDate));
    }
    let day_first = NaiveDate::from_ymd_opt(year, second, first);
    let month_first = NaiveDate::from_ymd_opt(year, first, second);
    let slashed = &captures[2] == "/";
    let outcome = match (day_first, month_first) {
        (Some(dmy), Some(mdy)) if dmy == mdy => ParseOutcome::Parsed(DateValue::Complete(dmy)),
        (Some(dmy), Some(mdy)) if slashed => ParseOutcome::Ambiguous(vec![
            DateValue::Complete(mdy),
            DateValue::Complete(dmy),
        ]),
        (Some(dmy), _) => ParseOutcome::Parsed(DateValue::Complete(dmy)),
        (None, Some(mdy)) => ParseOutcome::Parsed(DateValue::Complete(mdy)),
        (None, None) => ParseOutcome::Failed(ParseFailure::InvalidCalendarDate),
    };
    Some(outcome)
}

fn parse_month_name(text: &str) -> Option<ParseOutcome<DateValue>> {
    if let Some(captures) = MONTH_NAME_FIRST.captures(text) {
        let month = month_number(&captures[1])?;
        let day = captures[2].parse().ok()?;
        let year = captures[3].parse().ok()?;
        return Some(complete(year, month, day));
    }
    let captures = DAY_MONTH_NAME.captures(text)?;
    let year: i32 = captures[3].parse().ok()?;
    let month_token = &captures[2];
    let month = match month_number(month_token) {
        Some(month) => Some(month),
        None if is_unknown_day(month_token) => None,
        None => return None,
    };
    let day_token = captures.get(1).map(|m| m.as_str());
    let Some(month) = month else {
        return match day_token {
            None => Some(partial(year, None)),
            Some(token) if is_unknown_day(token) => Some(partial(year, None)),
            Some(_) => None,
        };
    };
    match day_token {
        None => Some(partial(year, Some(month))),
        Some(token) if is_unknown_day(token) => Some(partial(year, Some(month))),
        Some(token) => {
            let day = token.parse().ok()?;
            Some(complete(year, month, day))
        }
    }
}

fn month_number(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(lower.as_str()))
        .and_then(|index| u32::try_from(index + 1).ok())
}

fn is_unknown_day(token: &str) -> bool {
    let lower = token.to_lowercase();
    UNKNOWN_DAY.contains(&lower.as_str())
}

fn complete(year: i32, month: u32, day: u32) -> ParseOutcome<DateValue> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return ParseOutcome::Failed(ParseFailure::InvalidCalendarDate);
    }
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => ParseOutcome::Parsed(DateValue::Complete(date)),
        None => ParseOutcome::Failed(ParseFailure::InvalidCalendarDate),
    }
}

fn partial(year: i32, month: Option<u32>) -> ParseOutcome<DateValue> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return ParseOutcome::Failed(ParseFailure::InvalidCalendarDate);
    }
    if let Some(month) = month
        && !(1..=12).contains(&month)
    {
        return ParseOutcome::Failed(ParseFailure::InvalidCalendarDate);
    }
    ParseOutcome::Parsed(DateValue::Partial(PartialDate { year, month }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_number_accepts_abbreviations() {
        assert_eq!(month_number("Feb"), Some(2));
        assert_eq!(month_number("SEPT"), Some(9));
        assert_eq!(month_number("september"), Some(9));
        assert_eq!(month_number("Ja"), None);
        assert_eq!(month_number("Foo"), None);
    }

    #[test]
    fn clean_strips_time_suffixes() {
        assert_eq!(clean_date_text("2024-01-15T10:30:00"), "2024-01-15");
        assert_eq!(clean_date_text("15-01-2024 10:30"), "15-01-2024");
        assert_eq!(clean_date_text("15-Jan-2024, Time unknown"), "15-Jan-2024");
    }
}
