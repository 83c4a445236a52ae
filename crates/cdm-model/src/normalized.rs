//! Normalized values derived from raw spreadsheet text.
//!
//! Every normalized value keeps the raw string it came from alongside a
//! [`ParseOutcome`], so an unparseable or ambiguous cell stays visible as
//! such instead of collapsing to a default.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A date with a missing day, or missing day and month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    pub month: Option<u32>,
}

impl PartialDate {
    /// First calendar day the partial date could denote.
    pub fn earliest(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), 1)
    }

    /// Last calendar day the partial date could denote.
    pub fn latest(self) -> Option<NaiveDate> {
        match self.month {
            Some(month) => {
                let (next_year, next_month) = if month == 12 {
                    (self.year + 1, 1)
                } else {
                    (self.year, month + 1)
                };
                NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
            }
            None => NaiveDate::from_ymd_opt(self.year, 12, 31),
        }
    }
}

/// A calendar date, complete or partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateValue {
    Complete(NaiveDate),
    Partial(PartialDate),
}

impl DateValue {
    pub fn complete(self) -> Option<NaiveDate> {
        match self {
            DateValue::Complete(date) => Some(date),
            DateValue::Partial(_) => None,
        }
    }

    pub fn earliest(self) -> Option<NaiveDate> {
        match self {
            DateValue::Complete(date) => Some(date),
            DateValue::Partial(partial) => partial.earliest(),
        }
    }

    pub fn latest(self) -> Option<NaiveDate> {
        match self {
            DateValue::Complete(date) => Some(date),
            DateValue::Partial(partial) => partial.latest(),
        }
    }

    pub fn year(self) -> i32 {
        match self {
            DateValue::Complete(date) => date.year(),
            DateValue::Partial(partial) => partial.year,
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Complete(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateValue::Partial(PartialDate {
                year,
                month: Some(month),
            }) => write!(f, "{year:04}-{month:02}"),
            DateValue::Partial(PartialDate { year, month: None }) => write!(f, "{year:04}"),
        }
    }
}

/// Why a raw value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
    /// An explicit unknown marker such as `UNK` or `ND`.
    UnknownToken,
    /// Recognized shape but no valid calendar date (e.g. 31-02-2024).
    InvalidCalendarDate,
    /// Text that is not a number.
    NotNumeric,
    /// Text that matches no accepted encoding.
    Unrecognized,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseFailure::UnknownToken => "explicit unknown value",
            ParseFailure::InvalidCalendarDate => "invalid calendar date",
            ParseFailure::NotNumeric => "not a number",
            ParseFailure::Unrecognized => "unrecognized format",
        };
        f.write_str(text)
    }
}

/// Result of interpreting a raw cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ParseOutcome<T> {
    /// Blank cell.
    Empty,
    Parsed(T),
    /// More than one plausible interpretation; candidates in preference order.
    Ambiguous(Vec<T>),
    Failed(ParseFailure),
}

/// A parsed value plus the raw text it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized<T> {
    pub raw: String,
    pub outcome: ParseOutcome<T>,
}

impl<T> Normalized<T> {
    pub fn new(raw: impl Into<String>, outcome: ParseOutcome<T>) -> Self {
        Self {
            raw: raw.into(),
            outcome,
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), ParseOutcome::Empty)
    }

    pub fn parsed(&self) -> Option<&T> {
        match &self.outcome {
            ParseOutcome::Parsed(value) => Some(value),
            _ => None,
        }
    }

    /// The single parsed value, or every candidate of an ambiguous value.
    pub fn candidates(&self) -> &[T] {
        match &self.outcome {
            ParseOutcome::Parsed(value) => std::slice::from_ref(value),
            ParseOutcome::Ambiguous(values) => values,
            ParseOutcome::Empty | ParseOutcome::Failed(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.outcome, ParseOutcome::Empty)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.outcome, ParseOutcome::Ambiguous(_))
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match &self.outcome {
            ParseOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl<T: Copy> Normalized<T> {
    pub fn value(&self) -> Option<T> {
        self.parsed().copied()
    }
}

pub type NormalizedDate = Normalized<DateValue>;
pub type NormalizedNumber = Normalized<f64>;

impl NormalizedDate {
    /// The parsed date when it is a complete calendar date.
    pub fn date(&self) -> Option<NaiveDate> {
        self.parsed().and_then(|value| value.complete())
    }
}

/// Coded AE outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AeOutcome {
    RecoveredResolved,
    RecoveredWithSequelae,
    RecoveringResolving,
    NotRecoveredNotResolved,
    Fatal,
    Unknown,
    /// No outcome recorded.
    NotRecorded,
    Other(String),
}

impl AeOutcome {
    /// Terminal outcomes close an event: recovered/resolved (with or
    /// without sequelae) or fatal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AeOutcome::RecoveredResolved | AeOutcome::RecoveredWithSequelae | AeOutcome::Fatal
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AeOutcome::Fatal)
    }

    pub fn label(&self) -> &str {
        match self {
            AeOutcome::RecoveredResolved => "Recovered/Resolved",
            AeOutcome::RecoveredWithSequelae => "Recovered/Resolved with Sequelae",
            AeOutcome::RecoveringResolving => "Recovering/Resolving",
            AeOutcome::NotRecoveredNotResolved => "Not Recovered/Not Resolved",
            AeOutcome::Fatal => "Fatal",
            AeOutcome::Unknown => "Unknown",
            AeOutcome::NotRecorded => "Not Recorded",
            AeOutcome::Other(text) => text,
        }
    }
}

/// Investigator's causality assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relatedness {
    Related,
    Probable,
    Possible,
    Unlikely,
    NotRelated,
    Blank,
    Other(String),
}

impl Relatedness {
    /// Any assessment other than "not related" or blank counts as related.
    pub fn is_related(&self) -> bool {
        !matches!(self, Relatedness::NotRelated | Relatedness::Blank)
    }

    pub fn label(&self) -> &str {
        match self {
            Relatedness::Related => "Related",
            Relatedness::Probable => "Probably Related",
            Relatedness::Possible => "Possibly Related",
            Relatedness::Unlikely => "Unlikely Related",
            Relatedness::NotRelated => "Not Related",
            Relatedness::Blank => "Blank",
            Relatedness::Other(text) => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_date_bounds_cover_whole_period() {
        let feb = PartialDate {
            year: 2024,
            month: Some(2),
        };
        assert_eq!(feb.earliest(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(feb.latest(), NaiveDate::from_ymd_opt(2024, 2, 29));
        let dec = PartialDate {
            year: 2023,
            month: Some(12),
        };
        assert_eq!(dec.latest(), NaiveDate::from_ymd_opt(2023, 12, 31));
        let year = PartialDate {
            year: 2023,
            month: None,
        };
        assert_eq!(year.latest(), NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn canonical_display() {
        let partial = DateValue::Partial(PartialDate {
            year: 2025,
            month: Some(3),
        });
        assert_eq!(partial.to_string(), "2025-03");
        let complete = DateValue::Complete(NaiveDate::from_ymd_opt(2025, 3, 7).expect("date"));
        assert_eq!(complete.to_string(), "2025-03-07");
    }

    #[test]
    fn candidates_cover_parsed_and_ambiguous() {
        let parsed: Normalized<i32> = Normalized::new("1", ParseOutcome::Parsed(1));
        assert_eq!(parsed.candidates(), &[1]);
        let ambiguous: Normalized<i32> =
            Normalized::new("1/2", ParseOutcome::Ambiguous(vec![1, 2]));
        assert_eq!(ambiguous.candidates(), &[1, 2]);
        let failed: Normalized<i32> =
            Normalized::new("x", ParseOutcome::Failed(ParseFailure::Unrecognized));
        assert!(failed.candidates().is_empty());
    }
}
