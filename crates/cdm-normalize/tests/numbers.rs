//! Tests for numeric parsing.

use cdm_model::{ParseFailure, ParseOutcome};
use cdm_normalize::{parse_number, parse_number_outcome};
use proptest::prelude::*;

#[test]
fn strips_units() {
    assert_eq!(parse_number_outcome("72 bpm"), ParseOutcome::Parsed(72.0));
    assert_eq!(parse_number_outcome("12.5 mg/dL"), ParseOutcome::Parsed(12.5));
    assert_eq!(parse_number_outcome("55%"), ParseOutcome::Parsed(55.0));
    assert_eq!(parse_number_outcome("-3"), ParseOutcome::Parsed(-3.0));
}

#[test]
fn locale_separators() {
    assert_eq!(parse_number_outcome("1,234.5"), ParseOutcome::Parsed(1234.5));
    assert_eq!(parse_number_outcome("1.234,5"), ParseOutcome::Parsed(1234.5));
    assert_eq!(parse_number_outcome("12,5"), ParseOutcome::Parsed(12.5));
    assert_eq!(
        parse_number_outcome("1,234"),
        ParseOutcome::Ambiguous(vec![1234.0, 1.234])
    );
}

#[test]
fn non_numeric_fails_instead_of_zero() {
    assert_eq!(
        parse_number_outcome("not done"),
        ParseOutcome::Failed(ParseFailure::UnknownToken)
    );
    assert_eq!(
        parse_number_outcome("trace"),
        ParseOutcome::Failed(ParseFailure::NotNumeric)
    );
    assert_eq!(
        parse_number_outcome("<0.5"),
        ParseOutcome::Failed(ParseFailure::NotNumeric)
    );
    assert_eq!(parse_number_outcome(""), ParseOutcome::Empty);
    assert_eq!(parse_number("abc").value(), None);
}

proptest! {
    #[test]
    fn plain_integers_parse(value in -100_000i64..100_000) {
        let text = value.to_string();
        prop_assert_eq!(parse_number_outcome(&text), ParseOutcome::Parsed(value as f64));
    }

    #[test]
    fn never_panics(raw in ".{0,30}") {
        let _ = parse_number(&raw);
    }
}
