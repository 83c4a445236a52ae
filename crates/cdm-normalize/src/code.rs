//! Checkbox flags and coded values (AE outcome, relatedness).

use cdm_model::{AeOutcome, Normalized, ParseFailure, ParseOutcome, Relatedness};

use crate::text::{is_blank, normalize_text};

const TRUE_TOKENS: &[&str] = &["yes", "y", "1", "true", "checked", "x"];
const FALSE_TOKENS: &[&str] = &["no", "n", "0", "false", "unchecked"];

/// Parse a checkbox or yes/no cell.
pub fn parse_flag(raw: &str) -> Normalized<bool> {
    let outcome = if is_blank(raw) {
        ParseOutcome::Empty
    } else {
        let lower = raw.trim().to_lowercase();
        if TRUE_TOKENS.contains(&lower.as_str()) {
            ParseOutcome::Parsed(true)
        } else if FALSE_TOKENS.contains(&lower.as_str()) {
            ParseOutcome::Parsed(false)
        } else {
            ParseOutcome::Failed(ParseFailure::Unrecognized)
        }
    };
    Normalized::new(raw, outcome)
}

/// True only for an explicit "yes"/checked value.
pub fn is_checked(raw: &str) -> bool {
    parse_flag(raw).value() == Some(true)
}

const RECOVERY_STEMS: &[&str] = &["recover", "resolv"];
const NEGATIONS: &[&str] = &["not", "never"];

/// A recovery word that is negated by an earlier "not"/"never" or an `un`
/// prefix: "not yet recovered", "unresolved".
fn negates_recovery(text: &str) -> bool {
    let mut negated = false;
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if NEGATIONS.contains(&word) {
            negated = true;
            continue;
        }
        let stem = word.strip_prefix("un").unwrap_or(word);
        if RECOVERY_STEMS.iter().any(|root| stem.starts_with(root))
            && (negated || stem.len() < word.len())
        {
            return true;
        }
    }
    false
}

/// Map a free-text outcome cell to a coded outcome.
///
/// Negated forms ("not recovered/not resolved", "unresolved") are matched
/// before the positive ones they contain.
pub fn parse_outcome(raw: &str) -> AeOutcome {
    if is_blank(raw) {
        return AeOutcome::NotRecorded;
    }
    let text = normalize_text(raw);
    if text.contains("fatal") || text.contains("death") || text.contains("died") {
        AeOutcome::Fatal
    } else if negates_recovery(&text) || text.contains("ongoing") || text.contains("continuing") {
        AeOutcome::NotRecoveredNotResolved
    } else if text.contains("recovering") || text.contains("resolving") {
        AeOutcome::RecoveringResolving
    } else if text.contains("sequel") {
        AeOutcome::RecoveredWithSequelae
    } else if text.contains("recovered") || text.contains("resolved") {
        AeOutcome::RecoveredResolved
    } else if text == "unk" || text.contains("unknown") {
        AeOutcome::Unknown
    } else {
        AeOutcome::Other(raw.trim().to_string())
    }
}

/// Map a causality cell to a relatedness category.
pub fn parse_relatedness(raw: &str) -> Relatedness {
    if is_blank(raw) {
        return Relatedness::Blank;
    }
    let text = normalize_text(raw);
    if text.contains("not related") || text.contains("unrelated") || text == "no" {
        Relatedness::NotRelated
    } else if text.contains("unlikely") {
        Relatedness::Unlikely
    } else if text.contains("probabl") {
        Relatedness::Probable
    } else if text.contains("possibl") {
        Relatedness::Possible
    } else if text.contains("related") || text.contains("definite") || text == "yes" {
        Relatedness::Related
    } else {
        Relatedness::Other(raw.trim().to_string())
    }
}
