//! Term classification vocabulary categories and confidence bands.

use serde::{Deserialize, Serialize};

/// Vocabulary category a matched term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyCategory {
    /// Heart-failure diagnoses and fluid-overload symptoms.
    HeartFailure,
    /// Procedures and therapies given for decompensation.
    HfProcedure,
    /// Terms added through configuration.
    Custom,
}

/// How a term was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// A structured hospitalization flag on the form, no term match needed.
    StructuredFlag,
    CustomInclude,
    Exact,
    Procedure,
    Pattern,
    Approximate,
}

impl MatchKind {
    pub fn label(self) -> &'static str {
        match self {
            MatchKind::StructuredFlag => "structured",
            MatchKind::CustomInclude => "custom",
            MatchKind::Exact => "exact",
            MatchKind::Procedure => "procedure",
            MatchKind::Pattern => "pattern",
            MatchKind::Approximate => "approximate",
        }
    }
}

/// Confidence band for reviewers.
///
/// - `High`: exact, custom or structured matches
/// - `Medium`: pattern matches and close approximate matches
/// - `Low`: approximate matches just above the acceptance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Boundaries between confidence bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for high bands (default: 0.99).
    pub high: f64,
    /// Minimum confidence for medium bands (default: 0.92).
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.99,
            medium: 0.92,
        }
    }
}

impl ConfidenceThresholds {
    /// Every accepted match has a band; anything under `medium` is `Low`.
    #[must_use]
    pub fn categorize(&self, confidence: f64) -> ConfidenceLevel {
        if confidence >= self.high {
            ConfidenceLevel::High
        } else if confidence >= self.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}
