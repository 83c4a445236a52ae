//! Controlled vocabularies and their version fingerprint.

use std::fmt;

use cdm_model::{MatcherConfig, VocabularyCategory};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::VocabularyError;

/// Heart-failure diagnoses and fluid-overload symptoms.
pub const HF_TERMS: &[&str] = &[
    "heart failure",
    "hf",
    "chf",
    "congestive heart failure",
    "acute heart failure",
    "acute on chronic heart failure",
    "acute-on-chronic heart failure",
    "chronic heart failure",
    "heart failure exacerbation",
    "hf exacerbation",
    "chf exacerbation",
    "decompensated heart failure",
    "acute decompensated heart failure",
    "adhf",
    "cardiac decompensation",
    "left heart failure",
    "right heart failure",
    "left ventricular failure",
    "right ventricular failure",
    "biventricular failure",
    "cardiogenic shock",
    "cardiogenic pulmonary edema",
    "pulmonary edema",
    "cardiac pulmonary edema",
    "flash pulmonary edema",
    "volume overload",
    "fluid overload",
    "cardiac fluid overload",
    "ascites",
    "cardiac ascites",
    "pericardial effusion",
    "pleural effusion",
    "peripheral edema",
    "lower extremity edema",
    "leg edema",
    "anasarca",
];

/// Procedures and therapies given for decompensation.
pub const HF_PROCEDURE_TERMS: &[&str] = &[
    "paracentesis",
    "abdominal paracentesis",
    "therapeutic paracentesis",
    "thoracentesis",
    "pleural drainage",
    "pleural tap",
    "ultrafiltration",
    "aquapheresis",
    "diuretic infusion",
    "iv diuretic",
    "intravenous diuretic",
    "furosemide infusion",
    "lasix infusion",
    "bumetanide infusion",
];

pub const HF_PATTERNS: &[&str] = &[
    r"heart\s*fail",
    r"hf\s+exac",
    r"chf\s+exac",
    r"cardiac\s+decomp",
    r"decomp.*heart",
    r"congest.*heart",
    r"pulmon.*edema",
    r"fluid\s+overload",
    r"volume\s+overload",
];

/// Text mentioning any of these is never HF-related.
pub const HF_EXCLUSIONS: &[&str] = &[
    "kidney",
    "renal",
    "aki",
    "ckd",
    "nephro",
    "dialysis",
    "creatinine",
    "uremia",
    "liver",
    "hepatic",
    "cirrhosis",
    "hepato",
    "copd",
    "asthma",
    "pneumonia",
    "bronchitis",
    "respiratory failure",
    "anemia",
    "anaemia",
    "hypokalemia",
    "hyponatremia",
    "hyperkalemia",
    "hypotension",
    "hypertension",
    "sepsis",
    "cancer",
    "tumor",
    "fracture",
    "stroke",
    "cva",
    "fall",
    "cellulitis",
    "wound",
    "ulcer",
    "shoulder",
    "premature ventricular contractions",
    "pvc",
];

pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Lowercase, trimmed, single-spaced.
pub fn normalize_term(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 fingerprint of a vocabulary's contents and threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VocabularyVersion(String);

impl VocabularyVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for VocabularyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyTerm {
    pub text: String,
    pub category: VocabularyCategory,
}

#[derive(Debug, Clone)]
pub struct VocabularyPattern {
    pub source: String,
    pub regex: Regex,
}

/// An immutable, versioned vocabulary.
///
/// Terms are held longest first so the most specific phrase wins when
/// several occur in one text.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<VocabularyTerm>,
    patterns: Vec<VocabularyPattern>,
    exclusions: Vec<String>,
    includes: Vec<String>,
    threshold: f64,
    version: VocabularyVersion,
}

impl Vocabulary {
    pub fn builder() -> VocabularyBuilder {
        VocabularyBuilder::default()
    }

    /// The built-in heart-failure vocabulary.
    pub fn heart_failure() -> Result<Self, VocabularyError> {
        Self::heart_failure_builder().build()
    }

    /// The heart-failure vocabulary with configured includes, excludes and
    /// threshold.
    pub fn with_config(config: &MatcherConfig) -> Result<Self, VocabularyError> {
        let mut builder = Self::heart_failure_builder().threshold(config.threshold);
        for term in &config.include {
            builder = builder.include(term);
        }
        for term in &config.exclude {
            builder = builder.exclude(term);
        }
        builder.build()
    }

    fn heart_failure_builder() -> VocabularyBuilder {
        let mut builder = Self::builder().threshold(DEFAULT_THRESHOLD);
        for term in HF_TERMS {
            builder = builder.term(term, VocabularyCategory::HeartFailure);
        }
        for term in HF_PROCEDURE_TERMS {
            builder = builder.term(term, VocabularyCategory::HfProcedure);
        }
        for pattern in HF_PATTERNS {
            builder = builder.pattern(pattern);
        }
        for term in HF_EXCLUSIONS {
            builder = builder.exclude(term);
        }
        builder
    }

    pub fn terms(&self) -> &[VocabularyTerm] {
        &self.terms
    }

    pub fn terms_in(&self, category: VocabularyCategory) -> impl Iterator<Item = &VocabularyTerm> {
        self.terms.iter().filter(move |term| term.category == category)
    }

    pub fn patterns(&self) -> &[VocabularyPattern] {
        &self.patterns
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn version(&self) -> &VocabularyVersion {
        &self.version
    }
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyBuilder {
    terms: Vec<VocabularyTerm>,
    patterns: Vec<String>,
    exclusions: Vec<String>,
    includes: Vec<String>,
    threshold: Option<f64>,
}

impl VocabularyBuilder {
    #[must_use]
    pub fn term(mut self, text: &str, category: VocabularyCategory) -> Self {
        let text = normalize_term(text);
        if !text.is_empty() {
            self.terms.push(VocabularyTerm { text, category });
        }
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    #[must_use]
    pub fn exclude(mut self, text: &str) -> Self {
        let text = normalize_term(text);
        if !text.is_empty() {
            self.exclusions.push(text);
        }
        self
    }

    /// Custom terms always treated as matches (confidence 1.0).
    #[must_use]
    pub fn include(mut self, text: &str) -> Self {
        let text = normalize_term(text);
        if !text.is_empty() {
            self.includes.push(text);
        }
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn build(self) -> Result<Vocabulary, VocabularyError> {
        let threshold = self.threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(VocabularyError::InvalidThreshold(threshold));
        }

        let mut terms = self.terms;
        dedup_in_order(&mut terms, |term| (term.text.clone(), term.category));
        // Stable: equal lengths keep declaration order.
        terms.sort_by_key(|term| std::cmp::Reverse(term.text.chars().count()));

        let patterns = self
            .patterns
            .iter()
            .map(|source| {
                Regex::new(&format!("(?i){source}"))
                    .map(|regex| VocabularyPattern {
                        source: source.clone(),
                        regex,
                    })
                    .map_err(|source_err| VocabularyError::InvalidPattern {
                        pattern: source.clone(),
                        source: source_err,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut exclusions = self.exclusions;
        dedup_in_order(&mut exclusions, String::clone);
        let mut includes = self.includes;
        dedup_in_order(&mut includes, String::clone);

        let version = fingerprint(&terms, &self.patterns, &exclusions, &includes, threshold);
        tracing::debug!(
            version = version.short(),
            terms = terms.len(),
            patterns = patterns.len(),
            exclusions = exclusions.len(),
            includes = includes.len(),
            "vocabulary built"
        );
        Ok(Vocabulary {
            terms,
            patterns,
            exclusions,
            includes,
            threshold,
            version,
        })
    }
}

fn dedup_in_order<T, K: Eq + std::hash::Hash>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

fn fingerprint(
    terms: &[VocabularyTerm],
    patterns: &[String],
    exclusions: &[String],
    includes: &[String],
    threshold: f64,
) -> VocabularyVersion {
    let mut lines: Vec<String> = Vec::new();
    lines.extend(
        terms
            .iter()
            .map(|term| format!("term\t{:?}\t{}", term.category, term.text)),
    );
    lines.extend(patterns.iter().map(|p| format!("pattern\t{p}")));
    lines.extend(exclusions.iter().map(|e| format!("exclude\t{e}")));
    lines.extend(includes.iter().map(|i| format!("include\t{i}")));
    lines.sort();
    lines.push(format!("threshold\t{threshold:.6}"));

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    VocabularyVersion(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ignores_declaration_order() {
        let a = Vocabulary::builder()
            .term("heart failure", VocabularyCategory::HeartFailure)
            .term("ascites", VocabularyCategory::HeartFailure)
            .build()
            .expect("build");
        let b = Vocabulary::builder()
            .term("Ascites", VocabularyCategory::HeartFailure)
            .term("heart  failure", VocabularyCategory::HeartFailure)
            .build()
            .expect("build");
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn version_changes_with_contents_and_threshold() {
        let base = Vocabulary::heart_failure().expect("build");
        let mut config = MatcherConfig::default();
        assert_eq!(
            Vocabulary::with_config(&config).expect("build").version(),
            base.version()
        );
        config.include.push("diuretic resistance".to_string());
        assert_ne!(
            Vocabulary::with_config(&config).expect("build").version(),
            base.version()
        );
        let config = MatcherConfig {
            threshold: 0.9,
            ..MatcherConfig::default()
        };
        assert_ne!(
            Vocabulary::with_config(&config).expect("build").version(),
            base.version()
        );
    }

    #[test]
    fn terms_are_longest_first() {
        let vocabulary = Vocabulary::heart_failure().expect("build");
        let lengths: Vec<usize> = vocabulary
            .terms()
            .iter()
            .map(|term| term.text.chars().count())
            .collect();
        assert!(lengths.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let result = Vocabulary::builder().pattern("heart(").build();
        assert!(matches!(result, Err(VocabularyError::InvalidPattern { .. })));
    }
}
