//! Tests for vocabulary classification.

use cdm_match::{TermMatcher, Vocabulary, classify};
use cdm_model::{MatchKind, MatcherConfig, VocabularyCategory};
use proptest::prelude::*;

fn hf() -> Vocabulary {
    Vocabulary::heart_failure().expect("built-in vocabulary")
}

#[test]
fn exact_match_prefers_the_longest_term() {
    let result = classify("CHF exacerbation", &hf(), true).expect("match");
    assert_eq!(result.term, "chf exacerbation");
    assert_eq!(result.kind, MatchKind::Exact);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.category, Some(VocabularyCategory::HeartFailure));
}

#[test]
fn abbreviation_inside_a_word_does_not_match() {
    let vocabulary = hf();
    assert_eq!(classify("SHFT", &vocabulary, true), None);
    assert_eq!(classify("shift work disorder", &vocabulary, true), None);
    let bare = classify("Admitted for HF", &vocabulary, true).expect("match");
    assert_eq!(bare.term, "hf");
}

#[test]
fn substring_mode_accepts_embedded_terms() {
    let vocabulary = Vocabulary::builder()
        .term("hf", VocabularyCategory::HeartFailure)
        .build()
        .expect("build");
    assert!(classify("xhfx", &vocabulary, false).is_some());
    assert!(classify("xhfx", &vocabulary, true).is_none());
}

#[test]
fn procedures_are_their_own_kind() {
    let result = classify("Therapeutic paracentesis", &hf(), true).expect("match");
    assert_eq!(result.kind, MatchKind::Procedure);
    assert_eq!(result.category, Some(VocabularyCategory::HfProcedure));
    assert_eq!(result.term, "therapeutic paracentesis");
}

#[test]
fn patterns_match_with_reduced_confidence() {
    let result = classify("worsening heartfailure", &hf(), true).expect("match");
    assert_eq!(result.kind, MatchKind::Pattern);
    assert_eq!(result.confidence, 0.95);
}

#[test]
fn exclusions_veto_before_anything_else() {
    let vocabulary = hf();
    assert_eq!(classify("acute kidney injury with fluid overload", &vocabulary, true), None);
    assert_eq!(classify("Pneumonia", &vocabulary, true), None);
    // "fall" is excluded on word boundaries only.
    assert!(classify("heart failure, fallot repair history", &vocabulary, true).is_some());
}

#[test]
fn approximate_match_above_threshold() {
    let result = classify("chfe", &hf(), true).expect("approximate match");
    assert_eq!(result.kind, MatchKind::Approximate);
    assert_eq!(result.term, "chf");
    assert!(result.confidence >= 0.85 && result.confidence < 1.0);
    assert_eq!(classify("knee replacement", &hf(), true), None);
}

#[test]
fn custom_includes_and_excludes_come_from_config() {
    let config = MatcherConfig {
        include: vec!["Diuretic Resistance".to_string()],
        exclude: vec!["pericardial effusion".to_string()],
        ..MatcherConfig::default()
    };
    let vocabulary = Vocabulary::with_config(&config).expect("build");
    let result = classify("admitted with diuretic resistance", &vocabulary, true).expect("match");
    assert_eq!(result.kind, MatchKind::CustomInclude);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(classify("Pericardial effusion", &vocabulary, true), None);
}

#[test]
fn cache_returns_the_uncached_result() {
    let vocabulary = hf();
    let matcher = TermMatcher::new();
    for text in ["CHF exacerbation", "chfe", "SHFT", "  heart   failure "] {
        let first = matcher.classify(text, &vocabulary, true);
        let second = matcher.classify(text, &vocabulary, true);
        assert_eq!(first, second);
        assert_eq!(first, classify(text, &vocabulary, true));
    }
    assert_eq!(matcher.cache_len(), 4);
}

#[test]
fn new_vocabulary_version_invalidates_cache() {
    let matcher = TermMatcher::new();
    let base = hf();
    assert!(matcher.classify("pleural effusion", &base, true).is_some());

    let config = MatcherConfig {
        exclude: vec!["pleural effusion".to_string()],
        ..MatcherConfig::default()
    };
    let stricter = Vocabulary::with_config(&config).expect("build");
    assert_ne!(base.version(), stricter.version());
    assert_eq!(matcher.classify("pleural effusion", &stricter, true), None);
    assert_eq!(matcher.cache_len(), 1);
}

proptest! {
    #[test]
    fn classification_is_deterministic(text in "[a-zA-Z ,.-]{0,40}") {
        let vocabulary = hf();
        let matcher = TermMatcher::new();
        let direct = classify(&text, &vocabulary, true);
        prop_assert_eq!(matcher.classify(&text, &vocabulary, true), direct.clone());
        prop_assert_eq!(matcher.classify(&text, &vocabulary, true), direct);
    }

    #[test]
    fn confidence_is_bounded(text in ".{0,40}") {
        if let Some(result) = classify(&text, &hf(), true) {
            prop_assert!(result.confidence >= 0.85 && result.confidence <= 1.0);
        }
    }
}
