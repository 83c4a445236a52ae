//! Free-text classification against a vocabulary.
//!
//! Phases, first hit wins:
//!
//! 1. exclusions (word boundary) veto the text
//! 2. custom includes, confidence 1.0
//! 3. exact terms, heart-failure then procedure, confidence 1.0
//! 4. regex patterns, confidence 0.95
//! 5. Jaro-Winkler similarity of the whole text against every term
//!
//! Only phase 3 honors `boundary_mode`; exclusions and includes always
//! match on word boundaries.

use std::collections::HashMap;
use std::sync::RwLock;

use cdm_model::{MatchKind, VocabularyCategory};
use rapidfuzz::distance::jaro_winkler;

use crate::vocabulary::{Vocabulary, VocabularyVersion, normalize_term};

pub const PATTERN_CONFIDENCE: f64 = 0.95;

/// A successful classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    /// Vocabulary term, include, or pattern source that matched.
    pub term: String,
    pub category: Option<VocabularyCategory>,
    pub kind: MatchKind,
    pub confidence: f64,
}

/// Classify `text` against `vocabulary`.
///
/// A pure function of its inputs. `None` means no match (confidence 0).
pub fn classify(text: &str, vocabulary: &Vocabulary, boundary_mode: bool) -> Option<TermMatch> {
    let normalized = normalize_term(text);
    classify_normalized(&normalized, vocabulary, boundary_mode)
}

fn classify_normalized(
    text: &str,
    vocabulary: &Vocabulary,
    boundary_mode: bool,
) -> Option<TermMatch> {
    if text.is_empty() {
        return None;
    }

    if let Some(excluded) = vocabulary
        .exclusions()
        .iter()
        .find(|term| contains_word(text, term))
    {
        tracing::trace!(text, excluded = excluded.as_str(), "term excluded");
        return None;
    }

    if let Some(include) = vocabulary
        .includes()
        .iter()
        .find(|term| contains_word(text, term))
    {
        return Some(TermMatch {
            term: include.clone(),
            category: Some(VocabularyCategory::Custom),
            kind: MatchKind::CustomInclude,
            confidence: 1.0,
        });
    }

    for (category, kind) in [
        (VocabularyCategory::HeartFailure, MatchKind::Exact),
        (VocabularyCategory::HfProcedure, MatchKind::Procedure),
        (VocabularyCategory::Custom, MatchKind::Exact),
    ] {
        let hit = vocabulary.terms_in(category).find(|term| {
            if boundary_mode {
                contains_word(text, &term.text)
            } else {
                text.contains(term.text.as_str())
            }
        });
        if let Some(term) = hit {
            return Some(TermMatch {
                term: term.text.clone(),
                category: Some(category),
                kind,
                confidence: 1.0,
            });
        }
    }

    if let Some(pattern) = vocabulary
        .patterns()
        .iter()
        .find(|pattern| pattern.regex.is_match(text))
    {
        return Some(TermMatch {
            term: pattern.source.clone(),
            category: Some(VocabularyCategory::HeartFailure),
            kind: MatchKind::Pattern,
            confidence: PATTERN_CONFIDENCE,
        });
    }

    best_approximate(text, vocabulary)
}

fn best_approximate(text: &str, vocabulary: &Vocabulary) -> Option<TermMatch> {
    let mut best: Option<(f64, &crate::vocabulary::VocabularyTerm)> = None;
    for term in vocabulary.terms() {
        let score = jaro_winkler::similarity(text.chars(), term.text.chars());
        // Strictly greater keeps the earlier (longer) term on ties.
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, term));
        }
    }
    let (score, term) = best?;
    if score < vocabulary.threshold() {
        return None;
    }
    Some(TermMatch {
        term: term.text.clone(),
        category: Some(term.category),
        kind: MatchKind::Approximate,
        confidence: score,
    })
}

/// True when `needle` occurs in `haystack` with no alphanumeric character
/// directly before or after it.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    boundary_mode: bool,
    version: VocabularyVersion,
}

#[derive(Debug, Default)]
struct CacheState {
    version: Option<VocabularyVersion>,
    entries: HashMap<CacheKey, Option<TermMatch>>,
}

/// Memoizing wrapper around [`classify`].
///
/// Safe to share between threads. Entries are keyed by the normalized
/// text, boundary mode and vocabulary version; classifying against a new
/// vocabulary version drops every entry of the old one.
#[derive(Debug, Default)]
pub struct TermMatcher {
    cache: RwLock<CacheState>,
}

impl TermMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(
        &self,
        text: &str,
        vocabulary: &Vocabulary,
        boundary_mode: bool,
    ) -> Option<TermMatch> {
        let key = CacheKey {
            text: normalize_term(text),
            boundary_mode,
            version: vocabulary.version().clone(),
        };
        if let Ok(state) = self.cache.read()
            && let Some(hit) = state.entries.get(&key)
        {
            return hit.clone();
        }

        let result = classify_normalized(&key.text, vocabulary, boundary_mode);
        if let Ok(mut state) = self.cache.write() {
            if state.version.as_ref() != Some(&key.version) {
                if state.version.is_some() {
                    tracing::debug!(
                        version = key.version.short(),
                        dropped = state.entries.len(),
                        "vocabulary changed, term cache invalidated"
                    );
                }
                let current = key.version.clone();
                state.entries.retain(|cached, _| cached.version == current);
                state.version = Some(current);
            }
            state.entries.insert(key, result.clone());
        }
        result
    }

    /// Cached entries, all for the current vocabulary version.
    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.cache.write() {
            state.entries.clear();
            state.version = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries() {
        assert!(contains_word("chf exacerbation", "chf"));
        assert!(contains_word("acute hf.", "hf"));
        assert!(!contains_word("shft", "hf"));
        assert!(!contains_word("chf", "hf"));
        assert!(contains_word("hf, hf", "hf"));
        assert!(!contains_word("anything", ""));
    }
}
