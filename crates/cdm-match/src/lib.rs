//! Term matching for free-text clinical fields.
//!
//! A [`Vocabulary`] is immutable and carries a SHA-256 version; the
//! [`TermMatcher`] memoizes classifications per vocabulary version.

pub mod error;
pub mod matcher;
pub mod vocabulary;

pub use error::VocabularyError;
pub use matcher::{PATTERN_CONFIDENCE, TermMatch, TermMatcher, classify, contains_word};
pub use vocabulary::{
    DEFAULT_THRESHOLD, Vocabulary, VocabularyBuilder, VocabularyTerm, VocabularyVersion,
    normalize_term,
};
