#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("invalid vocabulary pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("matching threshold {0} is outside 0.0..=1.0")]
    InvalidThreshold(f64),
}
