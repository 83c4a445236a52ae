//! Event detection over patient records.
//!
//! [`AeDetector`] derives adverse events from the AE log and [`summarize`]
//! turns them into descriptive statistics. [`HfDetector`] finds
//! heart-failure hospitalizations across the history forms and the AE log.

pub mod ae;
pub mod hf;
pub mod summary;

pub use ae::{AeDetector, is_ongoing, is_pre_procedure, merge_overflow_rows, procedure_date};
pub use hf::{HfDetector, HistoryEntry, in_post_window, in_pre_window, parse_history_entries};
pub use summary::{TOP_TERMS, summarize, top_terms};
