//! Dataset-level validation.
//!
//! [`CrossFormValidator`] checks consistency across forms for every patient;
//! [`GapAnalyzer`] reports expected fields left blank at visits that took
//! place.

pub mod cross_form;
pub mod gaps;

pub use cross_form::{CrossFormValidator, enrollment_date, marks_pre_procedure};
pub use gaps::{GapAnalyzer, PatientGapCount, gap_counts, visit_occurred};
