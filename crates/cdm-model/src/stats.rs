//! Descriptive statistics over derived events.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::field::FieldId;
use crate::ids::PatientId;

/// A statistic that depends on optional fields.
///
/// When a field it needs is absent from the session mapping the statistic
/// is `Unavailable` and names the missing fields; other statistics are
/// still computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Stat<T> {
    Available { value: T },
    Unavailable { missing: Vec<FieldId> },
}

impl<T> Stat<T> {
    pub fn available(value: T) -> Self {
        Stat::Available { value }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Stat::Available { value } => Some(value),
            Stat::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Stat::Available { .. })
    }

    /// Compute the statistic only when nothing it needs is missing.
    pub fn compute(missing: Vec<FieldId>, compute: impl FnOnce() -> T) -> Self {
        if missing.is_empty() {
            Stat::available(compute())
        } else {
            Stat::Unavailable { missing }
        }
    }
}

/// A term and how many events carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Relatedness breakdown for one device component or the procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatednessRow {
    pub component: String,
    pub related: usize,
    pub probable: usize,
    pub possible: usize,
    pub unlikely: usize,
    pub not_related: usize,
    pub blank: usize,
    pub other: usize,
}

/// Per-patient AE counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientAeSummary {
    pub patient: PatientId,
    pub events: usize,
    pub serious: usize,
    pub ongoing: usize,
    pub fatal: usize,
}

/// A filter that was requested but not applied because its field is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFilter {
    pub filter: String,
    pub missing: Vec<FieldId>,
}

/// Adverse event summary for the filtered event set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_events: usize,
    pub patients_with_events: usize,
    pub serious: Stat<usize>,
    pub fatal: Stat<usize>,
    pub ongoing: Stat<usize>,
    pub device_related: Stat<usize>,
    pub procedure_related: Stat<usize>,
    /// Events with onset strictly before the patient's procedure date.
    pub pre_procedure: Stat<usize>,
    pub outcome_distribution: Stat<BTreeMap<String, usize>>,
    pub top_terms: Vec<TermCount>,
    pub sae_criteria: Stat<BTreeMap<String, usize>>,
    pub by_site: BTreeMap<String, usize>,
    pub by_patient: Vec<PatientAeSummary>,
    pub relatedness: Stat<Vec<RelatednessRow>>,
    pub skipped_filters: Vec<SkippedFilter>,
}

/// Per-patient HF hospitalization counts around treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HfPatientSummary {
    pub patient: PatientId,
    pub treatment_date: Option<NaiveDate>,
    /// Unique event dates within the short window (default 183 days) before treatment.
    pub pre_count_6m: usize,
    /// Unique event dates within one year before treatment.
    pub pre_count_1y: usize,
    pub post_count_6m: usize,
    pub post_count_1y: usize,
    /// Events kept without a date.
    pub undated: usize,
}
