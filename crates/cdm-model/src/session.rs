//! A loaded dataset and the engine's derived output.

use serde::{Deserialize, Serialize};

use crate::event::{AdverseEvent, HfHospitalizationEvent};
use crate::gap::GapRecord;
use crate::ids::PatientId;
use crate::issue::{ValidationIssue, ValidationReport};
use crate::mapping::ResolvedMapping;
use crate::record::PatientRecord;
use crate::stats::{HfPatientSummary, SummaryStats};

/// Everything loaded for one workbook.
///
/// A session is replaced wholesale on reload; nothing derived from a
/// previous session is carried over.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub source: String,
    pub records: Vec<PatientRecord>,
    pub mapping: ResolvedMapping,
    /// Structural issues found while identifying sheets and columns.
    pub schema_issues: Vec<ValidationIssue>,
}

impl Session {
    pub fn record(&self, patient: &PatientId) -> Option<&PatientRecord> {
        self.records.iter().find(|record| record.id() == patient)
    }

    pub fn patient_count(&self) -> usize {
        self.records.len()
    }
}

/// Ordered collections handed to presentation and export collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    pub source: String,
    pub patients: usize,
    pub adverse_events: Vec<AdverseEvent>,
    pub hf_events: Vec<HfHospitalizationEvent>,
    pub hf_summaries: Vec<HfPatientSummary>,
    pub report: ValidationReport,
    pub gaps: Vec<GapRecord>,
    pub summary: SummaryStats,
}

impl EngineOutput {
    pub fn has_fatal(&self) -> bool {
        self.report.has_fatal()
    }

    pub fn unsatisfied_gaps(&self) -> usize {
        self.gaps.iter().filter(|gap| !gap.satisfied).count()
    }
}
