//! Derived clinical events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::PatientId;
use crate::matching::{ConfidenceLevel, MatchKind, VocabularyCategory};
use crate::normalized::{AeOutcome, NormalizedDate, Relatedness};

/// Seriousness criteria checked on the AE form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriousnessCriteria {
    pub death: bool,
    pub hospitalization: bool,
    pub life_threatening: bool,
    pub disability: bool,
    pub medically_important: bool,
}

impl SeriousnessCriteria {
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.death {
            labels.push("Death");
        }
        if self.hospitalization {
            labels.push("Hospitalization");
        }
        if self.life_threatening {
            labels.push("Life-threatening");
        }
        if self.disability {
            labels.push("Disability");
        }
        if self.medically_important {
            labels.push("Medically important");
        }
        labels
    }
}

/// Device component relatedness, one per device part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRelatedness {
    pub implant: Relatedness,
    pub delivery_system: Relatedness,
    pub handle: Relatedness,
}

impl DeviceRelatedness {
    pub fn any_related(&self) -> bool {
        self.implant.is_related() || self.delivery_system.is_related() || self.handle.is_related()
    }
}

/// An adverse event derived from an AE log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdverseEvent {
    pub patient: PatientId,
    /// AE number on the log, when recorded.
    pub sequence: Option<String>,
    pub term: String,
    pub onset: NormalizedDate,
    pub end: NormalizedDate,
    pub outcome: AeOutcome,
    pub severity: Option<String>,
    /// Onset interval relative to the procedure as recorded (e.g. "Pre-procedure").
    pub interval: Option<String>,
    pub serious: bool,
    pub criteria: SeriousnessCriteria,
    pub device: DeviceRelatedness,
    pub procedure: Relatedness,
    pub device_related: bool,
    pub procedure_related: bool,
    /// Non-terminal outcome and no end date.
    pub ongoing: bool,
    /// The form's own "ongoing" checkbox, kept for audit.
    pub ongoing_marked: Option<bool>,
    /// Onset strictly before the procedure date; false when either is unknown.
    pub pre_procedure: bool,
    pub hospital_admission: NormalizedDate,
    pub hospital_discharge: NormalizedDate,
    pub report_date: NormalizedDate,
    /// Row index on the AE sheet the event was taken from.
    pub source_row: usize,
}

impl AdverseEvent {
    pub fn is_fatal(&self) -> bool {
        self.outcome.is_fatal()
    }
}

/// Form an HF hospitalization was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HfSource {
    /// Heart failure history (primary pre-treatment source).
    #[serde(rename = "HFH")]
    HeartFailureHistory,
    /// Hospitalization and medical events history.
    #[serde(rename = "HMEH")]
    HospitalizationHistory,
    /// Cardiovascular history log.
    #[serde(rename = "CVH")]
    CardiovascularHistory,
    /// General medical history.
    #[serde(rename = "MH")]
    MedicalHistory,
    /// Adverse event log (post-treatment).
    #[serde(rename = "AE")]
    AdverseEvent,
}

impl HfSource {
    pub fn code(self) -> &'static str {
        match self {
            HfSource::HeartFailureHistory => "HFH",
            HfSource::HospitalizationHistory => "HMEH",
            HfSource::CardiovascularHistory => "CVH",
            HfSource::MedicalHistory => "MH",
            HfSource::AdverseEvent => "AE",
        }
    }
}

/// Position of an event relative to the treatment date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentPeriod {
    PreTreatment,
    PostTreatment,
    /// No treatment date or no event date to compare.
    Unknown,
}

/// A heart-failure hospitalization episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HfHospitalizationEvent {
    /// Stable within a session: `{source}_{subject}_{entry}`.
    pub event_id: String,
    pub patient: PatientId,
    pub source: HfSource,
    pub period: TreatmentPeriod,
    /// Vocabulary term (or pattern) the text matched; none for flag-only events.
    pub matched_term: Option<String>,
    pub category: Option<VocabularyCategory>,
    pub match_kind: MatchKind,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub original_text: String,
    pub admission: Option<NaiveDate>,
    pub discharge: Option<NaiveDate>,
}

impl HfHospitalizationEvent {
    /// Date used for windowing and deduplication.
    pub fn event_date(&self) -> Option<NaiveDate> {
        self.admission
    }
}
