pub mod config;
pub mod error;
pub mod event;
pub mod field;
pub mod gap;
pub mod ids;
pub mod issue;
pub mod mapping;
pub mod matching;
pub mod normalized;
pub mod record;
pub mod session;
pub mod stats;
pub mod visit;

pub use config::{AeFilters, EngineConfig, GapConfig, HfConfig, MatcherConfig, ValidationConfig};
pub use error::{ConfigError, Result};
pub use event::{
    AdverseEvent, DeviceRelatedness, HfHospitalizationEvent, HfSource, SeriousnessCriteria,
    TreatmentPeriod,
};
pub use field::{FieldId, FieldKey, SheetKind};
pub use gap::{GapReason, GapRecord};
pub use ids::{PatientId, SdvKey};
pub use issue::{FieldRef, IssueSeverity, RuleId, ValidationIssue, ValidationReport};
pub use mapping::{Resolution, ResolvedMapping};
pub use matching::{ConfidenceLevel, ConfidenceThresholds, MatchKind, VocabularyCategory};
pub use normalized::{
    AeOutcome, DateValue, Normalized, NormalizedDate, NormalizedNumber, ParseFailure,
    ParseOutcome, PartialDate, Relatedness,
};
pub use record::{FormRow, PatientRecord, PatientRecordBuilder, RepeatingForm};
pub use session::{EngineOutput, Session};
pub use stats::{
    HfPatientSummary, PatientAeSummary, RelatednessRow, SkippedFilter, Stat, SummaryStats,
    TermCount,
};
pub use visit::{Visit, VisitKind};
