//! Logical field identifiers.
//!
//! Detectors refer to data only through these identifiers; the column
//! registry owns the translation to physical `{VISIT}_{FORM}_{FIELD}` names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::visit::Visit;

/// Sheet kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    /// One row per patient, all visit forms flattened into columns.
    Main,
    /// Adverse event log, one row per event (plus overflow rows).
    AeLog,
    /// Cardiovascular history log, one row per prior procedure.
    CvhLog,
}

impl SheetKind {
    pub const ALL: [SheetKind; 3] = [SheetKind::Main, SheetKind::AeLog, SheetKind::CvhLog];

    pub fn label(self) -> &'static str {
        match self {
            SheetKind::Main => "Main",
            SheetKind::AeLog => "Adverse Events",
            SheetKind::CvhLog => "Cardiovascular History",
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A logical field the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    // Identifiers
    ScreeningNumber,
    SiteNumber,
    Status,
    Initials,
    TemplateNumber,

    // Visit and procedure dates
    VisitDate,
    ProcedureDate,
    ConsentDate,
    BirthDate,
    Age,
    Sex,
    EligibilityDecision,

    // Death form
    DeathDate,
    DeathCategory,
    DeathReason,

    // Visit assessments
    NyhaStatus,
    NyhaClass,
    KccqStatus,
    KccqOverall,
    CfsStatus,
    CfsScore,
    SixMinuteWalkStatus,
    SixMinuteWalkDistance,
    VitalsStatus,
    SystolicBp,
    DiastolicBp,
    HeartRate,
    Weight,
    LabStatus,
    Hemoglobin,
    Creatinine,
    NtProBnp,
    EchoStatus,
    Lvef,
    TricuspidRegurgitation,

    // History forms on the main sheet
    HfhHospitalized,
    HfhTerm,
    HfhDate,
    HmehTerm,
    HmehDate,
    MhTerm,
    MhDate,

    // Adverse event log
    AeTerm,
    AeOnsetDate,
    AeEndDate,
    AeOngoing,
    AeInterval,
    AeOutcome,
    AeSeverity,
    AeRelatedImplant,
    AeRelatedDelivery,
    AeRelatedHandle,
    AeRelatedProcedure,
    AeSerious,
    AeDeathCriterion,
    AeHospitalizationCriterion,
    AeLifeThreateningCriterion,
    AeDisabilityCriterion,
    AeMedicallyImportantCriterion,
    AeHospitalAdmission,
    AeHospitalDischarge,
    AeReportDate,

    // Cardiovascular history log
    CvhTerm,
    CvhDate,
}

impl FieldId {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldId::ScreeningNumber => "screening_number",
            FieldId::SiteNumber => "site_number",
            FieldId::Status => "status",
            FieldId::Initials => "initials",
            FieldId::TemplateNumber => "template_number",
            FieldId::VisitDate => "visit_date",
            FieldId::ProcedureDate => "procedure_date",
            FieldId::ConsentDate => "consent_date",
            FieldId::BirthDate => "birth_date",
            FieldId::Age => "age",
            FieldId::Sex => "sex",
            FieldId::EligibilityDecision => "eligibility_decision",
            FieldId::DeathDate => "death_date",
            FieldId::DeathCategory => "death_category",
            FieldId::DeathReason => "death_reason",
            FieldId::NyhaStatus => "nyha_status",
            FieldId::NyhaClass => "nyha_class",
            FieldId::KccqStatus => "kccq_status",
            FieldId::KccqOverall => "kccq_overall",
            FieldId::CfsStatus => "cfs_status",
            FieldId::CfsScore => "cfs_score",
            FieldId::SixMinuteWalkStatus => "six_minute_walk_status",
            FieldId::SixMinuteWalkDistance => "six_minute_walk_distance",
            FieldId::VitalsStatus => "vitals_status",
            FieldId::SystolicBp => "systolic_bp",
            FieldId::DiastolicBp => "diastolic_bp",
            FieldId::HeartRate => "heart_rate",
            FieldId::Weight => "weight",
            FieldId::LabStatus => "lab_status",
            FieldId::Hemoglobin => "hemoglobin",
            FieldId::Creatinine => "creatinine",
            FieldId::NtProBnp => "nt_pro_bnp",
            FieldId::EchoStatus => "echo_status",
            FieldId::Lvef => "lvef",
            FieldId::TricuspidRegurgitation => "tricuspid_regurgitation",
            FieldId::HfhHospitalized => "hfh_hospitalized",
            FieldId::HfhTerm => "hfh_term",
            FieldId::HfhDate => "hfh_date",
            FieldId::HmehTerm => "hmeh_term",
            FieldId::HmehDate => "hmeh_date",
            FieldId::MhTerm => "mh_term",
            FieldId::MhDate => "mh_date",
            FieldId::AeTerm => "ae_term",
            FieldId::AeOnsetDate => "ae_onset_date",
            FieldId::AeEndDate => "ae_end_date",
            FieldId::AeOngoing => "ae_ongoing",
            FieldId::AeInterval => "ae_interval",
            FieldId::AeOutcome => "ae_outcome",
            FieldId::AeSeverity => "ae_severity",
            FieldId::AeRelatedImplant => "ae_related_implant",
            FieldId::AeRelatedDelivery => "ae_related_delivery",
            FieldId::AeRelatedHandle => "ae_related_handle",
            FieldId::AeRelatedProcedure => "ae_related_procedure",
            FieldId::AeSerious => "ae_serious",
            FieldId::AeDeathCriterion => "ae_death_criterion",
            FieldId::AeHospitalizationCriterion => "ae_hospitalization_criterion",
            FieldId::AeLifeThreateningCriterion => "ae_life_threatening_criterion",
            FieldId::AeDisabilityCriterion => "ae_disability_criterion",
            FieldId::AeMedicallyImportantCriterion => "ae_medically_important_criterion",
            FieldId::AeHospitalAdmission => "ae_hospital_admission",
            FieldId::AeHospitalDischarge => "ae_hospital_discharge",
            FieldId::AeReportDate => "ae_report_date",
            FieldId::CvhTerm => "cvh_term",
            FieldId::CvhDate => "cvh_date",
        }
    }

    /// Device component relatedness fields, in form order.
    pub const DEVICE_RELATEDNESS: [FieldId; 3] = [
        FieldId::AeRelatedImplant,
        FieldId::AeRelatedDelivery,
        FieldId::AeRelatedHandle,
    ];
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical field, qualified by visit for per-visit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub field: FieldId,
    pub visit: Option<Visit>,
}

impl FieldKey {
    pub fn new(field: FieldId) -> Self {
        Self { field, visit: None }
    }

    pub fn at(field: FieldId, visit: Visit) -> Self {
        Self {
            field,
            visit: Some(visit),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.visit {
            Some(visit) => write!(f, "{}@{}", self.field, visit),
            None => write!(f, "{}", self.field),
        }
    }
}
