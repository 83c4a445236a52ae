//! Declarative field table.
//!
//! One [`FieldSpec`] per logical field. Physical names follow the
//! `{VISIT}_{FORM}_{FIELD}` convention of the EDC export; identifiers and
//! log forms use fixed names.

use cdm_model::{FieldId, GapReason, SheetKind, Visit};

/// Visits a per-visit field is collected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Every scheduled visit, on-site or remote.
    AllScheduled,
    /// On-site visits only; remote visits never collect it.
    OnSite,
    /// Follow-up visits after discharge.
    FollowUp,
}

impl Applicability {
    pub fn applies_to(self, visit: Visit) -> bool {
        match self {
            Applicability::AllScheduled => Visit::SCHEDULED.contains(&visit),
            Applicability::OnSite => visit.is_on_site(),
            Applicability::FollowUp => visit.is_follow_up(),
        }
    }

    pub fn gap_reason(self) -> GapReason {
        match self {
            Applicability::AllScheduled => GapReason::EveryScheduledVisit,
            Applicability::OnSite => GapReason::OnSiteVisit,
            Applicability::FollowUp => GapReason::FollowUpVisit,
        }
    }
}

/// Where a field's column lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// A full column name without a visit prefix.
    Fixed(&'static str),
    /// One column under a single visit prefix: `{visit}_{suffix}`.
    AtVisit(Visit, &'static str),
    /// `{visit}_{suffix}` for every applicable visit.
    PerVisit {
        suffix: &'static str,
        applicability: Applicability,
    },
}

/// A field is excused when `trigger` (at the same visit) holds one of `values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipRule {
    pub trigger: FieldId,
    pub values: &'static [&'static str],
}

/// Values of an assessment status field meaning the assessment was not done.
pub const NOT_DONE: &[&str] = &["not done", "nd", "yes", "y", "checked", "x", "1", "true"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: FieldId,
    /// Form code, used for gap reporting and SDV keys.
    pub form: &'static str,
    pub sheet: SheetKind,
    pub scope: FieldScope,
    /// Alternative full column names accepted for fixed-name fields.
    pub aliases: &'static [&'static str],
    /// Absence is a structural warning rather than info.
    pub critical: bool,
    /// Expected for gap analysis.
    pub expected: bool,
    pub skip: Option<SkipRule>,
}

impl FieldSpec {
    const fn new(field: FieldId, form: &'static str, sheet: SheetKind, scope: FieldScope) -> Self {
        Self {
            field,
            form,
            sheet,
            scope,
            aliases: &[],
            critical: false,
            expected: false,
            skip: None,
        }
    }

    const fn main(field: FieldId, form: &'static str, scope: FieldScope) -> Self {
        Self::new(field, form, SheetKind::Main, scope)
    }

    const fn ae(field: FieldId, column: &'static str) -> Self {
        Self::new(field, "AE", SheetKind::AeLog, FieldScope::Fixed(column))
    }

    const fn cvh(field: FieldId, column: &'static str) -> Self {
        Self::new(field, "CVH", SheetKind::CvhLog, FieldScope::Fixed(column))
    }

    const fn aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }

    const fn critical(self) -> Self {
        Self {
            critical: true,
            ..self
        }
    }

    const fn expected(self) -> Self {
        Self {
            expected: true,
            ..self
        }
    }

    const fn skip_when_not_done(self, trigger: FieldId) -> Self {
        Self {
            skip: Some(SkipRule {
                trigger,
                values: NOT_DONE,
            }),
            ..self
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.form == "ID"
    }

    /// Visit the gap analyzer reports a fixed-visit field under.
    pub fn fixed_visit(&self) -> Option<Visit> {
        match self.scope {
            FieldScope::AtVisit(visit, _) => Some(visit),
            _ => None,
        }
    }
}

const fn per_visit(suffix: &'static str, applicability: Applicability) -> FieldScope {
    FieldScope::PerVisit {
        suffix,
        applicability,
    }
}

const ALL: Applicability = Applicability::AllScheduled;
const ON_SITE: Applicability = Applicability::OnSite;

/// Per-visit columns whose name breaks the `{VISIT}_{suffix}` rule.
pub const VISIT_COLUMN_OVERRIDES: &[(FieldId, Visit, &str)] =
    &[(FieldId::VisitDate, Visit::Treatment, "TV_PR_SVDTC")];

use FieldId as F;

pub const FIELD_SPECS: &[FieldSpec] = &[
    // Identifiers, present on every sheet.
    FieldSpec::main(F::ScreeningNumber, "ID", FieldScope::Fixed("Screening #"))
        .aliases(&["Screening Number", "Subject", "Subject ID", "Patient ID"])
        .critical(),
    FieldSpec::main(F::SiteNumber, "ID", FieldScope::Fixed("Site #"))
        .aliases(&["Site", "Site Number"])
        .critical(),
    FieldSpec::main(F::Status, "ID", FieldScope::Fixed("Status"))
        .aliases(&["Subject Status"])
        .critical(),
    FieldSpec::main(F::Initials, "ID", FieldScope::Fixed("Initials")),
    FieldSpec::new(
        F::ScreeningNumber,
        "ID",
        SheetKind::AeLog,
        FieldScope::Fixed("Screening #"),
    )
    .aliases(&["Screening Number", "Subject", "Subject ID", "Patient ID"])
    .critical(),
    FieldSpec::new(
        F::SiteNumber,
        "ID",
        SheetKind::AeLog,
        FieldScope::Fixed("Site #"),
    )
    .aliases(&["Site", "Site Number"]),
    FieldSpec::new(
        F::TemplateNumber,
        "ID",
        SheetKind::AeLog,
        FieldScope::Fixed("Template number"),
    )
    .aliases(&["AE #", "AE Number", "LOGS_AE_AESPID"]),
    FieldSpec::new(
        F::ScreeningNumber,
        "ID",
        SheetKind::CvhLog,
        FieldScope::Fixed("Screening #"),
    )
    .aliases(&["Screening Number", "Subject", "Subject ID", "Patient ID"])
    .critical(),
    FieldSpec::new(
        F::SiteNumber,
        "ID",
        SheetKind::CvhLog,
        FieldScope::Fixed("Site #"),
    )
    .aliases(&["Site", "Site Number"]),
    FieldSpec::new(
        F::TemplateNumber,
        "ID",
        SheetKind::CvhLog,
        FieldScope::Fixed("Template number"),
    ),
    // Visit and procedure dates.
    FieldSpec::main(F::VisitDate, "SV", per_visit("SV_SVSTDTC", ALL)).critical(),
    FieldSpec::main(
        F::ProcedureDate,
        "PR",
        FieldScope::AtVisit(Visit::Treatment, "PR_PRSTDTC"),
    )
    .critical()
    .expected(),
    FieldSpec::main(
        F::ConsentDate,
        "ICF",
        FieldScope::AtVisit(Visit::Screening, "ICF_RFICDTC"),
    )
    .critical()
    .expected(),
    FieldSpec::main(
        F::BirthDate,
        "DM",
        FieldScope::AtVisit(Visit::Screening, "DM_BRTHDAT"),
    )
    .expected(),
    FieldSpec::main(F::Age, "ELIG", FieldScope::AtVisit(Visit::Screening, "ELIG_AGE")),
    FieldSpec::main(F::Sex, "ELIG", FieldScope::AtVisit(Visit::Screening, "ELIG_SEX"))
        .expected(),
    FieldSpec::main(
        F::EligibilityDecision,
        "ELIG",
        FieldScope::AtVisit(Visit::Screening, "ELIG_IEORRES_CONF5"),
    )
    .critical(),
    // Death form.
    FieldSpec::main(F::DeathDate, "DTH", FieldScope::AtVisit(Visit::Logs, "DTH_DDDTC"))
        .critical(),
    FieldSpec::main(
        F::DeathCategory,
        "DTH",
        FieldScope::AtVisit(Visit::Logs, "DTH_DDRESCAT"),
    ),
    FieldSpec::main(
        F::DeathReason,
        "DTH",
        FieldScope::AtVisit(Visit::Logs, "DTH_DDORRES"),
    ),
    // Assessments collected at every scheduled visit.
    FieldSpec::main(F::NyhaStatus, "FS", per_visit("FS_RSSTAT_FSNYHA", ALL)),
    FieldSpec::main(F::NyhaClass, "FS", per_visit("FS_RSORRES_FSNYHA", ALL))
        .expected()
        .skip_when_not_done(F::NyhaStatus),
    FieldSpec::main(F::KccqStatus, "KCCQ", per_visit("KCCQ_QSSTAT_KCCQ", ALL)),
    FieldSpec::main(
        F::KccqOverall,
        "KCCQ",
        per_visit("KCCQ_QSORRES_KCCQ_OVERALL", ALL),
    )
    .expected()
    .skip_when_not_done(F::KccqStatus),
    FieldSpec::main(F::CfsStatus, "CFSS", per_visit("CFSS_RSSTAT_CFSS", ALL)),
    FieldSpec::main(F::CfsScore, "CFSS", per_visit("CFSS_RSORRES_CFSS", ALL))
        .expected()
        .skip_when_not_done(F::CfsStatus),
    // On-site assessments.
    FieldSpec::main(
        F::SixMinuteWalkStatus,
        "6MWT",
        per_visit("6MWT_FTSTAT_SIXMW1", ON_SITE),
    ),
    FieldSpec::main(
        F::SixMinuteWalkDistance,
        "6MWT",
        per_visit("6MWT_FTORRES_DIS", ON_SITE),
    )
    .expected()
    .skip_when_not_done(F::SixMinuteWalkStatus),
    FieldSpec::main(F::VitalsStatus, "VS", per_visit("VS_VSSTAT", ON_SITE)),
    FieldSpec::main(F::SystolicBp, "VS", per_visit("VS_VSORRES_SYSBP", ON_SITE))
        .expected()
        .skip_when_not_done(F::VitalsStatus),
    FieldSpec::main(F::DiastolicBp, "VS", per_visit("VS_VSORRES_DIABP", ON_SITE))
        .expected()
        .skip_when_not_done(F::VitalsStatus),
    FieldSpec::main(F::HeartRate, "VS", per_visit("VS_VSORRES_HR", ON_SITE))
        .expected()
        .skip_when_not_done(F::VitalsStatus),
    FieldSpec::main(F::Weight, "VS", per_visit("VS_VSORRES_WEIGHT", ON_SITE))
        .expected()
        .skip_when_not_done(F::VitalsStatus),
    FieldSpec::main(F::LabStatus, "LB", per_visit("LB_CBC_LBSTAT", ON_SITE)),
    FieldSpec::main(F::Hemoglobin, "LB", per_visit("LB_CBC_LBORRES_HGB", ON_SITE))
        .expected()
        .skip_when_not_done(F::LabStatus),
    FieldSpec::main(F::Creatinine, "LB", per_visit("LB_BMP_LBORRES_CREA", ON_SITE))
        .expected()
        .skip_when_not_done(F::LabStatus),
    FieldSpec::main(F::NtProBnp, "LB", per_visit("LB_ENZ_LBORRES_BNPPRO", ON_SITE))
        .expected()
        .skip_when_not_done(F::LabStatus),
    FieldSpec::main(F::EchoStatus, "ECHO", per_visit("ECHO_SPONSOR_PRSTAT", ON_SITE)),
    FieldSpec::main(F::Lvef, "ECHO", per_visit("ECHO_SPONSOR_LVEF", ON_SITE))
        .expected()
        .skip_when_not_done(F::EchoStatus),
    FieldSpec::main(
        F::TricuspidRegurgitation,
        "ECHO",
        per_visit("ECHO_SPONSOR_TRGRADE", ON_SITE),
    )
    .expected()
    .skip_when_not_done(F::EchoStatus),
    // History forms on the main sheet.
    FieldSpec::main(
        F::HfhHospitalized,
        "HFH",
        FieldScope::AtVisit(Visit::Screening, "HFH_HOOCCUR"),
    ),
    FieldSpec::main(
        F::HfhTerm,
        "HFH",
        FieldScope::AtVisit(Visit::Screening, "HFH_HOTERM"),
    ),
    FieldSpec::main(
        F::HfhDate,
        "HFH",
        FieldScope::AtVisit(Visit::Screening, "HFH_HOSTDTC"),
    ),
    FieldSpec::main(
        F::HmehTerm,
        "HMEH",
        FieldScope::AtVisit(Visit::Screening, "HMEH_HOTERM"),
    ),
    FieldSpec::main(
        F::HmehDate,
        "HMEH",
        FieldScope::AtVisit(Visit::Screening, "HMEH_HOSTDTC"),
    ),
    FieldSpec::main(F::MhTerm, "MH", FieldScope::AtVisit(Visit::Screening, "MH_MHTERM")),
    FieldSpec::main(
        F::MhDate,
        "MH",
        FieldScope::AtVisit(Visit::Screening, "MH_MHSTDTC"),
    ),
    // Adverse event log.
    FieldSpec::ae(F::AeTerm, "LOGS_AE_AETERM")
        .aliases(&["AETERM", "AE Term", "Adverse Event"])
        .critical(),
    FieldSpec::ae(F::AeOnsetDate, "LOGS_AE_AESTDTC")
        .aliases(&["AESTDTC", "Onset Date", "AE Start Date"])
        .critical(),
    FieldSpec::ae(F::AeEndDate, "LOGS_AE_AEENDTC").aliases(&["AEENDTC", "End Date"]),
    FieldSpec::ae(F::AeOngoing, "LOGS_AE_AEONGO")
        .aliases(&["AEONGO", "Ongoing"])
        .critical(),
    FieldSpec::ae(F::AeInterval, "LOGS_AE_AEINT").aliases(&["AEINT", "Interval"]),
    FieldSpec::ae(F::AeOutcome, "LOGS_AE_AEOUT")
        .aliases(&["AEOUT", "Outcome"])
        .critical(),
    FieldSpec::ae(F::AeSeverity, "LOGS_AE_AESEV")
        .aliases(&["AESEV", "Severity"])
        .critical(),
    FieldSpec::ae(F::AeRelatedImplant, "LOGS_AE_AEREL1").aliases(&["AEREL1"]),
    FieldSpec::ae(F::AeRelatedDelivery, "LOGS_AE_AEREL2").aliases(&["AEREL2"]),
    FieldSpec::ae(F::AeRelatedHandle, "LOGS_AE_AEREL3").aliases(&["AEREL3"]),
    FieldSpec::ae(F::AeRelatedProcedure, "LOGS_AE_AEREL4").aliases(&["AEREL4"]),
    FieldSpec::ae(F::AeSerious, "LOGS_AE_AESER")
        .aliases(&["AESER", "Serious"])
        .critical(),
    FieldSpec::ae(F::AeDeathCriterion, "LOGS_AE_AESDTH").aliases(&["AESDTH"]),
    FieldSpec::ae(F::AeHospitalizationCriterion, "LOGS_AE_AESHOSP").aliases(&["AESHOSP"]),
    FieldSpec::ae(F::AeLifeThreateningCriterion, "LOGS_AE_AESLIFE").aliases(&["AESLIFE"]),
    FieldSpec::ae(F::AeDisabilityCriterion, "LOGS_AE_AESDISAB").aliases(&["AESDISAB"]),
    FieldSpec::ae(F::AeMedicallyImportantCriterion, "LOGS_AE_AESMIE").aliases(&["AESMIE"]),
    FieldSpec::ae(F::AeHospitalAdmission, "LOGS_AE_HOSPSTDAT").aliases(&["HOSPSTDAT"]),
    FieldSpec::ae(F::AeHospitalDischarge, "LOGS_AE_HOSPENDAT").aliases(&["HOSPENDAT"]),
    FieldSpec::ae(F::AeReportDate, "LOGS_AE_AEREPDAT").aliases(&["AEREPDAT", "Report Date"]),
    // Cardiovascular history log.
    FieldSpec::cvh(F::CvhTerm, "SBV_CVH_PRTRT")
        .aliases(&["CVH_PRTRT", "Procedure"])
        .critical(),
    FieldSpec::cvh(F::CvhDate, "SBV_CVH_PRSTDTC").aliases(&["CVH_PRSTDTC", "Procedure Date"]),
];
