//! Validation issues produced by schema and cross-form checks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{FieldId, FieldKey};
use crate::ids::PatientId;
use crate::visit::Visit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Fatal,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueSeverity::Info => "info",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// Identifies the rule that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    // Structural
    UnrecognizedSheet,
    WrongSheet,
    MissingMainSheet,
    MissingField,
    DuplicateColumn,
    MissingPatientId,
    DuplicatePatient,
    OrphanFormRow,
    UnreadableSheet,

    // Cross-form
    FatalAeWithoutDeath,
    FollowUpBeforeProcedure,
    AeOnsetOutsideStudyWindow,
    AeOnsetBeforeProcedureNotMarked,
    AeEndBeforeOnset,
    DeathBeforeAeOnset,
    AmbiguousOnsetClassification,
    UnparseableDate,
    OngoingWithEndDate,
}

impl RuleId {
    pub fn code(self) -> &'static str {
        match self {
            RuleId::UnrecognizedSheet => "SCH001",
            RuleId::WrongSheet => "SCH002",
            RuleId::MissingMainSheet => "SCH003",
            RuleId::MissingField => "SCH004",
            RuleId::DuplicateColumn => "SCH005",
            RuleId::MissingPatientId => "SCH006",
            RuleId::DuplicatePatient => "SCH007",
            RuleId::OrphanFormRow => "SCH008",
            RuleId::UnreadableSheet => "SCH009",
            RuleId::FatalAeWithoutDeath => "XF001",
            RuleId::FollowUpBeforeProcedure => "XF002",
            RuleId::AeOnsetOutsideStudyWindow => "XF003",
            RuleId::AeOnsetBeforeProcedureNotMarked => "XF004",
            RuleId::AeEndBeforeOnset => "XF005",
            RuleId::DeathBeforeAeOnset => "XF006",
            RuleId::AmbiguousOnsetClassification => "XF007",
            RuleId::UnparseableDate => "XF008",
            RuleId::OngoingWithEndDate => "XF009",
        }
    }

    pub fn is_structural(self) -> bool {
        self.code().starts_with("SCH")
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Reference to the data an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub field: FieldId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit: Option<Visit>,
    /// Physical column, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Raw cell text, when the issue concerns a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldRef {
    pub fn new(key: FieldKey) -> Self {
        Self {
            field: key.field,
            visit: key.visit,
            column: None,
            value: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl From<FieldId> for FieldRef {
    fn from(field: FieldId) -> Self {
        FieldRef::new(FieldKey::new(field))
    }
}

/// A validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub rule: RuleId,
    /// Absent for sheet-level structural issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub message: String,
    pub fields: Vec<FieldRef>,
}

impl ValidationIssue {
    pub fn new(severity: IssueSeverity, rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            severity,
            rule,
            patient: None,
            sheet: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn fatal(rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Fatal, rule, message)
    }

    pub fn warning(rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, rule, message)
    }

    pub fn info(rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Info, rule, message)
    }

    #[must_use]
    pub fn for_patient(mut self, patient: &PatientId) -> Self {
        self.patient = Some(patient.clone());
        self
    }

    #[must_use]
    pub fn on_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<FieldRef>) -> Self {
        self.fields.push(field.into());
        self
    }
}

/// Session-scoped issue list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn fatal_count(&self) -> usize {
        self.count(IssueSeverity::Fatal)
    }

    pub fn warning_count(&self) -> usize {
        self.count(IssueSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(IssueSeverity::Info)
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal_count() > 0
    }

    pub fn count_by_rule(&self) -> BTreeMap<RuleId, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.rule).or_insert(0) += 1;
        }
        counts
    }

    /// Issues grouped by patient subject; sheet-level issues are skipped.
    pub fn by_patient(&self) -> BTreeMap<&PatientId, Vec<&ValidationIssue>> {
        let mut grouped: BTreeMap<&PatientId, Vec<&ValidationIssue>> = BTreeMap::new();
        for issue in &self.issues {
            if let Some(patient) = &issue.patient {
                grouped.entry(patient).or_default().push(issue);
            }
        }
        grouped
    }
}
