//! Cross-form rule tests.

use cdm_model::{
    FieldId, FormRow, IssueSeverity, PatientId, PatientRecord, PatientRecordBuilder,
    RepeatingForm, RuleId, ValidationConfig, ValidationReport, Visit,
};
use cdm_validate::{CrossFormValidator, enrollment_date};
use chrono::NaiveDate;

fn config() -> ValidationConfig {
    ValidationConfig {
        as_of: NaiveDate::from_ymd_opt(2025, 1, 1),
        ..ValidationConfig::default()
    }
}

fn base(subject: &str) -> PatientRecordBuilder {
    PatientRecord::builder(PatientId::new(None, subject))
        .value(FieldId::Status, "Enrolled")
        .value(FieldId::ConsentDate, "2024-01-02")
        .visit_value(FieldId::VisitDate, Visit::Screening, "2024-01-05")
        .value(FieldId::ProcedureDate, "2024-03-20")
}

fn ae(seq: &str, term: &str) -> FormRow {
    FormRow::new(0, Some(seq.to_string())).with_value(FieldId::AeTerm, term)
}

fn validate(records: &[PatientRecord]) -> ValidationReport {
    let config = config();
    CrossFormValidator::new(&config).validate(records)
}

fn rules(report: &ValidationReport) -> Vec<RuleId> {
    report.issues.iter().map(|issue| issue.rule).collect()
}

#[test]
fn fatal_ae_needs_a_death_form() {
    let without_death = base("101-001")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Cardiac arrest")
                .with_value(FieldId::AeOnsetDate, "2024-04-01")
                .with_value(FieldId::AeOutcome, "Fatal"),
        )
        .build();
    let report = validate(&[without_death]);
    assert_eq!(rules(&report), vec![RuleId::FatalAeWithoutDeath]);
    assert_eq!(report.issues[0].severity, IssueSeverity::Fatal);
    insta::assert_snapshot!(
        report.issues[0].message,
        @"AE #1 (Cardiac arrest) has a fatal outcome but no death form entry"
    );

    let with_death = base("101-002")
        .value(FieldId::DeathDate, "2024-04-02")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Cardiac arrest")
                .with_value(FieldId::AeOnsetDate, "2024-04-01")
                .with_value(FieldId::AeEndDate, "2024-04-02")
                .with_value(FieldId::AeOutcome, "Fatal"),
        )
        .build();
    assert!(validate(&[with_death]).issues.is_empty());
}

#[test]
fn death_date_placeholder_is_not_a_death_form() {
    let record = base("101-010")
        .value(FieldId::DeathDate, "nan")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Cardiac arrest")
                .with_value(FieldId::AeOnsetDate, "2024-04-01")
                .with_value(FieldId::AeOutcome, "Fatal"),
        )
        .build();
    let report = validate(&[record]);
    assert_eq!(
        report.count_by_rule().get(&RuleId::FatalAeWithoutDeath),
        Some(&1)
    );
}

#[test]
fn recovered_outcome_never_needs_a_death_form() {
    let record = base("101-003")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Dyspnea")
                .with_value(FieldId::AeOnsetDate, "2024-04-01")
                .with_value(FieldId::AeEndDate, "2024-04-05")
                .with_value(FieldId::AeOutcome, "Recovered/Resolved"),
        )
        .build();
    assert!(validate(&[record]).issues.is_empty());
}

#[test]
fn follow_up_before_procedure_is_fatal() {
    let record = base("101-004")
        .visit_value(FieldId::VisitDate, Visit::FollowUp30Day, "2024-03-01")
        .visit_value(FieldId::VisitDate, Visit::FollowUp6Month, "2024-09-20")
        .build();
    let report = validate(&[record]);
    assert_eq!(rules(&report), vec![RuleId::FollowUpBeforeProcedure]);
    assert!(report.has_fatal());
    assert_eq!(report.issues[0].fields[0].visit, Some(Visit::FollowUp30Day));
}

#[test]
fn onset_outside_the_study_window_warns() {
    let record = base("101-005")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Edema")
                .with_value(FieldId::AeOnsetDate, "2023-11-01")
                .with_value(FieldId::AeInterval, "Pre-procedure")
                .with_value(FieldId::AeEndDate, "2023-11-10"),
        )
        .row(
            RepeatingForm::AdverseEvent,
            ae("2", "Rash")
                .with_value(FieldId::AeOnsetDate, "2026-06-01")
                .with_value(FieldId::AeEndDate, "2026-06-10"),
        )
        .build();
    let report = validate(&[record]);
    assert_eq!(
        rules(&report),
        vec![
            RuleId::AeOnsetOutsideStudyWindow,
            RuleId::AeOnsetOutsideStudyWindow
        ]
    );
    assert!(report.issues[0].message.contains("before enrollment"));
    assert!(report.issues[1].message.contains("future"));
    assert!(!report.has_fatal());
}

#[test]
fn rules_fire_independently_for_one_patient() {
    let record = base("101-006")
        .value(FieldId::DeathDate, "2024-05-01")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Dyspnea")
                .with_value(FieldId::AeOnsetDate, "2024-03-10")
                .with_value(FieldId::AeEndDate, "2024-03-01")
                .with_value(FieldId::AeOutcome, "Recovered/Resolved"),
        )
        .row(
            RepeatingForm::AdverseEvent,
            ae("2", "Edema")
                .with_value(FieldId::AeOnsetDate, "2024-06-01")
                .with_value(FieldId::AeOngoing, "Yes")
                .with_value(FieldId::AeEndDate, "2024-06-05"),
        )
        .row(
            RepeatingForm::AdverseEvent,
            ae("3", "Palpitations").with_value(FieldId::AeOnsetDate, "03/04/2024"),
        )
        .row(
            RepeatingForm::AdverseEvent,
            ae("4", "Fatigue").with_value(FieldId::AeOnsetDate, "sometime in May"),
        )
        .build();
    let report = validate(&[record]);
    let counts = report.count_by_rule();

    assert_eq!(counts.get(&RuleId::AeOnsetBeforeProcedureNotMarked), Some(&1));
    assert_eq!(counts.get(&RuleId::AeEndBeforeOnset), Some(&1));
    assert_eq!(counts.get(&RuleId::DeathBeforeAeOnset), Some(&1));
    assert_eq!(counts.get(&RuleId::AmbiguousOnsetClassification), Some(&1));
    assert_eq!(counts.get(&RuleId::UnparseableDate), Some(&1));
    assert_eq!(counts.get(&RuleId::OngoingWithEndDate), Some(&1));
    assert_eq!(report.fatal_count(), 0);
    assert_eq!(report.by_patient().len(), 1);
}

#[test]
fn unreadable_key_dates_are_info() {
    let record = base("101-007")
        .visit_value(FieldId::VisitDate, Visit::Discharge, "31-31-2024")
        .build();
    let report = validate(&[record]);
    assert_eq!(rules(&report), vec![RuleId::UnparseableDate]);
    assert_eq!(report.info_count(), 1);
}

#[test]
fn unreadable_key_date_message_names_the_field() {
    let record = base("101-009")
        .value(FieldId::DeathDate, "sometime")
        .build();
    let report = validate(&[record]);
    assert_eq!(rules(&report), vec![RuleId::UnparseableDate]);
    insta::assert_snapshot!(
        report.issues[0].message,
        @"death date 'sometime' could not be read"
    );
}

#[test]
fn huge_future_tolerance_does_not_overflow() {
    let config = ValidationConfig {
        future_tolerance_days: 100_000_000,
        ..config()
    };
    let record = base("101-011")
        .row(
            RepeatingForm::AdverseEvent,
            ae("1", "Rash")
                .with_value(FieldId::AeOnsetDate, "2026-06-01")
                .with_value(FieldId::AeEndDate, "2026-06-10"),
        )
        .build();
    let report = CrossFormValidator::new(&config).validate(&[record]);
    assert!(
        !report
            .count_by_rule()
            .contains_key(&RuleId::AeOnsetOutsideStudyWindow)
    );
}

#[test]
fn enrollment_falls_back_to_screening_visit() {
    let record = PatientRecord::builder(PatientId::new(None, "101-008"))
        .visit_value(FieldId::VisitDate, Visit::Screening, "05-01-2024")
        .build();
    assert_eq!(enrollment_date(&record), NaiveDate::from_ymd_opt(2024, 1, 5));
}
