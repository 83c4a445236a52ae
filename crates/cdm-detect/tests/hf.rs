//! Heart-failure hospitalization detection tests.

use cdm_detect::HfDetector;
use cdm_match::{TermMatcher, Vocabulary};
use cdm_model::{
    ConfidenceLevel, FieldId, FormRow, HfConfig, HfHospitalizationEvent, MatchKind, PatientId,
    PatientRecord, PatientRecordBuilder, RepeatingForm, TreatmentPeriod, Visit,
};
use chrono::NaiveDate;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn history(builder: PatientRecordBuilder) -> PatientRecord {
    let mut builder = builder
        .value(FieldId::HfhHospitalized, "Yes")
        .value(
            FieldId::HfhTerm,
            "#1 / 2024-01-15 / Heart failure | #2 / 2024-03-10 / Elective admission | #3 / 2022-01-01 / CHF",
        )
        .value(FieldId::HmehTerm, "Pulmonary edema")
        .value(FieldId::HmehDate, "2024-01-15")
        .value(FieldId::MhTerm, "Pneumonia")
        .value(FieldId::MhDate, "2024-02-01");
    builder.push_row(
        RepeatingForm::CardiovascularHistory,
        FormRow::new(0, Some("1".to_string()))
            .with_value(FieldId::CvhTerm, "Fluid overload")
            .with_value(FieldId::CvhDate, "2024-05-01"),
    );
    for row in [
        FormRow::new(0, Some("1".to_string()))
            .with_value(FieldId::AeTerm, "Heart failure exacerbation")
            .with_value(FieldId::AeOnsetDate, "2024-07-01")
            .with_value(FieldId::AeHospitalAdmission, "2024-07-02")
            .with_value(FieldId::AeHospitalDischarge, "2024-07-10"),
        FormRow::new(1, Some("2".to_string()))
            .with_value(FieldId::AeTerm, "Headache")
            .with_value(FieldId::AeOnsetDate, "2024-07-05"),
        FormRow::new(2, Some("3".to_string()))
            .with_value(FieldId::AeTerm, "CHF")
            .with_value(FieldId::AeOnsetDate, "2030-01-01"),
        FormRow::new(3, Some("4".to_string())).with_value(FieldId::AeTerm, "Acute heart failure"),
    ] {
        builder.push_row(RepeatingForm::AdverseEvent, row);
    }
    builder.build()
}

fn treated() -> PatientRecord {
    history(
        PatientRecord::builder(PatientId::new(None, "101-001")).visit_value(
            FieldId::VisitDate,
            Visit::Treatment,
            "2024-06-01",
        ),
    )
}

fn render(events: &[HfHospitalizationEvent]) -> String {
    events
        .iter()
        .map(|event| {
            format!(
                "{} {:?} {}",
                event.event_id,
                event.period,
                event.match_kind.label()
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[test]
fn sources_are_combined_windowed_and_deduplicated() {
    let vocabulary = Vocabulary::heart_failure().expect("built-in vocabulary");
    let matcher = TermMatcher::new();
    let config = HfConfig::default();
    let detector = HfDetector::new(&vocabulary, &matcher, &config);

    let events = detector.extract(&treated());
    insta::assert_snapshot!(
        render(&events),
        @"HFH_101-001_1 PreTreatment exact; HFH_101-001_2 PreTreatment structured; CVH_101-001_1 PreTreatment exact; AE_101-001_1 PostTreatment exact; AE_101-001_4 PostTreatment exact"
    );

    let flagged = &events[1];
    assert_eq!(flagged.match_kind, MatchKind::StructuredFlag);
    assert_eq!(flagged.matched_term, None);
    assert_eq!(flagged.confidence, 1.0);
    assert_eq!(flagged.confidence_level, ConfidenceLevel::High);

    let admitted = &events[3];
    assert_eq!(admitted.admission, Some(day(2024, 7, 2)));
    assert_eq!(admitted.discharge, Some(day(2024, 7, 10)));
    assert_eq!(events[4].admission, None);
}

#[test]
fn patient_summary_counts_unique_dates() {
    let vocabulary = Vocabulary::heart_failure().expect("built-in vocabulary");
    let matcher = TermMatcher::new();
    let config = HfConfig::default();
    let detector = HfDetector::new(&vocabulary, &matcher, &config);
    let record = treated();

    let events = detector.extract(&record);
    let summary = detector.summarize_patient(&record, &events);

    assert_eq!(summary.treatment_date, Some(day(2024, 6, 1)));
    assert_eq!(summary.pre_count_6m, 3);
    assert_eq!(summary.pre_count_1y, 3);
    assert_eq!(summary.post_count_6m, 1);
    assert_eq!(summary.post_count_1y, 1);
    assert_eq!(summary.undated, 1);
}

#[test]
fn without_treatment_date_every_event_is_kept() {
    let vocabulary = Vocabulary::heart_failure().expect("built-in vocabulary");
    let matcher = TermMatcher::new();
    let config = HfConfig::default();
    let detector = HfDetector::new(&vocabulary, &matcher, &config);
    let record = history(PatientRecord::builder(PatientId::new(None, "101-002")));

    let events = detector.extract(&record);
    assert_eq!(events.len(), 7);
    assert!(
        events
            .iter()
            .all(|event| event.period == TreatmentPeriod::Unknown)
    );

    let summary = detector.summarize_patient(&record, &events);
    assert_eq!(summary.treatment_date, None);
    assert_eq!(summary.pre_count_1y, 0);
    assert_eq!(summary.post_count_1y, 0);
}

#[test]
fn procedure_date_stands_in_for_treatment_visit() {
    let vocabulary = Vocabulary::heart_failure().expect("built-in vocabulary");
    let matcher = TermMatcher::new();
    let config = HfConfig::default();
    let detector = HfDetector::new(&vocabulary, &matcher, &config);
    let record = PatientRecord::builder(PatientId::new(None, "101-003"))
        .value(FieldId::ProcedureDate, "01-06-2024")
        .build();

    assert_eq!(detector.treatment_date(&record), Some(day(2024, 6, 1)));
    assert!(detector.extract(&record).is_empty());
}

#[test]
fn unflagged_history_needs_a_term_match() {
    let vocabulary = Vocabulary::heart_failure().expect("built-in vocabulary");
    let matcher = TermMatcher::new();
    let config = HfConfig::default();
    let detector = HfDetector::new(&vocabulary, &matcher, &config);
    let record = PatientRecord::builder(PatientId::new(None, "101-004"))
        .visit_value(FieldId::VisitDate, Visit::Treatment, "2024-06-01")
        .value(FieldId::HfhHospitalized, "No")
        .value(FieldId::HfhTerm, "#1 / 2024-03-10 / Elective admission")
        .build();

    assert!(detector.extract(&record).is_empty());
}
