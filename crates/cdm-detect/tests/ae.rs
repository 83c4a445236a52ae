//! Adverse event extraction and summary tests.

use cdm_detect::{AeDetector, is_ongoing, is_pre_procedure, procedure_date, summarize, top_terms};
use cdm_model::{
    AeFilters, AeOutcome, DateValue, FieldId, FieldKey, FormRow, Normalized, ParseOutcome,
    PatientId, PatientRecord, RepeatingForm, Resolution, ResolvedMapping, SheetKind, Stat,
};
use cdm_normalize::parse_date;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

const AE_FIELDS: [FieldId; 17] = [
    FieldId::AeTerm,
    FieldId::AeOnsetDate,
    FieldId::AeEndDate,
    FieldId::AeOutcome,
    FieldId::AeSerious,
    FieldId::AeRelatedImplant,
    FieldId::AeRelatedDelivery,
    FieldId::AeRelatedHandle,
    FieldId::AeRelatedProcedure,
    FieldId::AeDeathCriterion,
    FieldId::AeHospitalizationCriterion,
    FieldId::AeLifeThreateningCriterion,
    FieldId::AeDisabilityCriterion,
    FieldId::AeMedicallyImportantCriterion,
    FieldId::AeReportDate,
    FieldId::AeHospitalAdmission,
    FieldId::AeHospitalDischarge,
];

fn mapping(main: &[FieldId], ae: &[FieldId]) -> ResolvedMapping {
    let mut mapping = ResolvedMapping::new();
    for (sheet, fields) in [(SheetKind::Main, main), (SheetKind::AeLog, ae)] {
        for field in fields {
            mapping.insert(
                sheet,
                FieldKey::new(*field),
                Resolution::Present(format!("{field:?}")),
            );
        }
    }
    mapping
}

fn full_mapping() -> ResolvedMapping {
    mapping(&[FieldId::Status, FieldId::ProcedureDate], &AE_FIELDS)
}

fn ae_row(seq: &str, term: &str, onset: &str, outcome: &str) -> FormRow {
    FormRow::new(0, Some(seq.to_string()))
        .with_value(FieldId::AeTerm, term)
        .with_value(FieldId::AeOnsetDate, onset)
        .with_value(FieldId::AeOutcome, outcome)
}

fn patient(subject: &str, procedure: &str, rows: Vec<FormRow>) -> PatientRecord {
    let mut builder = PatientRecord::builder(PatientId::new(None, subject))
        .value(FieldId::Status, "Enrolled")
        .value(FieldId::ProcedureDate, procedure);
    for row in rows {
        builder.push_row(RepeatingForm::AdverseEvent, row);
    }
    builder.build()
}

fn extract_all(records: &[PatientRecord]) -> Vec<cdm_model::AdverseEvent> {
    let detector = AeDetector::new();
    records
        .iter()
        .flat_map(|record| detector.extract(record, procedure_date(record)))
        .collect()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn complete(date: NaiveDate) -> Normalized<DateValue> {
    Normalized::new(
        date.to_string(),
        ParseOutcome::Parsed(DateValue::Complete(date)),
    )
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn extracts_events_with_derived_flags() {
    let record = patient(
        "101-001",
        "15-01-2024",
        vec![
            ae_row("1", "Dyspnea", "10-01-2024", "Recovered/Resolved")
                .with_value(FieldId::AeEndDate, "12-01-2024"),
            ae_row("2", "Heart failure", "01-02-2024", "Not Recovered/Not Resolved")
                .with_value(FieldId::AeSerious, "Yes")
                .with_value(FieldId::AeHospitalizationCriterion, "Checked")
                .with_value(FieldId::AeRelatedImplant, "Possibly related"),
        ],
    );
    let events = AeDetector::new().extract(&record, procedure_date(&record));

    assert_eq!(events.len(), 2);
    assert!(events[0].pre_procedure);
    assert!(!events[0].ongoing);
    assert!(!events[1].pre_procedure);
    assert!(events[1].ongoing);
    assert!(events[1].serious);
    assert!(events[1].device_related);
    assert_eq!(events[1].criteria.labels(), vec!["Hospitalization"]);
    assert_eq!(events[1].sequence.as_deref(), Some("2"));
}

#[test]
fn onset_on_procedure_day_is_not_pre_procedure() {
    let p = day(2024, 1, 15);
    assert!(!is_pre_procedure(&complete(p), Some(p)));
    assert!(is_pre_procedure(&complete(p - Duration::days(1)), Some(p)));
    assert!(!is_pre_procedure(&complete(p - Duration::days(1)), None));
    assert!(!is_pre_procedure(&parse_date(""), Some(p)));
    assert!(!is_pre_procedure(&parse_date("not a date"), Some(p)));
}

#[test]
fn partial_onset_counts_only_when_wholly_before() {
    let p = day(2024, 1, 15);
    // January 2024 straddles the procedure day.
    assert!(!is_pre_procedure(&parse_date("2024-01"), Some(p)));
    assert!(is_pre_procedure(&parse_date("2023-12"), Some(p)));
    assert!(is_pre_procedure(&parse_date("2023"), Some(p)));
}

#[test]
fn ongoing_truth_table() {
    let end = complete(day(2024, 3, 1));
    let no_end = parse_date("");
    let cases = [
        (AeOutcome::RecoveredResolved, &end, false),
        (AeOutcome::RecoveredResolved, &no_end, false),
        (AeOutcome::NotRecoveredNotResolved, &end, false),
        (AeOutcome::NotRecoveredNotResolved, &no_end, true),
        (AeOutcome::Fatal, &end, false),
        (AeOutcome::Fatal, &no_end, false),
        (AeOutcome::NotRecorded, &no_end, true),
    ];
    for (outcome, end, expected) in cases {
        assert_eq!(is_ongoing(&outcome, end), expected, "{outcome:?}");
    }
}

#[test]
fn ongoing_outcome_text_without_end_date_is_ongoing() {
    let record = patient(
        "101-001",
        "15-01-2024",
        vec![ae_row("1", "Edema", "01-02-2024", "Ongoing")],
    );
    let events = AeDetector::new().extract(&record, procedure_date(&record));
    assert!(events[0].ongoing);
}

proptest! {
    #[test]
    fn pre_procedure_is_strictly_before(offset in -800i64..800) {
        let p = day(2024, 6, 1);
        let onset = p + Duration::days(offset);
        prop_assert_eq!(is_pre_procedure(&complete(onset), Some(p)), onset < p);
    }

    #[test]
    fn ongoing_matches_definition(terminal in any::<bool>(), has_end in any::<bool>()) {
        let outcome = if terminal { AeOutcome::RecoveredResolved } else { AeOutcome::RecoveringResolving };
        let end = if has_end { complete(day(2024, 1, 1)) } else { parse_date("") };
        prop_assert_eq!(is_ongoing(&outcome, &end), !terminal && !has_end);
    }
}

// ============================================================================
// Summary
// ============================================================================

fn cohort() -> Vec<PatientRecord> {
    vec![
        patient(
            "101-001",
            "15-01-2024",
            vec![
                ae_row("1", "Dyspnea", "10-01-2024", "Recovered/Resolved")
                    .with_value(FieldId::AeEndDate, "12-01-2024"),
                ae_row("2", "Heart failure", "01-02-2024", "Fatal")
                    .with_value(FieldId::AeSerious, "Yes")
                    .with_value(FieldId::AeDeathCriterion, "Yes"),
            ],
        ),
        patient(
            "102-001",
            "20-01-2024",
            vec![ae_row("1", "dyspnea", "25-01-2024", "Recovering/Resolving")],
        ),
    ]
}

#[test]
fn summary_counts_cohort() {
    let records = cohort();
    let events = extract_all(&records);
    let stats = summarize(&events, &records, &full_mapping(), &AeFilters::default());

    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.patients_with_events, 2);
    assert_eq!(stats.serious, Stat::available(1));
    assert_eq!(stats.fatal, Stat::available(1));
    assert_eq!(stats.ongoing, Stat::available(1));
    assert_eq!(stats.pre_procedure, Stat::available(1));
    assert_eq!(stats.by_site.get("101"), Some(&2));
    assert_eq!(stats.by_site.get("102"), Some(&1));
    assert_eq!(stats.by_patient.len(), 2);
    assert_eq!(stats.by_patient[0].fatal, 1);

    let criteria = stats.sae_criteria.value().expect("criteria available");
    assert_eq!(criteria.get("Death"), Some(&1));
    assert_eq!(criteria.get("Disability"), Some(&0));

    let relatedness = stats.relatedness.value().expect("relatedness available");
    assert_eq!(relatedness.len(), 4);
    assert_eq!(relatedness[0].component, "Implant");
    assert_eq!(relatedness[0].blank, 3);
}

#[test]
fn missing_procedure_date_field_degrades_only_pre_procedure() {
    let records = cohort();
    let events = extract_all(&records);
    let mapping = mapping(&[FieldId::Status], &AE_FIELDS);
    let stats = summarize(&events, &records, &mapping, &AeFilters::default());

    assert_eq!(
        stats.pre_procedure,
        Stat::Unavailable {
            missing: vec![FieldId::ProcedureDate]
        }
    );
    assert!(stats.serious.is_available());
    assert!(stats.ongoing.is_available());
    assert!(stats.outcome_distribution.is_available());
    assert_eq!(stats.total_events, 3);
}

#[test]
fn filter_with_unresolved_field_is_skipped() {
    let records = cohort();
    let events = extract_all(&records);
    let ae_without_serious: Vec<FieldId> = AE_FIELDS
        .into_iter()
        .filter(|field| *field != FieldId::AeSerious)
        .collect();
    let mapping = mapping(&[FieldId::Status, FieldId::ProcedureDate], &ae_without_serious);
    let filters = AeFilters {
        serious_only: true,
        exclude_pre_procedure: true,
        ..AeFilters::default()
    };
    let stats = summarize(&events, &records, &mapping, &filters);

    assert_eq!(stats.skipped_filters.len(), 1);
    assert_eq!(stats.skipped_filters[0].filter, "serious_only");
    // Pre-procedure filter still applied.
    assert_eq!(stats.total_events, 2);
    assert!(!stats.serious.is_available());
}

#[test]
fn screen_failures_and_cutoffs_filter_events() {
    let mut records = cohort();
    records.push(
        PatientRecord::builder(PatientId::new(None, "103-001"))
            .value(FieldId::Status, "Screen Failure")
            .row(
                RepeatingForm::AdverseEvent,
                ae_row("1", "Rash", "01-01-2024", "Recovered/Resolved"),
            )
            .build(),
    );
    let events = extract_all(&records);
    let filters = AeFilters {
        exclude_screen_failures: true,
        onset_cutoff: Some(day(2024, 1, 31)),
        ..AeFilters::default()
    };
    let stats = summarize(&events, &records, &full_mapping(), &filters);

    assert_eq!(stats.total_events, 2);
    assert!(stats.skipped_filters.is_empty());
    assert!(!stats.by_site.contains_key("103"));
}

#[test]
fn top_terms_group_case_insensitively() {
    let records = cohort();
    let events = extract_all(&records);
    let refs: Vec<&cdm_model::AdverseEvent> = events.iter().collect();
    let rendered: Vec<String> = top_terms(&refs, 10)
        .into_iter()
        .map(|term| format!("{} x{}", term.term, term.count))
        .collect();
    insta::assert_snapshot!(rendered.join(", "), @"Dyspnea x2, Heart failure x1");
}
