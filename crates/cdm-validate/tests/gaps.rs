//! Gap analysis tests.

use cdm_model::{
    FieldId, GapConfig, GapReason, GapRecord, PatientId, PatientRecord, Resolution,
    ResolvedMapping, SheetKind, Visit,
};
use cdm_registry::ColumnRegistry;
use cdm_validate::{GapAnalyzer, gap_counts};

/// Every main-sheet registry column resolved, except `skip`.
fn mapping(registry: &ColumnRegistry, skip: &[FieldId]) -> ResolvedMapping {
    let mut mapping = ResolvedMapping::new();
    for entry in registry.entries_for(SheetKind::Main) {
        let resolution = if skip.contains(&entry.key.field) {
            Resolution::Missing
        } else {
            Resolution::Present(entry.column.clone())
        };
        mapping.insert(SheetKind::Main, entry.key, resolution);
    }
    mapping
}

fn patient(subject: &str, status: &str) -> PatientRecord {
    PatientRecord::builder(PatientId::new(None, subject))
        .value(FieldId::Status, status)
        .value(FieldId::ConsentDate, "2024-01-02")
        .visit_value(FieldId::VisitDate, Visit::Screening, "2024-01-05")
        .visit_value(FieldId::NyhaStatus, Visit::Screening, "Not done")
        .visit_value(FieldId::KccqOverall, Visit::Screening, "62")
        .visit_value(FieldId::VitalsStatus, Visit::Screening, "")
        .build()
}

fn find(gaps: &[GapRecord], visit: Visit, field: FieldId) -> &GapRecord {
    gaps.iter()
        .find(|gap| gap.visit == visit && gap.field == field)
        .expect("gap record")
}

#[test]
fn expected_fields_at_occurred_visits() {
    let registry = ColumnRegistry::standard();
    let mapping = mapping(&registry, &[]);
    let config = GapConfig::default();
    let gaps = GapAnalyzer::new(&registry, &mapping, &config).analyze(&[patient("101-001", "Enrolled")]);

    assert!(gaps.iter().all(|gap| gap.visit == Visit::Screening));

    let kccq = find(&gaps, Visit::Screening, FieldId::KccqOverall);
    assert!(kccq.satisfied);
    assert_eq!(kccq.reason, GapReason::EveryScheduledVisit);

    let nyha = find(&gaps, Visit::Screening, FieldId::NyhaClass);
    assert!(nyha.excused);
    assert!(nyha.satisfied);

    let weight = find(&gaps, Visit::Screening, FieldId::Weight);
    assert!(!weight.satisfied);
    assert!(!weight.excused);
    assert_eq!(weight.reason, GapReason::OnSiteVisit);

    let consent = find(&gaps, Visit::Screening, FieldId::ConsentDate);
    assert!(consent.satisfied);
    assert_eq!(consent.reason, GapReason::FixedVisit);
    assert_eq!(consent.column.as_deref(), Some("SBV_ICF_RFICDTC"));
}

#[test]
fn future_visits_are_shown_when_requested() {
    let registry = ColumnRegistry::standard();
    let mapping = mapping(&registry, &[]);
    let config = GapConfig {
        hide_future_visits: false,
        ..GapConfig::default()
    };
    let gaps = GapAnalyzer::new(&registry, &mapping, &config).analyze(&[patient("101-001", "Enrolled")]);

    let remote = gaps
        .iter()
        .filter(|gap| gap.visit == Visit::FollowUp3Month)
        .collect::<Vec<_>>();
    assert!(!remote.is_empty());
    assert!(remote.iter().all(|gap| !gap.visit_occurred));
    // Remote visits never expect on-site fields.
    assert!(remote.iter().all(|gap| gap.reason != GapReason::OnSiteVisit));
}

#[test]
fn unresolved_column_is_an_unsatisfied_gap() {
    let registry = ColumnRegistry::standard();
    let mapping = mapping(&registry, &[FieldId::KccqOverall]);
    let config = GapConfig::default();
    let gaps = GapAnalyzer::new(&registry, &mapping, &config).analyze(&[patient("101-001", "Enrolled")]);

    let kccq = find(&gaps, Visit::Screening, FieldId::KccqOverall);
    assert_eq!(kccq.column, None);
    assert!(!kccq.satisfied);
}

#[test]
fn screen_failures_are_excluded_by_default() {
    let registry = ColumnRegistry::standard();
    let mapping = mapping(&registry, &[]);
    let records = [
        patient("101-001", "Enrolled"),
        patient("101-002", "Screen Failure"),
    ];

    let config = GapConfig::default();
    let gaps = GapAnalyzer::new(&registry, &mapping, &config).analyze(&records);
    let counts = gap_counts(&gaps);
    assert_eq!(counts.len(), 1);

    let count = counts
        .get(&PatientId::new(None, "101-001"))
        .expect("enrolled patient counted");
    assert_eq!(count.expected, gaps.len());
    assert!(count.missing > 0);
    assert!(count.excused >= 1);

    let config = GapConfig {
        exclude_screen_failures: false,
        ..GapConfig::default()
    };
    let gaps = GapAnalyzer::new(&registry, &mapping, &config).analyze(&records);
    assert_eq!(gap_counts(&gaps).len(), 2);
}
