//! Loader tests against CSV exports written to a temporary directory.

use std::fs;
use std::path::Path;

use cdm_ingest::{IngestError, load_session, read_workbook};
use cdm_model::{FieldId, FieldKey, IssueSeverity, RuleId, SheetKind, Visit};
use cdm_registry::ColumnRegistry;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

const MAIN: &str = "\u{feff}Screening #,Site #,Status,SBV_SV_SVSTDTC,TV_PR_SVDTC,TV_PR_PRSTDTC,LOGS_DTH_DDDTC\n\
Screening Number,Site Number,Subject Status,Visit Date,Treatment Visit Date,Procedure Date,Death Date\n\
101-001,101,Enrolled,10-01-2024,15-01-2024,15-01-2024,\n\
101-002.0,101,Screen Failure,12-01-2024,,,\n\
,101,Enrolled,,,,\n\
101-001,101,Enrolled,,,,\n";

const AE: &str = "Screening #,Template number,LOGS_AE_AETERM,LOGS_AE_AESTDTC,LOGS_AE_AEOUT\n\
101-001,1,Dyspnea,20-01-2024,Recovered/Resolved\n\
101-001,2,  Heart failure  ,01-02-2024,Not Recovered/Not Resolved\n\
999-999,1,Headache,01-02-2024,Recovered/Resolved\n";

#[test]
fn loads_directory_of_sheets() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "Main.csv", MAIN);
    write(dir.path(), "AE.csv", AE);
    write(dir.path(), "notes.txt", "ignored");

    let session = load_session(dir.path(), &ColumnRegistry::standard()).expect("load");

    assert_eq!(session.records.len(), 2);
    let first = &session.records[0];
    assert_eq!(first.id().subject(), "101-001");
    assert_eq!(first.id().site(), "101");
    assert_eq!(
        first.visit_value(FieldId::VisitDate, Visit::Treatment),
        Some("15-01-2024")
    );
    assert_eq!(first.value(FieldId::ProcedureDate), Some("15-01-2024"));
    assert_eq!(first.ae_rows().len(), 2);
    assert_eq!(first.ae_rows()[1].get(FieldId::AeTerm), Some("Heart failure"));

    let second = &session.records[1];
    assert_eq!(second.id().subject(), "101-002");
    assert!(second.is_screen_failure());
    assert!(second.ae_rows().is_empty());

    assert!(
        session
            .mapping
            .column(SheetKind::AeLog, FieldKey::new(FieldId::AeTerm))
            .is_some()
    );
}

#[test]
fn structural_problems_become_issues() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "Main.csv", MAIN);
    write(dir.path(), "AE.csv", AE);

    let session = load_session(dir.path(), &ColumnRegistry::standard()).expect("load");
    let rules: Vec<RuleId> = session.schema_issues.iter().map(|issue| issue.rule).collect();

    assert!(rules.contains(&RuleId::MissingPatientId));
    assert!(rules.contains(&RuleId::DuplicatePatient));
    assert!(rules.contains(&RuleId::OrphanFormRow));
    assert!(rules.contains(&RuleId::MissingField));
    assert!(!rules.contains(&RuleId::MissingMainSheet));
}

#[test]
fn single_file_is_main_sheet() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("export_2025.csv");
    fs::write(&path, MAIN).expect("write fixture");

    let session = load_session(&path, &ColumnRegistry::standard()).expect("load");
    assert_eq!(session.records.len(), 2);
    assert!(session.mapping.has_sheet(SheetKind::Main));
    assert!(!session.mapping.has_sheet(SheetKind::AeLog));
}

#[test]
fn directory_without_main_is_reported_not_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "AE.csv", AE);

    let session = load_session(dir.path(), &ColumnRegistry::standard()).expect("load");
    assert!(session.records.is_empty());
    assert!(
        session
            .schema_issues
            .iter()
            .any(|issue| issue.rule == RuleId::MissingMainSheet)
    );
}

#[test]
fn sheets_are_read_in_file_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "b_Main.csv", MAIN);
    write(dir.path(), "a_AE.csv", AE);

    let workbook = read_workbook(dir.path()).expect("read");
    assert!(workbook.issues.is_empty());
    let sheets = &workbook.sheets;
    let names: Vec<&str> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    assert_eq!(names, vec!["a_AE", "b_Main"]);
    assert!(sheets[1].labels.is_some());
    assert!(sheets[0].labels.is_none());
}

#[test]
fn unreadable_sheet_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "Main.csv", MAIN);
    write(dir.path(), "AE.csv", AE);
    write(dir.path(), "CM.csv", "");

    let session = load_session(dir.path(), &ColumnRegistry::standard()).expect("load");
    assert_eq!(session.records.len(), 2);
    assert_eq!(session.records[0].ae_rows().len(), 2);

    let unreadable: Vec<_> = session
        .schema_issues
        .iter()
        .filter(|issue| issue.rule == RuleId::UnreadableSheet)
        .collect();
    assert_eq!(unreadable.len(), 1);
    assert_eq!(unreadable[0].severity, IssueSeverity::Warning);
    assert_eq!(unreadable[0].sheet.as_deref(), Some("CM"));
    assert!(
        session
            .schema_issues
            .iter()
            .all(|issue| issue.severity != IssueSeverity::Fatal)
    );
}

#[test]
fn extra_form_sheets_load_without_fatal_issues() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "Main.csv", MAIN);
    write(dir.path(), "CM.csv", "Screening #,LOGS_CM_CMTRT\n101-001,Aspirin\n");

    let session = load_session(dir.path(), &ColumnRegistry::standard()).expect("load");
    assert_eq!(session.records.len(), 2);
    let cm = session
        .schema_issues
        .iter()
        .find(|issue| issue.rule == RuleId::UnrecognizedSheet)
        .expect("CM sheet is reported");
    assert_eq!(cm.severity, IssueSeverity::Warning);
}

#[test]
fn missing_and_empty_inputs_are_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope");
    assert!(matches!(
        load_session(&missing, &ColumnRegistry::standard()),
        Err(IngestError::PathNotFound { .. })
    ));

    assert!(matches!(
        load_session(dir.path(), &ColumnRegistry::standard()),
        Err(IngestError::NoSheets { .. })
    ));

    write(dir.path(), "Main.csv", "\n , \n");
    assert!(matches!(
        load_session(dir.path(), &ColumnRegistry::standard()),
        Err(IngestError::EmptyCsv { .. })
    ));
}
