//! Session building: sheets → validated mapping → patient records.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use cdm_model::ids::normalize_subject;
use cdm_model::{
    FieldId, FieldKey, FieldRef, FormRow, PatientId, PatientRecord, PatientRecordBuilder,
    RepeatingForm, RuleId, Session, SheetKind, ValidationIssue,
};
use cdm_registry::{ColumnRegistry, SchemaValidator, SheetValidation};

use crate::discovery::{list_csv_files, sheet_name};
use crate::error::{IngestError, Result};
use crate::sheet::{SheetTable, read_sheet};

/// Sheet name used when a single CSV file is loaded.
pub const SINGLE_FILE_SHEET: &str = "Main";

/// Sheets read from an export, with the files that could not be read.
#[derive(Debug, Default)]
pub struct Workbook {
    pub sheets: Vec<SheetTable>,
    /// One structural issue per sheet file that failed to read.
    pub issues: Vec<ValidationIssue>,
}

/// Read every sheet export under `path`.
///
/// A directory yields one sheet per CSV file, named by file stem and read in
/// file-name order. A sheet that fails to read is reported and skipped; the
/// load fails only when no sheet can be read. A single file is read as the
/// Main sheet.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    if path.is_dir() {
        let files = list_csv_files(path)?;
        let mut workbook = Workbook::default();
        let mut first_error = None;
        for file in &files {
            let name = sheet_name(file);
            match read_sheet(file, &name) {
                Ok(sheet) => workbook.sheets.push(sheet),
                Err(error) => {
                    tracing::warn!(sheet = %name, error = %error, "sheet could not be read");
                    workbook.issues.push(
                        ValidationIssue::warning(
                            RuleId::UnreadableSheet,
                            format!("sheet '{name}' could not be read and was skipped: {error}"),
                        )
                        .on_sheet(&name),
                    );
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        if workbook.sheets.is_empty() {
            return Err(first_error.unwrap_or_else(|| IngestError::NoSheets {
                path: path.to_path_buf(),
            }));
        }
        Ok(workbook)
    } else if path.is_file() {
        Ok(Workbook {
            sheets: vec![read_sheet(path, SINGLE_FILE_SHEET)?],
            issues: Vec::new(),
        })
    } else {
        Err(IngestError::PathNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Load a workbook export into a new session.
pub fn load_session(path: &Path, registry: &ColumnRegistry) -> Result<Session> {
    let workbook = read_workbook(path)?;
    let mut session = build_session(&path.display().to_string(), &workbook.sheets, registry);
    let mut issues = workbook.issues;
    issues.append(&mut session.schema_issues);
    session.schema_issues = issues;
    tracing::info!(
        source = %session.source,
        sheets = workbook.sheets.len(),
        patients = session.records.len(),
        schema_issues = session.schema_issues.len(),
        "session loaded"
    );
    Ok(session)
}

/// Build a session from sheets already in memory.
///
/// Structural problems never fail the load; they become schema issues and
/// the affected sheet or row is skipped.
pub fn build_session(source: &str, sheets: &[SheetTable], registry: &ColumnRegistry) -> Session {
    let headers: Vec<(&str, Vec<&str>)> = sheets
        .iter()
        .map(|sheet| {
            (
                sheet.name.as_str(),
                sheet.headers.iter().map(String::as_str).collect(),
            )
        })
        .collect();
    let workbook = SchemaValidator::new(registry).validate_workbook(&headers);
    let mut issues = workbook.issues;

    let mut patients = PatientTable::default();
    if let Some((table, validation)) = usable_sheet(sheets, &workbook.sheets, SheetKind::Main) {
        load_main(table, validation, &mut patients, &mut issues);
    }
    for (kind, form) in [
        (SheetKind::AeLog, RepeatingForm::AdverseEvent),
        (SheetKind::CvhLog, RepeatingForm::CardiovascularHistory),
    ] {
        if let Some((table, validation)) = usable_sheet(sheets, &workbook.sheets, kind) {
            load_repeating(table, validation, form, &mut patients, &mut issues);
        }
    }

    Session {
        source: source.to_string(),
        records: patients.finish(),
        mapping: workbook.mapping,
        schema_issues: issues,
    }
}

fn usable_sheet<'a>(
    tables: &'a [SheetTable],
    validations: &'a [SheetValidation],
    kind: SheetKind,
) -> Option<(&'a SheetTable, &'a SheetValidation)> {
    // validate_workbook keeps sheet order, so positions line up.
    tables
        .iter()
        .zip(validations)
        .find(|(_, validation)| validation.kind == Some(kind))
}

/// Builders in main-sheet order, indexed by subject.
#[derive(Default)]
struct PatientTable {
    builders: Vec<PatientRecordBuilder>,
    index: HashMap<String, usize>,
}

impl PatientTable {
    fn get_mut(&mut self, subject: &str) -> Option<&mut PatientRecordBuilder> {
        let idx = *self.index.get(subject)?;
        self.builders.get_mut(idx)
    }

    fn finish(self) -> Vec<PatientRecord> {
        self.builders
            .into_iter()
            .map(PatientRecordBuilder::build)
            .collect()
    }
}

/// Column positions of every resolved field on a sheet.
fn column_positions(table: &SheetTable, validation: &SheetValidation) -> Vec<(FieldKey, usize)> {
    validation
        .resolved_columns()
        .into_iter()
        .filter_map(|(key, column)| table.column_index(&column).map(|idx| (key, idx)))
        .collect()
}

fn position_of(positions: &[(FieldKey, usize)], field: FieldId) -> Option<usize> {
    positions
        .iter()
        .find(|(key, _)| key.field == field && key.visit.is_none())
        .map(|(_, idx)| *idx)
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map_or("", String::as_str)
}

fn load_main(
    table: &SheetTable,
    validation: &SheetValidation,
    patients: &mut PatientTable,
    issues: &mut Vec<ValidationIssue>,
) {
    let positions = column_positions(table, validation);
    let subject_idx = position_of(&positions, FieldId::ScreeningNumber);
    let site_idx = position_of(&positions, FieldId::SiteNumber);

    for (row_idx, row) in table.rows.iter().enumerate() {
        let subject = normalize_subject(cell(row, subject_idx));
        if subject.is_empty() {
            issues.push(
                ValidationIssue::warning(
                    RuleId::MissingPatientId,
                    format!("row {} has no screening number and was skipped", row_idx + 1),
                )
                .on_sheet(&table.name)
                .with_field(FieldId::ScreeningNumber),
            );
            continue;
        }
        if patients.index.contains_key(&subject) {
            tracing::warn!(sheet = %table.name, row = row_idx + 1, "duplicate patient row skipped");
            issues.push(
                ValidationIssue::warning(
                    RuleId::DuplicatePatient,
                    format!(
                        "row {} repeats a screening number already loaded; the first row is used",
                        row_idx + 1
                    ),
                )
                .on_sheet(&table.name)
                .with_field(FieldRef::from(FieldId::ScreeningNumber).with_value(subject.clone())),
            );
            continue;
        }

        let site = cell(row, site_idx);
        let id = PatientId::new(Some(site), &subject);
        let mut builder = PatientRecord::builder(id).source_row(row_idx);
        for (key, idx) in &positions {
            let value = cell(row, Some(*idx));
            if !value.is_empty() {
                builder.insert(*key, value);
            }
        }
        patients.index.insert(subject, patients.builders.len());
        patients.builders.push(builder);
    }
    tracing::debug!(sheet = %table.name, patients = patients.builders.len(), "main sheet loaded");
}

fn load_repeating(
    table: &SheetTable,
    validation: &SheetValidation,
    form: RepeatingForm,
    patients: &mut PatientTable,
    issues: &mut Vec<ValidationIssue>,
) {
    let positions = column_positions(table, validation);
    let subject_idx = position_of(&positions, FieldId::ScreeningNumber);
    let sequence_idx = position_of(&positions, FieldId::TemplateNumber);

    let mut loaded = 0usize;
    let mut orphans: BTreeMap<String, usize> = BTreeMap::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let subject = normalize_subject(cell(row, subject_idx));
        let Some(builder) = patients.get_mut(&subject) else {
            *orphans.entry(subject).or_default() += 1;
            continue;
        };
        let sequence = Some(normalize_subject(cell(row, sequence_idx))).filter(|s| !s.is_empty());
        let mut form_row = FormRow::new(row_idx, sequence);
        for (key, idx) in &positions {
            let value = cell(row, Some(*idx));
            if !value.is_empty() {
                form_row.insert(key.field, value);
            }
        }
        builder.push_row(form, form_row);
        loaded += 1;
    }

    for (subject, rows) in orphans {
        let message = if subject.is_empty() {
            format!("{rows} row(s) have no screening number")
        } else {
            format!("{rows} row(s) belong to a patient not on the Main sheet")
        };
        issues.push(
            ValidationIssue::warning(RuleId::OrphanFormRow, message)
                .on_sheet(&table.name)
                .with_field(FieldRef::from(FieldId::ScreeningNumber).with_value(subject)),
        );
    }
    tracing::debug!(sheet = %table.name, rows = loaded, "repeating sheet loaded");
}
