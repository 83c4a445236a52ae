//! Patient records loaded from the main and repeating-form sheets.

use std::collections::BTreeMap;

use crate::field::{FieldId, FieldKey};
use crate::ids::{PatientId, SdvKey};
use crate::visit::Visit;

/// Repeating forms stored as separate sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatingForm {
    AdverseEvent,
    CardiovascularHistory,
}

/// One row of a repeating-form sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormRow {
    /// Zero-based data row index within the source sheet.
    pub source_row: usize,
    /// Form sequence (AE number), when the sheet carries one.
    pub sequence: Option<String>,
    values: BTreeMap<FieldId, String>,
}

impl FormRow {
    pub fn new(source_row: usize, sequence: Option<String>) -> Self {
        Self {
            source_row,
            sequence,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, field: FieldId, raw: impl Into<String>) -> Self {
        self.values.insert(field, raw.into());
        self
    }

    pub fn insert(&mut self, field: FieldId, raw: impl Into<String>) {
        self.values.insert(field, raw.into());
    }

    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Raw value, or the empty string when the field is absent.
    pub fn raw(&self, field: FieldId) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Count of non-blank values, used to pick among overflow rows.
    pub fn populated_count(&self) -> usize {
        self.values
            .values()
            .filter(|value| !value.trim().is_empty())
            .count()
    }
}

/// A patient's loaded data. Immutable once built.
#[derive(Debug, Clone)]
pub struct PatientRecord {
    id: PatientId,
    source_row: usize,
    values: BTreeMap<FieldKey, String>,
    ae_rows: Vec<FormRow>,
    cvh_rows: Vec<FormRow>,
}

impl PatientRecord {
    pub fn builder(id: PatientId) -> PatientRecordBuilder {
        PatientRecordBuilder {
            record: PatientRecord {
                id,
                source_row: 0,
                values: BTreeMap::new(),
                ae_rows: Vec::new(),
                cvh_rows: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    /// Zero-based data row on the main sheet.
    pub fn source_row(&self) -> usize {
        self.source_row
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Value of a field that is not visit-qualified.
    pub fn value(&self, field: FieldId) -> Option<&str> {
        self.get(FieldKey::new(field))
    }

    pub fn visit_value(&self, field: FieldId, visit: Visit) -> Option<&str> {
        self.get(FieldKey::at(field, visit))
    }

    pub fn values(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn form_rows(&self, form: RepeatingForm) -> &[FormRow] {
        match form {
            RepeatingForm::AdverseEvent => &self.ae_rows,
            RepeatingForm::CardiovascularHistory => &self.cvh_rows,
        }
    }

    pub fn ae_rows(&self) -> &[FormRow] {
        &self.ae_rows
    }

    pub fn cvh_rows(&self) -> &[FormRow] {
        &self.cvh_rows
    }

    pub fn status(&self) -> &str {
        self.value(FieldId::Status).unwrap_or("").trim()
    }

    /// Screen failures carry a status mentioning both "screen" and "fail".
    pub fn is_screen_failure(&self) -> bool {
        let status = self.status().to_lowercase();
        status.contains("screen") && status.contains("fail")
    }

    pub fn sdv_key(&self, visit: Visit, form: &str) -> SdvKey {
        SdvKey::new(&self.id, visit, form)
    }
}

/// Builder used by the loader; the record is frozen by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PatientRecordBuilder {
    record: PatientRecord,
}

impl PatientRecordBuilder {
    #[must_use]
    pub fn source_row(mut self, row: usize) -> Self {
        self.record.source_row = row;
        self
    }

    #[must_use]
    pub fn value(mut self, field: FieldId, raw: impl Into<String>) -> Self {
        self.record.values.insert(FieldKey::new(field), raw.into());
        self
    }

    #[must_use]
    pub fn visit_value(mut self, field: FieldId, visit: Visit, raw: impl Into<String>) -> Self {
        self.record
            .values
            .insert(FieldKey::at(field, visit), raw.into());
        self
    }

    pub fn insert(&mut self, key: FieldKey, raw: impl Into<String>) {
        self.record.values.insert(key, raw.into());
    }

    pub fn push_row(&mut self, form: RepeatingForm, row: FormRow) {
        match form {
            RepeatingForm::AdverseEvent => self.record.ae_rows.push(row),
            RepeatingForm::CardiovascularHistory => self.record.cvh_rows.push(row),
        }
    }

    #[must_use]
    pub fn row(mut self, form: RepeatingForm, row: FormRow) -> Self {
        self.push_row(form, row);
        self
    }

    pub fn build(self) -> PatientRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_failure_requires_both_words() {
        let failed = PatientRecord::builder(PatientId::new(None, "101-001"))
            .value(FieldId::Status, "Screen Failure")
            .build();
        let screening = PatientRecord::builder(PatientId::new(None, "101-002"))
            .value(FieldId::Status, "Screening")
            .build();
        assert!(failed.is_screen_failure());
        assert!(!screening.is_screen_failure());
    }

    #[test]
    fn populated_count_skips_blank_cells() {
        let row = FormRow::new(0, Some("1".to_string()))
            .with_value(FieldId::AeTerm, "Dyspnea")
            .with_value(FieldId::AeEndDate, "  ");
        assert_eq!(row.populated_count(), 1);
        assert_eq!(row.raw(FieldId::AeOutcome), "");
    }
}
