//! Adverse event extraction.

use std::collections::HashMap;

use cdm_model::{
    AdverseEvent, AeOutcome, DateValue, DeviceRelatedness, FieldId, FormRow, NormalizedDate,
    ParseOutcome, PatientRecord, SeriousnessCriteria, Visit,
};
use cdm_normalize::{is_blank, is_checked, parse_date, parse_flag, parse_outcome, parse_relatedness};
use chrono::NaiveDate;

/// True iff the onset is known to fall strictly before the procedure.
///
/// Unknown onsets are never pre-procedure. A partial onset counts only when
/// its whole period precedes the procedure, an ambiguous one only when
/// every candidate does.
pub fn is_pre_procedure(onset: &NormalizedDate, procedure: Option<NaiveDate>) -> bool {
    let Some(procedure) = procedure else {
        return false;
    };
    let before = |value: &DateValue| value.latest().is_some_and(|latest| latest < procedure);
    match &onset.outcome {
        ParseOutcome::Parsed(value) => before(value),
        ParseOutcome::Ambiguous(candidates) => {
            !candidates.is_empty() && candidates.iter().all(before)
        }
        ParseOutcome::Empty | ParseOutcome::Failed(_) => false,
    }
}

/// An event is ongoing iff its outcome is not terminal and it has no end date.
pub fn is_ongoing(outcome: &AeOutcome, end: &NormalizedDate) -> bool {
    !outcome.is_terminal() && end.is_empty()
}

/// Procedure date used for AE timing: the implant procedure date, falling
/// back to the treatment visit date.
pub fn procedure_date(record: &PatientRecord) -> Option<NaiveDate> {
    record
        .value(FieldId::ProcedureDate)
        .and_then(|raw| parse_date(raw).date())
        .or_else(|| {
            record
                .visit_value(FieldId::VisitDate, Visit::Treatment)
                .and_then(|raw| parse_date(raw).date())
        })
}

/// Derives adverse events from a patient's AE log rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeDetector;

impl AeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Extract the patient's adverse events.
    ///
    /// Overflow rows sharing an AE number are merged first; rows left
    /// without a term are dropped.
    pub fn extract(
        &self,
        record: &PatientRecord,
        procedure_date: Option<NaiveDate>,
    ) -> Vec<AdverseEvent> {
        let rows = merge_overflow_rows(record.ae_rows());
        let events: Vec<AdverseEvent> = rows
            .into_iter()
            .filter(|row| !is_blank(row.raw(FieldId::AeTerm)))
            .map(|row| build_event(record, row, procedure_date))
            .collect();
        tracing::debug!(
            rows = record.ae_rows().len(),
            events = events.len(),
            "adverse events extracted"
        );
        events
    }
}

/// One row per AE number: a row with a term wins, then the most populated.
/// Rows without an AE number are kept as they are.
pub fn merge_overflow_rows(rows: &[FormRow]) -> Vec<&FormRow> {
    let mut merged: Vec<&FormRow> = Vec::new();
    let mut by_sequence: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let Some(sequence) = row.sequence.as_deref() else {
            merged.push(row);
            continue;
        };
        match by_sequence.get(sequence) {
            Some(&idx) => {
                if row_rank(row) > row_rank(merged[idx]) {
                    merged[idx] = row;
                }
            }
            None => {
                by_sequence.insert(sequence, merged.len());
                merged.push(row);
            }
        }
    }
    merged
}

fn row_rank(row: &FormRow) -> (bool, usize) {
    (!is_blank(row.raw(FieldId::AeTerm)), row.populated_count())
}

fn optional_text(row: &FormRow, field: FieldId) -> Option<String> {
    let raw = row.raw(field);
    (!is_blank(raw)).then(|| raw.trim().to_string())
}

fn build_event(
    record: &PatientRecord,
    row: &FormRow,
    procedure_date: Option<NaiveDate>,
) -> AdverseEvent {
    let onset = parse_date(row.raw(FieldId::AeOnsetDate));
    let end = parse_date(row.raw(FieldId::AeEndDate));
    let outcome = parse_outcome(row.raw(FieldId::AeOutcome));
    let device = DeviceRelatedness {
        implant: parse_relatedness(row.raw(FieldId::AeRelatedImplant)),
        delivery_system: parse_relatedness(row.raw(FieldId::AeRelatedDelivery)),
        handle: parse_relatedness(row.raw(FieldId::AeRelatedHandle)),
    };
    let procedure = parse_relatedness(row.raw(FieldId::AeRelatedProcedure));
    let criteria = SeriousnessCriteria {
        death: is_checked(row.raw(FieldId::AeDeathCriterion)),
        hospitalization: is_checked(row.raw(FieldId::AeHospitalizationCriterion)),
        life_threatening: is_checked(row.raw(FieldId::AeLifeThreateningCriterion)),
        disability: is_checked(row.raw(FieldId::AeDisabilityCriterion)),
        medically_important: is_checked(row.raw(FieldId::AeMedicallyImportantCriterion)),
    };

    AdverseEvent {
        patient: record.id().clone(),
        sequence: row.sequence.clone(),
        term: row.raw(FieldId::AeTerm).trim().to_string(),
        pre_procedure: is_pre_procedure(&onset, procedure_date),
        ongoing: is_ongoing(&outcome, &end),
        onset,
        end,
        outcome,
        severity: optional_text(row, FieldId::AeSeverity),
        interval: optional_text(row, FieldId::AeInterval),
        serious: is_checked(row.raw(FieldId::AeSerious)),
        criteria,
        device_related: device.any_related(),
        procedure_related: procedure.is_related(),
        device,
        procedure,
        ongoing_marked: parse_flag(row.raw(FieldId::AeOngoing)).value(),
        hospital_admission: parse_date(row.raw(FieldId::AeHospitalAdmission)),
        hospital_discharge: parse_date(row.raw(FieldId::AeHospitalDischarge)),
        report_date: parse_date(row.raw(FieldId::AeReportDate)),
        source_row: row.source_row,
    }
}
