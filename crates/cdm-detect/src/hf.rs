//! Heart-failure hospitalization detection.
//!
//! History forms (HFH, HMEH, CVH, MH) give pre-treatment episodes; the AE log
//! gives post-treatment ones. Free text passes through the term matcher in
//! boundary mode; a set HFH hospitalization flag qualifies an entry on its
//! own.

use std::collections::BTreeSet;

use cdm_match::{TermMatch, TermMatcher, Vocabulary};
use cdm_model::{
    ConfidenceThresholds, FieldId, FormRow, HfConfig, HfHospitalizationEvent, HfPatientSummary,
    HfSource, MatchKind, PatientRecord, TreatmentPeriod, Visit,
};
use cdm_normalize::{is_blank, parse_date, parse_flag};
use chrono::{Duration, NaiveDate};

use crate::ae::merge_overflow_rows;

/// Days in the one-year summary window.
const ONE_YEAR_DAYS: i64 = 365;

/// One entry of a history field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Entry number (`#2` → `2`); `1` for a plain single value.
    pub entry: String,
    pub date: String,
    pub term: String,
}

/// Split a history value into entries.
///
/// Values may hold several entries in piped form,
/// `#1 / 2024-01-15 / Heart failure | #2 / 03/02/2024 / CHF`. Parts are
/// separated by ` / ` so slashed dates survive; a value without spaced
/// separators falls back to a bare `/`. Anything else is one entry whose
/// date comes from `date_raw`.
pub fn parse_history_entries(term_raw: &str, date_raw: &str) -> Vec<HistoryEntry> {
    let value = term_raw.trim();
    if !value.starts_with('#') {
        if is_blank(value) && is_blank(date_raw) {
            return Vec::new();
        }
        return vec![HistoryEntry {
            entry: "1".to_string(),
            date: date_raw.trim().to_string(),
            term: if is_blank(value) { String::new() } else { value.to_string() },
        }];
    }

    value
        .split('|')
        .filter_map(|chunk| {
            let chunk = chunk.trim();
            let parts: Vec<&str> = if chunk.contains(" / ") {
                chunk.split(" / ").map(str::trim).collect()
            } else {
                chunk.split('/').map(str::trim).collect()
            };
            if parts.len() < 2 {
                return None;
            }
            Some(HistoryEntry {
                entry: parts[0].trim_start_matches('#').trim().to_string(),
                date: parts[1].to_string(),
                term: parts[2..].join(" / "),
            })
        })
        .collect()
}

/// A term or flag hit before windowing.
struct Candidate {
    source: HfSource,
    entry: String,
    text: String,
    hit: Hit,
    admission: Option<NaiveDate>,
    discharge: Option<NaiveDate>,
}

enum Hit {
    Term(TermMatch),
    Flag,
}

/// Detects HF hospitalization episodes for one patient at a time.
#[derive(Debug, Clone, Copy)]
pub struct HfDetector<'a> {
    vocabulary: &'a Vocabulary,
    matcher: &'a TermMatcher,
    config: &'a HfConfig,
    thresholds: ConfidenceThresholds,
}

impl<'a> HfDetector<'a> {
    pub fn new(vocabulary: &'a Vocabulary, matcher: &'a TermMatcher, config: &'a HfConfig) -> Self {
        Self {
            vocabulary,
            matcher,
            config,
            thresholds: ConfidenceThresholds::default(),
        }
    }

    /// Treatment visit date, falling back to the procedure date.
    pub fn treatment_date(&self, record: &PatientRecord) -> Option<NaiveDate> {
        record
            .visit_value(FieldId::VisitDate, Visit::Treatment)
            .and_then(|raw| parse_date(raw).date())
            .or_else(|| {
                record
                    .value(FieldId::ProcedureDate)
                    .and_then(|raw| parse_date(raw).date())
            })
    }

    /// Extract the patient's HF hospitalization events, windowed around
    /// treatment.
    pub fn extract(&self, record: &PatientRecord) -> Vec<HfHospitalizationEvent> {
        let treatment = self.treatment_date(record);
        let mut candidates = self.history_candidates(record);

        let mut seen: BTreeSet<NaiveDate> = candidates
            .iter()
            .filter_map(|candidate| candidate.admission)
            .collect();
        let later = [
            self.main_history(
                record,
                HfSource::HospitalizationHistory,
                FieldId::HmehTerm,
                FieldId::HmehDate,
            ),
            self.cvh_candidates(record),
            self.main_history(record, HfSource::MedicalHistory, FieldId::MhTerm, FieldId::MhDate),
            self.ae_candidates(record),
        ];
        for source in later {
            for candidate in source {
                if let Some(date) = candidate.admission
                    && !seen.insert(date)
                {
                    tracing::debug!(
                        source = candidate.source.code(),
                        entry = %candidate.entry,
                        "duplicate HF event date skipped"
                    );
                    continue;
                }
                candidates.push(candidate);
            }
        }

        let events: Vec<HfHospitalizationEvent> = candidates
            .into_iter()
            .filter_map(|candidate| self.place(record, candidate, treatment))
            .collect();
        tracing::debug!(
            events = events.len(),
            treatment_known = treatment.is_some(),
            "HF hospitalizations extracted"
        );
        events
    }

    /// Per-patient counts of unique event dates around treatment.
    pub fn summarize_patient(
        &self,
        record: &PatientRecord,
        events: &[HfHospitalizationEvent],
    ) -> HfPatientSummary {
        let treatment = self.treatment_date(record);
        let short = self.config.short_window_days;
        let count = |period: TreatmentPeriod, days: i64| -> usize {
            let Some(treatment) = treatment else {
                return 0;
            };
            events
                .iter()
                .filter(|event| event.period == period)
                .filter_map(HfHospitalizationEvent::event_date)
                .filter(|date| match period {
                    TreatmentPeriod::PreTreatment => in_pre_window(*date, treatment, days),
                    TreatmentPeriod::PostTreatment => in_post_window(*date, treatment, days),
                    TreatmentPeriod::Unknown => false,
                })
                .collect::<BTreeSet<_>>()
                .len()
        };

        HfPatientSummary {
            patient: record.id().clone(),
            treatment_date: treatment,
            pre_count_6m: count(TreatmentPeriod::PreTreatment, short),
            pre_count_1y: count(TreatmentPeriod::PreTreatment, ONE_YEAR_DAYS),
            post_count_6m: count(TreatmentPeriod::PostTreatment, short),
            post_count_1y: count(TreatmentPeriod::PostTreatment, ONE_YEAR_DAYS),
            undated: events.iter().filter(|event| event.admission.is_none()).count(),
        }
    }

    fn classify(&self, text: &str) -> Option<TermMatch> {
        if is_blank(text) {
            return None;
        }
        self.matcher.classify(text, self.vocabulary, true)
    }

    fn history_candidates(&self, record: &PatientRecord) -> Vec<Candidate> {
        let flagged = record
            .value(FieldId::HfhHospitalized)
            .and_then(|raw| parse_flag(raw).value())
            .unwrap_or(false);
        let term_raw = record.value(FieldId::HfhTerm).unwrap_or_default();
        let date_raw = record.value(FieldId::HfhDate).unwrap_or_default();

        parse_history_entries(term_raw, date_raw)
            .into_iter()
            .filter_map(|entry| {
                let hit = match self.classify(&entry.term) {
                    Some(found) => Hit::Term(found),
                    None if flagged => Hit::Flag,
                    None => return None,
                };
                Some(Candidate {
                    source: HfSource::HeartFailureHistory,
                    admission: parse_date(&entry.date).date(),
                    discharge: None,
                    entry: entry.entry,
                    text: entry.term,
                    hit,
                })
            })
            .collect()
    }

    fn main_history(
        &self,
        record: &PatientRecord,
        source: HfSource,
        term_field: FieldId,
        date_field: FieldId,
    ) -> Vec<Candidate> {
        let term_raw = record.value(term_field).unwrap_or_default();
        let date_raw = record.value(date_field).unwrap_or_default();
        parse_history_entries(term_raw, date_raw)
            .into_iter()
            .filter_map(|entry| {
                let found = self.classify(&entry.term)?;
                Some(Candidate {
                    source,
                    admission: parse_date(&entry.date).date(),
                    discharge: None,
                    entry: entry.entry,
                    text: entry.term,
                    hit: Hit::Term(found),
                })
            })
            .collect()
    }

    fn cvh_candidates(&self, record: &PatientRecord) -> Vec<Candidate> {
        record
            .cvh_rows()
            .iter()
            .filter_map(|row| {
                let text = row.raw(FieldId::CvhTerm).trim();
                let found = self.classify(text)?;
                Some(Candidate {
                    source: HfSource::CardiovascularHistory,
                    entry: row_entry(row),
                    text: text.to_string(),
                    hit: Hit::Term(found),
                    admission: parse_date(row.raw(FieldId::CvhDate)).date(),
                    discharge: None,
                })
            })
            .collect()
    }

    fn ae_candidates(&self, record: &PatientRecord) -> Vec<Candidate> {
        merge_overflow_rows(record.ae_rows())
            .into_iter()
            .filter_map(|row| {
                let text = row.raw(FieldId::AeTerm).trim();
                let found = self.classify(text)?;
                let admission = parse_date(row.raw(FieldId::AeHospitalAdmission))
                    .date()
                    .or_else(|| parse_date(row.raw(FieldId::AeOnsetDate)).date());
                Some(Candidate {
                    source: HfSource::AdverseEvent,
                    entry: row_entry(row),
                    text: text.to_string(),
                    hit: Hit::Term(found),
                    admission,
                    discharge: parse_date(row.raw(FieldId::AeHospitalDischarge)).date(),
                })
            })
            .collect()
    }

    /// Assign a treatment period, dropping dated events outside the window.
    fn place(
        &self,
        record: &PatientRecord,
        candidate: Candidate,
        treatment: Option<NaiveDate>,
    ) -> Option<HfHospitalizationEvent> {
        let post_source = candidate.source == HfSource::AdverseEvent;
        let period = match (treatment, candidate.admission) {
            (None, _) => TreatmentPeriod::Unknown,
            (Some(_), None) if post_source => TreatmentPeriod::PostTreatment,
            (Some(_), None) => TreatmentPeriod::PreTreatment,
            (Some(treatment), Some(date)) => {
                let kept = if post_source {
                    in_post_window(date, treatment, self.config.post_treatment_days)
                } else {
                    in_pre_window(date, treatment, self.config.pre_treatment_days)
                };
                if !kept {
                    tracing::debug!(
                        source = candidate.source.code(),
                        entry = %candidate.entry,
                        "HF event outside treatment window"
                    );
                    return None;
                }
                if post_source {
                    TreatmentPeriod::PostTreatment
                } else {
                    TreatmentPeriod::PreTreatment
                }
            }
        };

        let (matched_term, category, match_kind, confidence) = match candidate.hit {
            Hit::Term(found) => (Some(found.term), found.category, found.kind, found.confidence),
            Hit::Flag => (None, None, MatchKind::StructuredFlag, 1.0),
        };
        Some(HfHospitalizationEvent {
            event_id: format!(
                "{}_{}_{}",
                candidate.source.code(),
                record.id().subject(),
                candidate.entry
            ),
            patient: record.id().clone(),
            source: candidate.source,
            period,
            matched_term,
            category,
            match_kind,
            confidence,
            confidence_level: self.thresholds.categorize(confidence),
            original_text: candidate.text,
            admission: candidate.admission,
            discharge: candidate.discharge,
        })
    }
}

fn row_entry(row: &FormRow) -> String {
    row.sequence
        .clone()
        .unwrap_or_else(|| format!("r{}", row.source_row + 1))
}

/// Within `days` before treatment, treatment day inclusive.
pub fn in_pre_window(date: NaiveDate, treatment: NaiveDate, days: i64) -> bool {
    let start = Duration::try_days(days)
        .and_then(|span| treatment.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN);
    date <= treatment && date >= start
}

/// After treatment day and within `days` of it.
pub fn in_post_window(date: NaiveDate, treatment: NaiveDate, days: i64) -> bool {
    let end = Duration::try_days(days)
        .and_then(|span| treatment.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX);
    date > treatment && date <= end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn piped_entries_keep_slashed_dates() {
        let entries = parse_history_entries(
            "#1 / 2024-01-15 / Heart failure | #2 / 03/02/2024 / CHF / readmission",
            "",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry, "1");
        assert_eq!(entries[0].date, "2024-01-15");
        assert_eq!(entries[1].date, "03/02/2024");
        assert_eq!(entries[1].term, "CHF / readmission");
    }

    #[test]
    fn unspaced_pipes_fall_back_to_slash() {
        let entries = parse_history_entries("#3/2024-01-15/Edema", "");
        assert_eq!(entries[0].entry, "3");
        assert_eq!(entries[0].term, "Edema");
    }

    #[test]
    fn plain_value_uses_date_field() {
        let entries = parse_history_entries("Heart failure", "15-01-2024");
        assert_eq!(
            entries,
            vec![HistoryEntry {
                entry: "1".to_string(),
                date: "15-01-2024".to_string(),
                term: "Heart failure".to_string(),
            }]
        );
        assert!(parse_history_entries("", " ").is_empty());
    }

    #[test]
    fn window_edges() {
        let t = day(2024, 6, 1);
        assert!(in_pre_window(t, t, 365));
        assert!(!in_post_window(t, t, 1825));
        assert!(in_pre_window(t - Duration::days(365), t, 365));
        assert!(!in_pre_window(t - Duration::days(366), t, 365));
        assert!(in_post_window(t + Duration::days(1), t, 1825));
        assert!(!in_post_window(t + Duration::days(1826), t, 1825));
    }

    #[test]
    fn oversized_windows_are_unbounded() {
        let t = day(2024, 6, 1);
        assert!(in_pre_window(day(1900, 1, 1), t, i64::MAX));
        assert!(in_post_window(day(2999, 1, 1), t, i64::MAX));
        assert!(in_post_window(day(2999, 1, 1), t, 100_000_000));
    }
}
