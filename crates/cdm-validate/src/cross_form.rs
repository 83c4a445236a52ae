//! Consistency rules that span forms.
//!
//! Every rule runs on every patient and never short-circuits another rule.

use chrono::{Duration, Local, NaiveDate};

use cdm_detect::{AeDetector, procedure_date};
use cdm_model::{
    AdverseEvent, FieldId, FieldKey, FieldRef, NormalizedDate, ParseOutcome, PatientRecord,
    RuleId, ValidationConfig, ValidationIssue, ValidationReport, Visit,
};
use cdm_normalize::{is_blank, normalize_text, parse_date};

/// Runs the cross-form rules over a whole dataset.
#[derive(Debug, Clone)]
pub struct CrossFormValidator<'a> {
    config: &'a ValidationConfig,
    detector: AeDetector,
}

/// What every rule needs to know about one patient.
struct PatientContext<'r> {
    record: &'r PatientRecord,
    events: Vec<AdverseEvent>,
    procedure: Option<NaiveDate>,
    enrollment: Option<NaiveDate>,
    future_limit: NaiveDate,
}

type Rule = fn(&PatientContext<'_>, &mut Vec<ValidationIssue>);

const RULES: &[(RuleId, Rule)] = &[
    (RuleId::FatalAeWithoutDeath, fatal_ae_without_death),
    (RuleId::FollowUpBeforeProcedure, follow_up_before_procedure),
    (RuleId::AeOnsetOutsideStudyWindow, onset_outside_study_window),
    (RuleId::AeOnsetBeforeProcedureNotMarked, pre_procedure_not_marked),
    (RuleId::AeEndBeforeOnset, end_before_onset),
    (RuleId::DeathBeforeAeOnset, death_before_onset),
    (RuleId::AmbiguousOnsetClassification, ambiguous_onset_classification),
    (RuleId::UnparseableDate, unparseable_dates),
    (RuleId::OngoingWithEndDate, ongoing_with_end_date),
];

impl<'a> CrossFormValidator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self {
            config,
            detector: AeDetector::new(),
        }
    }

    /// Reference date for "in the future": the configured as-of date, or today.
    pub fn as_of(&self) -> NaiveDate {
        self.config
            .as_of
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn validate(&self, records: &[PatientRecord]) -> ValidationReport {
        let as_of = self.as_of();
        let future_limit = Duration::try_days(self.config.future_tolerance_days)
            .and_then(|tolerance| as_of.checked_add_signed(tolerance))
            .unwrap_or(NaiveDate::MAX);
        let mut issues = Vec::new();
        for record in records {
            let procedure = procedure_date(record);
            let context = PatientContext {
                record,
                events: self.detector.extract(record, procedure),
                procedure,
                enrollment: enrollment_date(record),
                future_limit,
            };
            for (rule, check) in RULES {
                let before = issues.len();
                check(&context, &mut issues);
                if issues.len() > before {
                    tracing::debug!(
                        rule = %rule,
                        found = issues.len() - before,
                        "cross-form rule fired"
                    );
                }
            }
        }

        let report = ValidationReport::new(issues);
        tracing::info!(
            patients = records.len(),
            fatal = report.fatal_count(),
            warnings = report.warning_count(),
            info = report.info_count(),
            "cross-form validation complete"
        );
        report
    }
}

/// Consent date, falling back to the screening visit date.
pub fn enrollment_date(record: &PatientRecord) -> Option<NaiveDate> {
    record
        .value(FieldId::ConsentDate)
        .and_then(|raw| parse_date(raw).date())
        .or_else(|| {
            record
                .visit_value(FieldId::VisitDate, Visit::Screening)
                .and_then(|raw| parse_date(raw).date())
        })
}

/// An interval answer that places the event before the procedure.
pub fn marks_pre_procedure(interval: Option<&str>) -> bool {
    let Some(interval) = interval else {
        return false;
    };
    let text = normalize_text(interval);
    text.starts_with("pre")
        || text.contains(" pre")
        || text.contains("before")
        || text.contains("prior")
}

fn event_label(event: &AdverseEvent) -> String {
    match &event.sequence {
        Some(sequence) => format!("AE #{sequence} ({})", event.term),
        None => format!("AE ({})", event.term),
    }
}

fn date_ref(field: FieldId, date: &NormalizedDate) -> FieldRef {
    FieldRef::from(field).with_value(date.raw.clone())
}

// ============================================================================
// (a) Fatal AE without death form
// ============================================================================

fn fatal_ae_without_death(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let death_recorded = ctx
        .record
        .value(FieldId::DeathDate)
        .is_some_and(|raw| !is_blank(raw));
    if death_recorded {
        return;
    }
    for event in ctx.events.iter().filter(|event| event.is_fatal()) {
        issues.push(
            ValidationIssue::fatal(
                RuleId::FatalAeWithoutDeath,
                format!(
                    "{} has a fatal outcome but no death form entry",
                    event_label(event)
                ),
            )
            .for_patient(ctx.record.id())
            .with_field(FieldRef::from(FieldId::AeOutcome).with_value(event.outcome.label()))
            .with_field(FieldId::DeathDate),
        );
    }
}

// ============================================================================
// (b) Follow-up visit before procedure
// ============================================================================

fn follow_up_before_procedure(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let Some(procedure) = ctx.procedure else {
        return;
    };
    for visit in Visit::SCHEDULED.into_iter().filter(|visit| visit.is_follow_up()) {
        let Some(raw) = ctx.record.visit_value(FieldId::VisitDate, visit) else {
            continue;
        };
        if let Some(date) = parse_date(raw).date()
            && date < procedure
        {
            issues.push(
                ValidationIssue::fatal(
                    RuleId::FollowUpBeforeProcedure,
                    format!(
                        "{} date {date} is before the procedure date {procedure}",
                        visit.label()
                    ),
                )
                .for_patient(ctx.record.id())
                .with_field(
                    FieldRef::new(FieldKey::at(FieldId::VisitDate, visit)).with_value(raw),
                )
                .with_field(FieldId::ProcedureDate),
            );
        }
    }
}

// ============================================================================
// (c) AE onset outside the study window
// ============================================================================

fn onset_outside_study_window(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    for event in &ctx.events {
        let candidates = event.onset.candidates();
        if candidates.is_empty() {
            continue;
        }
        let before_enrollment = ctx.enrollment.is_some_and(|enrollment| {
            candidates
                .iter()
                .all(|value| value.latest().is_some_and(|latest| latest < enrollment))
        });
        let in_future = candidates.iter().all(|value| {
            value
                .earliest()
                .is_some_and(|earliest| earliest > ctx.future_limit)
        });
        let problem = if before_enrollment {
            "is before enrollment"
        } else if in_future {
            "is implausibly far in the future"
        } else {
            continue;
        };
        issues.push(
            ValidationIssue::warning(
                RuleId::AeOnsetOutsideStudyWindow,
                format!("{} onset {problem}", event_label(event)),
            )
            .for_patient(ctx.record.id())
            .with_field(date_ref(FieldId::AeOnsetDate, &event.onset)),
        );
    }
}

// ============================================================================
// (d) Pre-procedure onset with interval not marked
// ============================================================================

fn pre_procedure_not_marked(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    for event in ctx.events.iter().filter(|event| event.pre_procedure) {
        if marks_pre_procedure(event.interval.as_deref()) {
            continue;
        }
        let mut field = FieldRef::from(FieldId::AeInterval);
        if let Some(interval) = &event.interval {
            field = field.with_value(interval.clone());
        }
        issues.push(
            ValidationIssue::warning(
                RuleId::AeOnsetBeforeProcedureNotMarked,
                format!(
                    "{} starts before the procedure but its interval is not pre-procedure",
                    event_label(event)
                ),
            )
            .for_patient(ctx.record.id())
            .with_field(date_ref(FieldId::AeOnsetDate, &event.onset))
            .with_field(field),
        );
    }
}

// ============================================================================
// (e) AE end before onset
// ============================================================================

fn end_before_onset(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    for event in &ctx.events {
        let (Some(onset), Some(end)) = (event.onset.parsed(), event.end.parsed()) else {
            continue;
        };
        let certain = matches!(
            (end.latest(), onset.earliest()),
            (Some(end), Some(onset)) if end < onset
        );
        if certain {
            issues.push(
                ValidationIssue::warning(
                    RuleId::AeEndBeforeOnset,
                    format!("{} ends before it starts", event_label(event)),
                )
                .for_patient(ctx.record.id())
                .with_field(date_ref(FieldId::AeOnsetDate, &event.onset))
                .with_field(date_ref(FieldId::AeEndDate, &event.end)),
            );
        }
    }
}

// ============================================================================
// (f) Death before latest AE onset
// ============================================================================

fn death_before_onset(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let Some(raw) = ctx.record.value(FieldId::DeathDate) else {
        return;
    };
    let Some(death) = parse_date(raw).date() else {
        return;
    };
    let latest = ctx
        .events
        .iter()
        .filter_map(|event| {
            let onset = event.onset.parsed()?.earliest()?;
            Some((onset, event))
        })
        .max_by_key(|(date, _)| *date);
    if let Some((onset, event)) = latest
        && onset > death
    {
        issues.push(
            ValidationIssue::warning(
                RuleId::DeathBeforeAeOnset,
                format!(
                    "death date {death} is before the onset of {} on {onset}",
                    event_label(event)
                ),
            )
            .for_patient(ctx.record.id())
            .with_field(FieldRef::from(FieldId::DeathDate).with_value(raw))
            .with_field(date_ref(FieldId::AeOnsetDate, &event.onset)),
        );
    }
}

// ============================================================================
// (g) Ambiguous onset with disagreeing classification
// ============================================================================

fn ambiguous_onset_classification(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let Some(procedure) = ctx.procedure else {
        return;
    };
    for event in &ctx.events {
        let ParseOutcome::Ambiguous(candidates) = &event.onset.outcome else {
            continue;
        };
        let before = candidates
            .iter()
            .filter(|value| value.latest().is_some_and(|latest| latest < procedure))
            .count();
        if before > 0 && before < candidates.len() {
            issues.push(
                ValidationIssue::warning(
                    RuleId::AmbiguousOnsetClassification,
                    format!(
                        "{} onset '{}' reads as both before and after the procedure",
                        event_label(event),
                        event.onset.raw.trim()
                    ),
                )
                .for_patient(ctx.record.id())
                .with_field(date_ref(FieldId::AeOnsetDate, &event.onset)),
            );
        }
    }
}

// ============================================================================
// (h) Unparseable key dates
// ============================================================================

fn unparseable_dates(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    let mut report = |field: FieldRef, what: String| {
        issues.push(
            ValidationIssue::info(RuleId::UnparseableDate, format!("{what} could not be read"))
                .for_patient(ctx.record.id())
                .with_field(field),
        );
    };

    for (field, name) in [
        (FieldId::ProcedureDate, "procedure date"),
        (FieldId::ConsentDate, "consent date"),
        (FieldId::DeathDate, "death date"),
    ] {
        if let Some(raw) = ctx.record.value(field)
            && parse_date(raw).failure().is_some()
        {
            report(
                FieldRef::from(field).with_value(raw),
                format!("{name} '{}'", raw.trim()),
            );
        }
    }
    for visit in Visit::SCHEDULED {
        if let Some(raw) = ctx.record.visit_value(FieldId::VisitDate, visit)
            && parse_date(raw).failure().is_some()
        {
            report(
                FieldRef::new(FieldKey::at(FieldId::VisitDate, visit)).with_value(raw),
                format!("{} date '{}'", visit.label(), raw.trim()),
            );
        }
    }
    for event in &ctx.events {
        for (field, date, name) in [
            (FieldId::AeOnsetDate, &event.onset, "onset"),
            (FieldId::AeEndDate, &event.end, "end date"),
        ] {
            if date.failure().is_some() {
                report(
                    date_ref(field, date),
                    format!("{} {name} '{}'", event_label(event), date.raw.trim()),
                );
            }
        }
    }
}

// ============================================================================
// (i) Ongoing checkbox with an end date
// ============================================================================

fn ongoing_with_end_date(ctx: &PatientContext<'_>, issues: &mut Vec<ValidationIssue>) {
    for event in &ctx.events {
        if event.ongoing_marked == Some(true) && !event.end.is_empty() {
            issues.push(
                ValidationIssue::info(
                    RuleId::OngoingWithEndDate,
                    format!("{} is marked ongoing but has an end date", event_label(event)),
                )
                .for_patient(ctx.record.id())
                .with_field(FieldId::AeOngoing)
                .with_field(date_ref(FieldId::AeEndDate, &event.end)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_markers() {
        assert!(marks_pre_procedure(Some("Pre-procedure")));
        assert!(marks_pre_procedure(Some("Prior to implant")));
        assert!(marks_pre_procedure(Some("Before procedure")));
        assert!(!marks_pre_procedure(Some("Post-procedure")));
        assert!(!marks_pre_procedure(Some("Procedure")));
        assert!(!marks_pre_procedure(None));
    }

    #[test]
    fn every_rule_is_registered_once() {
        let mut rules: Vec<RuleId> = RULES.iter().map(|(rule, _)| *rule).collect();
        rules.dedup();
        assert_eq!(rules.len(), 9);
        assert!(rules.iter().all(|rule| !rule.is_structural()));
    }
}
