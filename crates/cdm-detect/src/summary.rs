//! Descriptive statistics over adverse events.
//!
//! A statistic whose fields were not resolved for the session degrades to
//! [`Stat::Unavailable`]; every other statistic is still computed. A
//! requested filter whose fields are unresolved is skipped and reported.

use std::collections::{BTreeMap, BTreeSet};

use cdm_model::ids::site_from_subject;
use cdm_model::{
    AdverseEvent, AeFilters, AeOutcome, FieldId, PatientAeSummary, PatientRecord, Relatedness,
    RelatednessRow, ResolvedMapping, SkippedFilter, Stat, SummaryStats, TermCount,
};
use chrono::NaiveDate;

/// How many terms the top-terms table keeps.
pub const TOP_TERMS: usize = 10;

const DEVICE_FIELDS: [FieldId; 3] = FieldId::DEVICE_RELATEDNESS;

const CRITERIA_FIELDS: [FieldId; 5] = [
    FieldId::AeDeathCriterion,
    FieldId::AeHospitalizationCriterion,
    FieldId::AeLifeThreateningCriterion,
    FieldId::AeDisabilityCriterion,
    FieldId::AeMedicallyImportantCriterion,
];

/// Fields a group statistic needs: missing only when none of them resolved.
fn missing_all(mapping: &ResolvedMapping, fields: &[FieldId]) -> Vec<FieldId> {
    let missing = mapping.unavailable(fields);
    if missing.len() == fields.len() {
        missing
    } else {
        Vec::new()
    }
}

/// Summarize `events` after applying `filters`.
///
/// `records` supply patient status for the screen-failure filter.
pub fn summarize(
    events: &[AdverseEvent],
    records: &[PatientRecord],
    mapping: &ResolvedMapping,
    filters: &AeFilters,
) -> SummaryStats {
    let (kept, skipped_filters) = apply_filters(events, records, mapping, filters);

    let count = |predicate: fn(&AdverseEvent) -> bool| kept.iter().filter(|e| predicate(e)).count();

    let patients: BTreeSet<&str> = kept.iter().map(|event| event.patient.subject()).collect();

    let stats = SummaryStats {
        total_events: kept.len(),
        patients_with_events: patients.len(),
        serious: Stat::compute(mapping.unavailable(&[FieldId::AeSerious]), || {
            count(|e| e.serious)
        }),
        fatal: Stat::compute(mapping.unavailable(&[FieldId::AeOutcome]), || {
            count(AdverseEvent::is_fatal)
        }),
        ongoing: Stat::compute(
            mapping.unavailable(&[FieldId::AeOutcome, FieldId::AeEndDate]),
            || count(|e| e.ongoing),
        ),
        device_related: Stat::compute(missing_all(mapping, &DEVICE_FIELDS), || {
            count(|e| e.device_related)
        }),
        procedure_related: Stat::compute(
            mapping.unavailable(&[FieldId::AeRelatedProcedure]),
            || count(|e| e.procedure_related),
        ),
        pre_procedure: Stat::compute(
            mapping.unavailable(&[FieldId::AeOnsetDate, FieldId::ProcedureDate]),
            || count(|e| e.pre_procedure),
        ),
        outcome_distribution: Stat::compute(mapping.unavailable(&[FieldId::AeOutcome]), || {
            outcome_distribution(&kept)
        }),
        top_terms: top_terms(&kept, TOP_TERMS),
        sae_criteria: Stat::compute(missing_all(mapping, &CRITERIA_FIELDS), || {
            sae_criteria(&kept)
        }),
        by_site: by_site(&kept),
        by_patient: by_patient(&kept),
        relatedness: Stat::compute(
            missing_all(
                mapping,
                &[
                    FieldId::AeRelatedImplant,
                    FieldId::AeRelatedDelivery,
                    FieldId::AeRelatedHandle,
                    FieldId::AeRelatedProcedure,
                ],
            ),
            || relatedness_table(&kept),
        ),
        skipped_filters,
    };

    let unavailable: Vec<&str> = [
        ("serious", stats.serious.is_available()),
        ("fatal", stats.fatal.is_available()),
        ("ongoing", stats.ongoing.is_available()),
        ("device_related", stats.device_related.is_available()),
        ("procedure_related", stats.procedure_related.is_available()),
        ("pre_procedure", stats.pre_procedure.is_available()),
        ("sae_criteria", stats.sae_criteria.is_available()),
        ("relatedness", stats.relatedness.is_available()),
    ]
    .into_iter()
    .filter_map(|(name, available)| (!available).then_some(name))
    .collect();
    if !unavailable.is_empty() {
        tracing::warn!(statistics = ?unavailable, "statistics unavailable, fields not resolved");
    }
    tracing::info!(
        events = stats.total_events,
        patients = stats.patients_with_events,
        "adverse events summarized"
    );
    stats
}

fn apply_filters<'a>(
    events: &'a [AdverseEvent],
    records: &[PatientRecord],
    mapping: &ResolvedMapping,
    filters: &AeFilters,
) -> (Vec<&'a AdverseEvent>, Vec<SkippedFilter>) {
    let mut kept: Vec<&AdverseEvent> = events.iter().collect();
    let mut skipped = Vec::new();

    let mut apply = |name: &str,
                     enabled: bool,
                     missing: Vec<FieldId>,
                     keep: &dyn Fn(&AdverseEvent) -> bool| {
        if !enabled {
            return;
        }
        if !missing.is_empty() {
            tracing::warn!(filter = name, missing = ?missing, "filter skipped, fields not resolved");
            skipped.push(SkippedFilter {
                filter: name.to_string(),
                missing,
            });
            return;
        }
        let before = kept.len();
        kept.retain(|event| keep(event));
        tracing::debug!(filter = name, before, after = kept.len(), "filter applied");
    };

    let screen_failures: BTreeSet<&str> = records
        .iter()
        .filter(|record| record.is_screen_failure())
        .map(|record| record.id().subject())
        .collect();

    apply(
        "exclude_screen_failures",
        filters.exclude_screen_failures,
        mapping.unavailable(&[FieldId::Status]),
        &|event| !screen_failures.contains(event.patient.subject()),
    );
    apply(
        "serious_only",
        filters.serious_only,
        mapping.unavailable(&[FieldId::AeSerious]),
        &|event| event.serious,
    );
    apply(
        "device_related_only",
        filters.device_related_only,
        missing_all(mapping, &DEVICE_FIELDS),
        &|event| event.device_related,
    );
    apply(
        "exclude_pre_procedure",
        filters.exclude_pre_procedure,
        mapping.unavailable(&[FieldId::AeOnsetDate, FieldId::ProcedureDate]),
        &|event| !event.pre_procedure,
    );
    if let Some(cutoff) = filters.onset_cutoff {
        apply(
            "onset_cutoff",
            true,
            mapping.unavailable(&[FieldId::AeOnsetDate]),
            &|event| on_or_before(event.onset.candidates(), cutoff),
        );
    }
    if let Some(cutoff) = filters.report_cutoff {
        apply(
            "report_cutoff",
            true,
            mapping.unavailable(&[FieldId::AeReportDate]),
            &|event| on_or_before(event.report_date.candidates(), cutoff),
        );
    }

    (kept, skipped)
}

/// Unknown dates are kept; otherwise the earliest reading must not exceed
/// the cutoff.
fn on_or_before(candidates: &[cdm_model::DateValue], cutoff: NaiveDate) -> bool {
    candidates
        .iter()
        .filter_map(|value| value.earliest())
        .min()
        .is_none_or(|earliest| earliest <= cutoff)
}

fn outcome_distribution(events: &[&AdverseEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        if event.outcome == AeOutcome::NotRecorded {
            continue;
        }
        *counts.entry(event.outcome.label().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Most frequent terms, grouped case-insensitively under their first spelling.
pub fn top_terms(events: &[&AdverseEvent], limit: usize) -> Vec<TermCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for event in events {
        let key = event.term.to_lowercase();
        let entry = counts.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (event.term.clone(), 0)
        });
        entry.1 += 1;
    }
    let mut terms: Vec<TermCount> = order
        .into_iter()
        .filter_map(|key| counts.remove(&key))
        .map(|(term, count)| TermCount { term, count })
        .collect();
    // Stable: ties keep first-seen order.
    terms.sort_by(|a, b| b.count.cmp(&a.count));
    terms.truncate(limit);
    terms
}

fn sae_criteria(events: &[&AdverseEvent]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = [
        "Death",
        "Hospitalization",
        "Life-threatening",
        "Disability",
        "Medically important",
    ]
    .into_iter()
    .map(|label| (label.to_string(), 0))
    .collect();
    for event in events {
        for label in event.criteria.labels() {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn by_site(events: &[&AdverseEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts
            .entry(site_from_subject(event.patient.subject()))
            .or_insert(0) += 1;
    }
    counts
}

fn by_patient(events: &[&AdverseEvent]) -> Vec<PatientAeSummary> {
    let mut grouped: BTreeMap<&cdm_model::PatientId, PatientAeSummary> = BTreeMap::new();
    for event in events {
        let summary = grouped
            .entry(&event.patient)
            .or_insert_with(|| PatientAeSummary {
                patient: event.patient.clone(),
                events: 0,
                serious: 0,
                ongoing: 0,
                fatal: 0,
            });
        summary.events += 1;
        summary.serious += usize::from(event.serious);
        summary.ongoing += usize::from(event.ongoing);
        summary.fatal += usize::from(event.is_fatal());
    }
    grouped.into_values().collect()
}

fn relatedness_table(events: &[&AdverseEvent]) -> Vec<RelatednessRow> {
    let components: [(&str, fn(&AdverseEvent) -> &Relatedness); 4] = [
        ("Implant", |e| &e.device.implant),
        ("Delivery System", |e| &e.device.delivery_system),
        ("Handle", |e| &e.device.handle),
        ("Procedure", |e| &e.procedure),
    ];
    components
        .into_iter()
        .map(|(component, get)| {
            let mut row = RelatednessRow {
                component: component.to_string(),
                ..RelatednessRow::default()
            };
            for event in events {
                match get(event) {
                    Relatedness::Related => row.related += 1,
                    Relatedness::Probable => row.probable += 1,
                    Relatedness::Possible => row.possible += 1,
                    Relatedness::Unlikely => row.unlikely += 1,
                    Relatedness::NotRelated => row.not_related += 1,
                    Relatedness::Blank => row.blank += 1,
                    Relatedness::Other(_) => row.other += 1,
                }
            }
            row
        })
        .collect()
}
