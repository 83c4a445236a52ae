//! Missing-expected-data analysis.

use std::collections::BTreeMap;

use serde::Serialize;

use cdm_model::{
    FieldId, FieldKey, GapConfig, GapRecord, PatientId, PatientRecord, ResolvedMapping, SheetKind,
    Visit,
};
use cdm_normalize::is_blank;
use cdm_registry::{ColumnRegistry, RegistryEntry, SkipRule};

/// Gap totals for one patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientGapCount {
    /// Expected field/visit pairs evaluated.
    pub expected: usize,
    /// Pairs with neither a value nor an excuse.
    pub missing: usize,
    pub excused: usize,
}

/// Finds expected fields left blank at visits that took place.
#[derive(Debug, Clone, Copy)]
pub struct GapAnalyzer<'a> {
    registry: &'a ColumnRegistry,
    mapping: &'a ResolvedMapping,
    config: &'a GapConfig,
}

impl<'a> GapAnalyzer<'a> {
    pub fn new(
        registry: &'a ColumnRegistry,
        mapping: &'a ResolvedMapping,
        config: &'a GapConfig,
    ) -> Self {
        Self {
            registry,
            mapping,
            config,
        }
    }

    /// One record per patient, scheduled visit and expected field.
    pub fn analyze(&self, records: &[PatientRecord]) -> Vec<GapRecord> {
        let mut gaps = Vec::new();
        let mut screen_failures = 0usize;
        for record in records {
            if self.config.exclude_screen_failures && record.is_screen_failure() {
                screen_failures += 1;
                continue;
            }
            for visit in Visit::SCHEDULED {
                let occurred = visit_occurred(record, visit);
                if !occurred && self.config.hide_future_visits {
                    continue;
                }
                for entry in self.registry.expected_at(visit) {
                    if let Some(gap) = self.evaluate(record, visit, entry, occurred) {
                        gaps.push(gap);
                    }
                }
            }
        }
        tracing::info!(
            patients = records.len(),
            screen_failures,
            evaluated = gaps.len(),
            missing = gaps.iter().filter(|gap| !gap.satisfied).count(),
            "gap analysis complete"
        );
        gaps
    }

    fn evaluate(
        &self,
        record: &PatientRecord,
        visit: Visit,
        entry: &RegistryEntry,
        occurred: bool,
    ) -> Option<GapRecord> {
        let reason = entry.gap_reason()?;
        let column = self
            .mapping
            .column(SheetKind::Main, entry.key)
            .map(str::to_string);
        let (excused, satisfied) = if column.is_none() {
            (false, false)
        } else {
            let excused = entry
                .spec
                .skip
                .is_some_and(|rule| skip_applies(record, visit, rule));
            let present = record.get(entry.key).is_some_and(|raw| !is_blank(raw));
            (excused, present || excused)
        };
        Some(GapRecord {
            patient: record.id().clone(),
            visit,
            field: entry.key.field,
            form: entry.spec.form.to_string(),
            column,
            reason,
            visit_occurred: occurred,
            excused,
            satisfied,
        })
    }
}

/// A visit took place once its visit date is recorded.
pub fn visit_occurred(record: &PatientRecord, visit: Visit) -> bool {
    record
        .visit_value(FieldId::VisitDate, visit)
        .is_some_and(|raw| !is_blank(raw))
}

fn skip_applies(record: &PatientRecord, visit: Visit, rule: SkipRule) -> bool {
    let trigger = record
        .get(FieldKey::at(rule.trigger, visit))
        .or_else(|| record.get(FieldKey::new(rule.trigger)));
    trigger.is_some_and(|raw| {
        let value = raw.trim();
        rule.values
            .iter()
            .any(|candidate| value.eq_ignore_ascii_case(candidate))
    })
}

/// Gap totals per patient, in patient order.
pub fn gap_counts(gaps: &[GapRecord]) -> BTreeMap<PatientId, PatientGapCount> {
    let mut counts: BTreeMap<PatientId, PatientGapCount> = BTreeMap::new();
    for gap in gaps {
        let count = counts.entry(gap.patient.clone()).or_default();
        count.expected += 1;
        count.missing += usize::from(!gap.satisfied);
        count.excused += usize::from(gap.excused);
    }
    counts
}
