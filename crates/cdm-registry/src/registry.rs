//! Column registry: logical field ↔ physical column translation.

use std::collections::BTreeMap;

use cdm_model::{FieldId, FieldKey, GapReason, SheetKind, Visit};
use serde::Serialize;

use crate::error::{NotFound, NotFoundReason};
use crate::fields::{FIELD_SPECS, FieldScope, FieldSpec, VISIT_COLUMN_OVERRIDES};
use crate::util::CaseInsensitiveSet;

/// One physical column the registry expects.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: FieldKey,
    pub sheet: SheetKind,
    /// Canonical column name.
    pub column: String,
    /// Visit the column belongs to, for per-visit and fixed-visit fields.
    pub visit: Option<Visit>,
    pub spec: &'static FieldSpec,
}

impl RegistryEntry {
    /// Every accepted spelling: the canonical name first, then aliases.
    pub fn accepted_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.column.as_str()).chain(self.spec.aliases.iter().copied())
    }

    /// Find this entry's column among the sheet's columns.
    pub fn find_in<'a>(&self, columns: &'a CaseInsensitiveSet) -> Option<&'a str> {
        self.accepted_names().find_map(|name| columns.get(name))
    }

    /// Gap applicability for this entry, when it is expected at all.
    pub fn gap_reason(&self) -> Option<GapReason> {
        if !self.spec.expected {
            return None;
        }
        match self.spec.scope {
            FieldScope::Fixed(_) => None,
            FieldScope::AtVisit(..) => Some(GapReason::FixedVisit),
            FieldScope::PerVisit { applicability, .. } => Some(applicability.gap_reason()),
        }
    }
}

/// A registry field the sheet does not carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingField {
    pub key: FieldKey,
    pub sheet: SheetKind,
    pub expected_column: String,
    pub critical: bool,
}

/// The single source of truth for column names.
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    entries: Vec<RegistryEntry>,
    index: BTreeMap<(SheetKind, FieldKey), usize>,
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ColumnRegistry {
    /// Registry built from the study's field table.
    pub fn standard() -> Self {
        Self::from_specs(FIELD_SPECS)
    }

    pub fn from_specs(specs: &'static [FieldSpec]) -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        };
        for spec in specs {
            match spec.scope {
                FieldScope::Fixed(column) => {
                    registry.push(spec, FieldKey::new(spec.field), column.to_string(), None);
                }
                FieldScope::AtVisit(visit, suffix) => {
                    registry.push(
                        spec,
                        FieldKey::new(spec.field),
                        format!("{}_{suffix}", visit.prefix()),
                        Some(visit),
                    );
                }
                FieldScope::PerVisit {
                    suffix,
                    applicability,
                } => {
                    for visit in Visit::SCHEDULED {
                        if !applicability.applies_to(visit) {
                            continue;
                        }
                        let column = column_override(spec.field, visit)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("{}_{suffix}", visit.prefix()));
                        registry.push(spec, FieldKey::at(spec.field, visit), column, Some(visit));
                    }
                }
            }
        }
        registry
    }

    fn push(
        &mut self,
        spec: &'static FieldSpec,
        key: FieldKey,
        column: String,
        visit: Option<Visit>,
    ) {
        let slot = (spec.sheet, key);
        if self.index.contains_key(&slot) {
            tracing::warn!(field = %key, sheet = %spec.sheet, "duplicate registry entry ignored");
            return;
        }
        self.index.insert(slot, self.entries.len());
        self.entries.push(RegistryEntry {
            key,
            sheet: spec.sheet,
            column,
            visit,
            spec,
        });
    }

    /// Physical column for a logical field at a visit.
    ///
    /// Fields collected once under a fixed prefix (procedure date, consent
    /// date) resolve with or without that visit.
    pub fn resolve(&self, field: FieldId, visit: Option<Visit>) -> Result<&str, NotFound> {
        let mut known = false;
        for entry in self.entries.iter().filter(|entry| entry.key.field == field) {
            known = true;
            if entry.key.visit == visit || (entry.key.visit.is_none() && entry.visit == visit) {
                return Ok(entry.column.as_str());
            }
        }
        let reason = if known {
            NotFoundReason::NotCollected
        } else {
            NotFoundReason::UnknownField
        };
        Err(NotFound {
            field,
            visit,
            reason,
        })
    }

    pub fn entry(&self, sheet: SheetKind, key: FieldKey) -> Option<&RegistryEntry> {
        self.index.get(&(sheet, key)).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entries_for(&self, sheet: SheetKind) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(move |entry| entry.sheet == sheet)
    }

    /// Entries the gap analyzer expects at `visit`.
    pub fn expected_at(&self, visit: Visit) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(move |entry| {
            entry.sheet == SheetKind::Main
                && entry.visit == Some(visit)
                && entry.gap_reason().is_some()
        })
    }

    pub fn spec(&self, field: FieldId) -> Option<&'static FieldSpec> {
        self.entries
            .iter()
            .find(|entry| entry.key.field == field)
            .map(|entry| entry.spec)
    }

    /// Registry fields for `sheet` that none of `available_columns` satisfies.
    pub fn validate<S: AsRef<str>>(
        &self,
        sheet: SheetKind,
        available_columns: &[S],
    ) -> Vec<MissingField> {
        let columns = CaseInsensitiveSet::from_iter(available_columns);
        self.entries_for(sheet)
            .filter(|entry| entry.find_in(&columns).is_none())
            .map(|entry| MissingField {
                key: entry.key,
                sheet,
                expected_column: entry.column.clone(),
                critical: entry.spec.critical,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn column_override(field: FieldId, visit: Visit) -> Option<&'static str> {
    VISIT_COLUMN_OVERRIDES
        .iter()
        .find(|(f, v, _)| *f == field && *v == visit)
        .map(|(_, _, column)| *column)
}
