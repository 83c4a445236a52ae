//! Resolved column mapping for a loaded session.

use std::collections::BTreeMap;

use crate::field::{FieldId, FieldKey, SheetKind};

/// Outcome of resolving one logical field against a loaded sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The physical column present in the sheet (original spelling).
    Present(String),
    /// The registry defines the field but the sheet lacks every accepted name.
    Missing,
}

impl Resolution {
    pub fn column(&self) -> Option<&str> {
        match self {
            Resolution::Present(column) => Some(column),
            Resolution::Missing => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Resolution::Present(_))
    }
}

/// Every (sheet, field, visit) the registry defines, with its resolution.
///
/// Unresolved fields stay in the map as [`Resolution::Missing`] so consumers
/// can tell "not loaded" apart from "never defined".
#[derive(Debug, Clone, Default)]
pub struct ResolvedMapping {
    entries: BTreeMap<(SheetKind, FieldKey), Resolution>,
}

impl ResolvedMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sheet: SheetKind, key: FieldKey, resolution: Resolution) {
        self.entries.insert((sheet, key), resolution);
    }

    pub fn get(&self, sheet: SheetKind, key: FieldKey) -> Option<&Resolution> {
        self.entries.get(&(sheet, key))
    }

    pub fn column(&self, sheet: SheetKind, key: FieldKey) -> Option<&str> {
        self.get(sheet, key).and_then(Resolution::column)
    }

    /// True when the field resolved to a column on any sheet and visit.
    pub fn is_available(&self, field: FieldId) -> bool {
        self.entries
            .iter()
            .any(|((_, key), resolution)| key.field == field && resolution.is_present())
    }

    /// Fields among `fields` that are not available anywhere.
    pub fn unavailable(&self, fields: &[FieldId]) -> Vec<FieldId> {
        fields
            .iter()
            .copied()
            .filter(|field| !self.is_available(*field))
            .collect()
    }

    pub fn has_sheet(&self, sheet: SheetKind) -> bool {
        self.entries
            .iter()
            .any(|((kind, _), resolution)| *kind == sheet && resolution.is_present())
    }

    pub fn entries(&self) -> impl Iterator<Item = (SheetKind, FieldKey, &Resolution)> {
        self.entries
            .iter()
            .map(|((sheet, key), resolution)| (*sheet, *key, resolution))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::Visit;

    #[test]
    fn availability_ignores_missing_entries() {
        let mut mapping = ResolvedMapping::new();
        mapping.insert(
            SheetKind::Main,
            FieldKey::new(FieldId::ProcedureDate),
            Resolution::Missing,
        );
        mapping.insert(
            SheetKind::Main,
            FieldKey::at(FieldId::VisitDate, Visit::Screening),
            Resolution::Present("SBV_SV_SVSTDTC".to_string()),
        );
        assert!(!mapping.is_available(FieldId::ProcedureDate));
        assert!(mapping.is_available(FieldId::VisitDate));
        assert_eq!(
            mapping.unavailable(&[FieldId::ProcedureDate, FieldId::VisitDate]),
            vec![FieldId::ProcedureDate]
        );
        assert!(mapping.has_sheet(SheetKind::Main));
        assert!(!mapping.has_sheet(SheetKind::AeLog));
    }
}
