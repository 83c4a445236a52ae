//! Sheet identification and column validation.
//!
//! Runs before any detector so a wrong sheet or missing column shows up as
//! a structured issue instead of a failure deep inside extraction.

use std::collections::BTreeMap;

use cdm_model::{
    FieldId, FieldKey, FieldRef, IssueSeverity, Resolution, ResolvedMapping, RuleId, SheetKind,
    ValidationIssue,
};

use crate::registry::ColumnRegistry;
use crate::util::CaseInsensitiveSet;

/// Identify a sheet by the form tokens in its name.
///
/// `"AE Log"`, `"Adverse Events"` → AE log; `"CVH"` → CV history;
/// `"Main"`, `"Forms"`, `"ProjectToOneFile"` → main sheet.
pub fn identify_sheet(name: &str) -> Option<SheetKind> {
    let upper = name.trim().to_uppercase();
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    let has = |wanted: &[&str]| tokens.iter().any(|token| wanted.contains(token));

    if has(&["CVH", "CARDIOVASCULAR"]) {
        Some(SheetKind::CvhLog)
    } else if has(&["AE", "AES", "ADVERSE"]) || upper.starts_with("LOGS_AE") {
        Some(SheetKind::AeLog)
    } else if has(&["MAIN", "FORM", "FORMS", "DATA"]) || upper.contains("PROJECTTOONEFILE") {
        Some(SheetKind::Main)
    } else {
        None
    }
}

/// Validation result for one sheet.
#[derive(Debug, Clone)]
pub struct SheetValidation {
    pub name: String,
    /// None when the sheet could not be identified or was rejected.
    pub kind: Option<SheetKind>,
    pub issues: Vec<ValidationIssue>,
    /// Resolutions for this sheet's registry fields.
    pub mapping: ResolvedMapping,
}

impl SheetValidation {
    pub fn is_usable(&self) -> bool {
        self.kind.is_some()
    }

    /// Logical key for each resolved physical column of this sheet.
    pub fn resolved_columns(&self) -> Vec<(FieldKey, String)> {
        self.mapping
            .entries()
            .filter_map(|(_, key, resolution)| resolution.column().map(|c| (key, c.to_string())))
            .collect()
    }
}

/// Validation result for a whole workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookValidation {
    pub sheets: Vec<SheetValidation>,
    pub mapping: ResolvedMapping,
    pub issues: Vec<ValidationIssue>,
}

impl WorkbookValidation {
    pub fn sheet(&self, kind: SheetKind) -> Option<&SheetValidation> {
        self.sheets.iter().find(|sheet| sheet.kind == Some(kind))
    }

    pub fn has_fatal(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Fatal)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaValidator<'a> {
    registry: &'a ColumnRegistry,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(registry: &'a ColumnRegistry) -> Self {
        Self { registry }
    }

    /// Validate one sheet given its name and header row.
    pub fn validate_sheet<S: AsRef<str>>(&self, name: &str, columns: &[S]) -> SheetValidation {
        let mut issues = Vec::new();
        let Some(kind) = identify_sheet(name) else {
            tracing::warn!(sheet = name, "sheet not recognized");
            issues.push(
                ValidationIssue::fatal(
                    RuleId::UnrecognizedSheet,
                    format!("sheet '{name}' is not a Main, AE log or CVH log sheet"),
                )
                .on_sheet(name),
            );
            return SheetValidation {
                name: name.to_string(),
                kind: None,
                issues,
                mapping: ResolvedMapping::new(),
            };
        };

        let mut present = CaseInsensitiveSet::new();
        for column in columns {
            let column = column.as_ref().trim();
            if column.is_empty() {
                continue;
            }
            if !present.insert(column) {
                issues.push(
                    ValidationIssue::warning(
                        RuleId::DuplicateColumn,
                        format!("column '{column}' appears more than once; the first is used"),
                    )
                    .on_sheet(name),
                );
            }
        }

        let mut mapping = ResolvedMapping::new();
        let mut missing: BTreeMap<FieldId, Vec<FieldRef>> = BTreeMap::new();
        let mut critical_missing: BTreeMap<FieldId, bool> = BTreeMap::new();
        let mut resolved = 0usize;
        for entry in self.registry.entries_for(kind) {
            match entry.find_in(&present) {
                Some(column) => {
                    if !entry.spec.is_identifier() {
                        resolved += 1;
                    }
                    mapping.insert(kind, entry.key, Resolution::Present(column.to_string()));
                }
                None => {
                    mapping.insert(kind, entry.key, Resolution::Missing);
                    missing
                        .entry(entry.key.field)
                        .or_default()
                        .push(FieldRef::new(entry.key).with_column(entry.column.clone()));
                    *critical_missing.entry(entry.key.field).or_default() |= entry.spec.critical;
                }
            }
        }

        // Identifier columns appear on every sheet and prove nothing.
        if resolved == 0 {
            tracing::error!(sheet = name, kind = %kind, "sheet has none of the expected columns");
            issues.push(
                ValidationIssue::fatal(
                    RuleId::WrongSheet,
                    format!(
                        "sheet '{name}' looks like the {kind} sheet but has none of its columns"
                    ),
                )
                .on_sheet(name),
            );
            return SheetValidation {
                name: name.to_string(),
                kind: None,
                issues,
                mapping: ResolvedMapping::new(),
            };
        }

        for (field, refs) in missing {
            let message = if refs.len() == 1 {
                format!("{kind} sheet lacks column {}", describe_expected(&refs))
            } else {
                format!(
                    "{kind} sheet lacks {field} at {} visits ({})",
                    refs.len(),
                    describe_expected(&refs)
                )
            };
            let issue = if critical_missing.get(&field).copied().unwrap_or(false) {
                ValidationIssue::warning(RuleId::MissingField, message)
            } else {
                ValidationIssue::info(RuleId::MissingField, message)
            };
            let issue = refs
                .into_iter()
                .fold(issue.on_sheet(name), ValidationIssue::with_field);
            issues.push(issue);
        }

        tracing::debug!(
            sheet = name,
            kind = %kind,
            resolved,
            issues = issues.len(),
            "sheet validated"
        );
        SheetValidation {
            name: name.to_string(),
            kind: Some(kind),
            issues,
            mapping,
        }
    }

    /// Validate every sheet and merge the mappings of the usable ones.
    ///
    /// A workbook without a Main sheet is fatal; the first sheet of each
    /// kind is used and later ones are reported and ignored. Once a Main
    /// sheet is present, unrecognized sheets (CM, MH and other forms the
    /// engine does not read) are only warnings.
    pub fn validate_workbook<N, S>(&self, sheets: &[(N, Vec<S>)]) -> WorkbookValidation
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut result = WorkbookValidation::default();
        for (name, columns) in sheets {
            let name = name.as_ref();
            let mut sheet = self.validate_sheet(name, columns);
            if let Some(kind) = sheet.kind
                && result.sheet(kind).is_some()
            {
                sheet.issues.push(
                    ValidationIssue::warning(
                        RuleId::UnrecognizedSheet,
                        format!("a {kind} sheet was already loaded; '{name}' is ignored"),
                    )
                    .on_sheet(name),
                );
                sheet.kind = None;
            }
            result.issues.extend(sheet.issues.iter().cloned());
            if let Some(kind) = sheet.kind {
                for (_, key, resolution) in sheet.mapping.entries() {
                    result.mapping.insert(kind, key, resolution.clone());
                }
            }
            result.sheets.push(sheet);
        }
        if result.sheet(SheetKind::Main).is_none() {
            result.issues.push(ValidationIssue::fatal(
                RuleId::MissingMainSheet,
                "no Main sheet found; nothing can be extracted",
            ));
        } else {
            let sheet_issues = result.sheets.iter_mut().flat_map(|sheet| sheet.issues.iter_mut());
            for issue in result.issues.iter_mut().chain(sheet_issues) {
                if issue.rule == RuleId::UnrecognizedSheet {
                    issue.severity = IssueSeverity::Warning;
                }
            }
        }
        result
    }
}

fn describe_expected(refs: &[FieldRef]) -> String {
    const SHOWN: usize = 4;
    let mut names: Vec<&str> = refs
        .iter()
        .take(SHOWN)
        .filter_map(|field| field.column.as_deref())
        .collect();
    let rest = refs.len().saturating_sub(SHOWN);
    let more = format!("+{rest} more");
    if rest > 0 {
        names.push(&more);
    }
    names.join(", ")
}
