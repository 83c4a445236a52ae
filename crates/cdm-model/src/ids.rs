//! Patient and form identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::visit::Visit;

/// Identifies a patient by site and subject (screening) number.
///
/// Ordering and equality follow the subject number, which is unique within
/// a study; the site is carried for grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientId {
    pub site: String,
    pub subject: String,
}

impl PatientId {
    /// Build an identifier, deriving the site from the subject prefix
    /// (`101-003` → `101`) when no site value is available.
    pub fn new(site: Option<&str>, subject: &str) -> Self {
        let subject = normalize_subject(subject);
        let site = match site.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => normalize_subject(value),
            None => site_from_subject(&subject),
        };
        Self { site, subject }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn site(&self) -> &str {
        &self.site
    }
}

impl PartialEq for PatientId {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
    }
}

impl Eq for PatientId {}

impl std::hash::Hash for PatientId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.subject.hash(state);
    }
}

impl PartialOrd for PatientId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatientId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.subject.cmp(&other.subject)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.subject)
    }
}

/// Spreadsheet exports render integer ids as floats (`1001.0`).
pub fn normalize_subject(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(".0")
        .unwrap_or(trimmed)
        .to_string()
}

/// Site code is the part of the subject number before the first `-`.
pub fn site_from_subject(subject: &str) -> String {
    match subject.split_once('-') {
        Some((site, _)) => site.to_string(),
        None => "Unknown".to_string(),
    }
}

/// Key joining a patient's form to source-data-verification history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SdvKey {
    pub subject: String,
    /// Folder is the visit prefix the form belongs to.
    pub folder: String,
    pub form: String,
}

impl SdvKey {
    pub fn new(patient: &PatientId, visit: Visit, form: &str) -> Self {
        Self {
            subject: patient.subject.clone(),
            folder: visit.prefix().to_string(),
            form: form.to_string(),
        }
    }
}
