//! Case-insensitive column lookup.

use std::collections::HashMap;

/// A set that performs case-insensitive lookups but preserves original names.
///
/// Export tools differ in header casing (`Screening #` vs `SCREENING #`);
/// lookups fold case and trim, the stored value keeps the sheet's spelling.
#[derive(Debug, Clone, Default)]
pub struct CaseInsensitiveSet {
    /// Maps folded name -> original name
    inner: HashMap<String, String>,
}

impl CaseInsensitiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set from an iterator of strings. The first spelling wins.
    pub fn from_iter<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }

    /// Insert a value. Returns false when a case-folded equal name is
    /// already present; the existing spelling is kept.
    pub fn insert(&mut self, value: impl AsRef<str>) -> bool {
        let original = value.as_ref();
        let key = fold(original);
        if self.inner.contains_key(&key) {
            return false;
        }
        self.inner.insert(key, original.to_string());
        true
    }

    pub fn contains(&self, value: impl AsRef<str>) -> bool {
        self.inner.contains_key(&fold(value.as_ref()))
    }

    /// Get the original column name (case-insensitive lookup).
    pub fn get(&self, value: impl AsRef<str>) -> Option<&str> {
        self.inner.get(&fold(value.as_ref())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn fold(value: &str) -> String {
    value.trim().to_uppercase()
}
