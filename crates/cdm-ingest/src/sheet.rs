//! Reading one exported sheet.
//!
//! EDC exports carry field codes in the first row. The main sheet adds a
//! second row of human labels before the data; repeating-form sheets go
//! straight to data. The labels row is detected, not assumed.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

/// A sheet as text: header codes, optional labels, and data rows.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    /// Human labels row, when the export has one.
    pub labels: Option<Vec<String>>,
    /// Data rows, padded or truncated to the header width.
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Build a table from raw rows, detecting the labels row.
    pub fn from_rows(name: impl Into<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let name = name.into();
        let mut raw_rows = raw_rows.into_iter();
        let headers: Vec<String> = raw_rows
            .next()
            .unwrap_or_default()
            .iter()
            .map(|value| normalize_header(value))
            .collect();
        let mut rest: Vec<Vec<String>> = raw_rows.collect();

        let labels = if rest.first().is_some_and(|row| is_labels_row(row)) {
            tracing::debug!(sheet = %name, "labels row detected");
            Some(rest.remove(0))
        } else {
            None
        };

        let width = headers.len();
        let rows = rest
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self {
            name,
            headers,
            labels,
            rows,
        }
    }

    /// Position of the first header matching `column`, ignoring case.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        let wanted = column.trim().to_uppercase();
        self.headers
            .iter()
            .position(|header| header.to_uppercase() == wanted)
    }

    /// Label for a header code, when the labels row is present.
    pub fn label(&self, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(index))
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Read a CSV sheet export. Fully blank rows are dropped.
pub fn read_sheet(path: &Path, name: &str) -> Result<SheetTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        raw_rows.push(row);
    }
    if raw_rows.is_empty() {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    let table = SheetTable::from_rows(name, raw_rows);
    tracing::debug!(
        sheet = %table.name,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "sheet read"
    );
    Ok(table)
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}').replace('\u{a0}', " ");
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

#[derive(Debug, Default, Clone, Copy)]
struct RowStats {
    total: usize,
    non_empty: usize,
    numeric: usize,
    alpha: usize,
    subject: usize,
}

impl RowStats {
    fn ratio(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            part as f64 / total as f64
        }
    }

    fn numeric_ratio(self) -> f64 {
        Self::ratio(self.numeric, self.non_empty)
    }

    fn alpha_ratio(self) -> f64 {
        Self::ratio(self.alpha, self.non_empty)
    }

    fn empty_ratio(self) -> f64 {
        1.0 - Self::ratio(self.non_empty, self.total)
    }
}

fn row_stats(row: &[String]) -> RowStats {
    let mut stats = RowStats {
        total: row.len(),
        ..RowStats::default()
    };
    for cell in row {
        if cell.is_empty() {
            continue;
        }
        stats.non_empty += 1;
        if cell.parse::<f64>().is_ok() {
            stats.numeric += 1;
        }
        if cell.chars().any(char::is_alphabetic) {
            stats.alpha += 1;
        }
        if is_subject_like(cell) {
            stats.subject += 1;
        }
    }
    stats
}

/// Subject numbers look like `101-003`; bare numbers count as numeric.
fn is_subject_like(value: &str) -> bool {
    let mut parts = value.split('-');
    parts.clone().count() >= 2
        && parts.all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn is_data_like(stats: RowStats) -> bool {
    stats.subject > 0 || stats.numeric_ratio() >= 0.2 || stats.empty_ratio() >= 0.2
}

fn is_labels_row(row: &[String]) -> bool {
    let stats = row_stats(row);
    stats.non_empty > 0 && !is_data_like(stats) && stats.alpha_ratio() >= 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| (*cell).to_string()).collect()
    }

    #[test]
    fn labels_row_is_detected() {
        let table = SheetTable::from_rows(
            "Main",
            vec![
                row(&["\u{feff}Screening #", "SBV_SV_SVSTDTC"]),
                row(&["Screening Number", "Visit Date"]),
                row(&["101-001", "2024-01-10"]),
            ],
        );
        assert_eq!(table.headers, vec!["Screening #", "SBV_SV_SVSTDTC"]);
        assert_eq!(table.label("sbv_sv_svstdtc"), Some("Visit Date"));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn data_row_is_not_labels() {
        let table = SheetTable::from_rows(
            "AE",
            vec![
                row(&["Screening #", "LOGS_AE_AETERM", "LOGS_AE_AESTDTC"]),
                row(&["101-001", "Dyspnea", "2024-02-01"]),
            ],
        );
        assert!(table.labels.is_none());
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = SheetTable::from_rows(
            "AE",
            vec![row(&["A", "B", "C"]), row(&["101-001"])],
        );
        assert_eq!(table.rows[0], row(&["101-001", "", ""]));
    }

    #[test]
    fn subject_shapes() {
        assert!(is_subject_like("101-003"));
        assert!(!is_subject_like("1001"));
        assert!(!is_subject_like("Screening #"));
        assert!(!is_subject_like("101-"));
    }
}
