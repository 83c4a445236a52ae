//! Error types for workbook loading.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a workbook from loading at all.
///
/// Data-quality problems inside a readable sheet are not errors; they are
/// reported as validation issues on the session.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input path does not exist.
    #[error("input not found: {path}")]
    PathNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory holds no CSV sheet exports.
    #[error("no CSV sheets found in {path}")]
    NoSheets { path: PathBuf },

    // === CSV Parsing Errors ===
    /// Failed to open or parse a CSV file.
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// CSV file has no non-blank rows.
    #[error("CSV file is empty: {path}")]
    EmptyCsv { path: PathBuf },
}

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, IngestError>;
