//! Workbook loading.
//!
//! Reads a workbook exported as one CSV per sheet, validates its columns
//! against the registry and builds the session's patient records.

pub mod discovery;
pub mod error;
pub mod loader;
pub mod sheet;

pub use discovery::{list_csv_files, sheet_name};
pub use error::{IngestError, Result};
pub use loader::{SINGLE_FILE_SHEET, Workbook, build_session, load_session, read_workbook};
pub use sheet::{SheetTable, read_sheet};
