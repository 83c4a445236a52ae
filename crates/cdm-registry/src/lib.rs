//! Column registry and schema validation.
//!
//! The registry owns the `{VISIT}_{FORM}_{FIELD}` naming convention; the
//! schema validator checks loaded sheets against it and produces the
//! session's [`ResolvedMapping`](cdm_model::ResolvedMapping).

pub mod error;
pub mod fields;
pub mod registry;
pub mod schema;
pub mod util;

pub use error::{NotFound, NotFoundReason};
pub use fields::{Applicability, FIELD_SPECS, FieldScope, FieldSpec, SkipRule};
pub use registry::{ColumnRegistry, MissingField, RegistryEntry};
pub use schema::{SchemaValidator, SheetValidation, WorkbookValidation, identify_sheet};
pub use util::CaseInsensitiveSet;
