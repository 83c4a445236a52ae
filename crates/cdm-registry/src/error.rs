use cdm_model::{FieldId, Visit};

/// Why a logical field has no physical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The registry does not define the field.
    UnknownField,
    /// The field exists but is not collected at the requested visit.
    NotCollected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no column for {field} at {}: {}", visit_label(.visit), reason_label(.reason))]
pub struct NotFound {
    pub field: FieldId,
    pub visit: Option<Visit>,
    pub reason: NotFoundReason,
}

fn visit_label(visit: &Option<Visit>) -> &'static str {
    visit.map_or("no visit", Visit::prefix)
}

fn reason_label(reason: &NotFoundReason) -> &'static str {
    match reason {
        NotFoundReason::UnknownField => "field is not defined",
        NotFoundReason::NotCollected => "not collected at this visit",
    }
}
