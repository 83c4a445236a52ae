//! Missing-expected-data records.

use serde::{Deserialize, Serialize};

use crate::field::FieldId;
use crate::ids::PatientId;
use crate::visit::Visit;

/// Applicability rule that made a field expected at a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    /// Collected at every scheduled visit, on-site or remote.
    EveryScheduledVisit,
    /// Collected at on-site visits only.
    OnSiteVisit,
    /// Collected at every follow-up visit after discharge.
    FollowUpVisit,
    /// Collected once, at a single fixed visit.
    FixedVisit,
}

impl GapReason {
    pub fn describe(self) -> &'static str {
        match self {
            GapReason::EveryScheduledVisit => "expected at every scheduled visit",
            GapReason::OnSiteVisit => "expected at on-site visits",
            GapReason::FollowUpVisit => "expected at follow-up visits",
            GapReason::FixedVisit => "expected once at this visit",
        }
    }
}

/// One expected field at one visit for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub patient: PatientId,
    pub visit: Visit,
    pub field: FieldId,
    pub form: String,
    /// Physical column; absent when the column is not in the loaded sheet.
    pub column: Option<String>,
    pub reason: GapReason,
    /// False when the visit has no recorded date yet.
    pub visit_occurred: bool,
    /// A conditional skip (e.g. assessment "not done") excused the field.
    pub excused: bool,
    /// Value present, or excused.
    pub satisfied: bool,
}
