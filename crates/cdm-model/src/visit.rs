//! Study visit prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a visit takes place, which decides the assessment set collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitKind {
    /// Full assessment set including labs and echo.
    OnSite,
    /// Phone/remote contact: questionnaires and status only.
    Remote,
    /// Unscheduled visit, no expected assessments.
    Unscheduled,
    /// Log forms (AE, death, medications) that are not tied to a visit.
    Log,
}

/// A visit prefix used in `{VISIT}_{FORM}_{FIELD}` column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Visit {
    #[serde(rename = "SBV")]
    Screening,
    #[serde(rename = "TV")]
    Treatment,
    #[serde(rename = "DV")]
    Discharge,
    #[serde(rename = "FU1M")]
    FollowUp30Day,
    #[serde(rename = "FU3M")]
    FollowUp3Month,
    #[serde(rename = "FU6M")]
    FollowUp6Month,
    #[serde(rename = "FU1Y")]
    FollowUp1Year,
    #[serde(rename = "FU2Y")]
    FollowUp2Year,
    #[serde(rename = "FU3Y")]
    FollowUp3Year,
    #[serde(rename = "FU4Y")]
    FollowUp4Year,
    #[serde(rename = "FU5Y")]
    FollowUp5Year,
    #[serde(rename = "UV")]
    Unscheduled,
    #[serde(rename = "LOGS")]
    Logs,
}

impl Visit {
    /// Scheduled visits in chronological order.
    pub const SCHEDULED: [Visit; 11] = [
        Visit::Screening,
        Visit::Treatment,
        Visit::Discharge,
        Visit::FollowUp30Day,
        Visit::FollowUp3Month,
        Visit::FollowUp6Month,
        Visit::FollowUp1Year,
        Visit::FollowUp2Year,
        Visit::FollowUp3Year,
        Visit::FollowUp4Year,
        Visit::FollowUp5Year,
    ];

    /// Every prefix, including unscheduled and log forms.
    pub const ALL: [Visit; 13] = [
        Visit::Screening,
        Visit::Treatment,
        Visit::Discharge,
        Visit::FollowUp30Day,
        Visit::FollowUp3Month,
        Visit::FollowUp6Month,
        Visit::FollowUp1Year,
        Visit::FollowUp2Year,
        Visit::FollowUp3Year,
        Visit::FollowUp4Year,
        Visit::FollowUp5Year,
        Visit::Unscheduled,
        Visit::Logs,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Visit::Screening => "SBV",
            Visit::Treatment => "TV",
            Visit::Discharge => "DV",
            Visit::FollowUp30Day => "FU1M",
            Visit::FollowUp3Month => "FU3M",
            Visit::FollowUp6Month => "FU6M",
            Visit::FollowUp1Year => "FU1Y",
            Visit::FollowUp2Year => "FU2Y",
            Visit::FollowUp3Year => "FU3Y",
            Visit::FollowUp4Year => "FU4Y",
            Visit::FollowUp5Year => "FU5Y",
            Visit::Unscheduled => "UV",
            Visit::Logs => "LOGS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Visit::Screening => "Baseline",
            Visit::Treatment => "Treatment",
            Visit::Discharge => "Discharge Visit",
            Visit::FollowUp30Day => "30-Day Follow Up",
            Visit::FollowUp3Month => "3-Month Follow Up (Remote)",
            Visit::FollowUp6Month => "6-Month Follow Up",
            Visit::FollowUp1Year => "1-Year Follow Up",
            Visit::FollowUp2Year => "2-Year Follow Up",
            Visit::FollowUp3Year => "3-Year Follow Up (Remote)",
            Visit::FollowUp4Year => "4-Year Follow Up",
            Visit::FollowUp5Year => "5-Year Follow Up (Remote)",
            Visit::Unscheduled => "Unscheduled",
            Visit::Logs => "Logs",
        }
    }

    pub fn kind(self) -> VisitKind {
        match self {
            Visit::FollowUp3Month | Visit::FollowUp3Year | Visit::FollowUp5Year => {
                VisitKind::Remote
            }
            Visit::Unscheduled => VisitKind::Unscheduled,
            Visit::Logs => VisitKind::Log,
            _ => VisitKind::OnSite,
        }
    }

    pub fn is_on_site(self) -> bool {
        self.kind() == VisitKind::OnSite
    }

    pub fn is_remote(self) -> bool {
        self.kind() == VisitKind::Remote
    }

    /// Follow-up visits are every scheduled visit after discharge.
    pub fn is_follow_up(self) -> bool {
        matches!(
            self,
            Visit::FollowUp30Day
                | Visit::FollowUp3Month
                | Visit::FollowUp6Month
                | Visit::FollowUp1Year
                | Visit::FollowUp2Year
                | Visit::FollowUp3Year
                | Visit::FollowUp4Year
                | Visit::FollowUp5Year
        )
    }

    /// Look up a visit by its column prefix (case-insensitive).
    pub fn from_prefix(prefix: &str) -> Option<Visit> {
        let upper = prefix.trim().to_uppercase();
        Visit::ALL
            .into_iter()
            .find(|visit| visit.prefix() == upper)
    }
}

impl fmt::Display for Visit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
