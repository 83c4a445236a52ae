//! Engine configuration.
//!
//! Every value has a default, so an empty (or absent) config file yields
//! the standard behavior. Files are TOML:
//!
//! ```toml
//! [matcher]
//! threshold = 0.85
//! include = ["diuretic resistance"]
//! exclude = ["pericardial effusion"]
//!
//! [hf]
//! pre_treatment_days = 365
//!
//! [ae]
//! exclude_pre_procedure = true
//!
//! [validation]
//! future_tolerance_days = 30
//! as_of = "2025-06-30"
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub hf: HfConfig,
    pub ae: AeFilters,
    pub validation: ValidationConfig,
    pub gaps: GapConfig,
}

/// Upper bound for every day-count setting.
pub const MAX_DAYS: i64 = 36_500;

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use. Day counts are capped at a century.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.matcher.threshold) {
            return Err(ConfigError::Invalid {
                key: "matcher.threshold",
                message: format!("{} is outside 0.0..=1.0", self.matcher.threshold),
            });
        }
        for (key, days) in [
            ("hf.pre_treatment_days", self.hf.pre_treatment_days),
            ("hf.post_treatment_days", self.hf.post_treatment_days),
            ("hf.short_window_days", self.hf.short_window_days),
            (
                "validation.future_tolerance_days",
                self.validation.future_tolerance_days,
            ),
        ] {
            if !(0..=MAX_DAYS).contains(&days) {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("{days} is outside 0..={MAX_DAYS}"),
                });
            }
        }
        Ok(())
    }
}

/// Free-text term matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    /// Minimum approximate similarity to accept a match (0.0 to 1.0).
    pub threshold: f64,
    /// Extra terms always treated as HF-related.
    pub include: Vec<String>,
    /// Extra terms that veto a match.
    pub exclude: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// HF hospitalization windows around the treatment date, in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HfConfig {
    pub pre_treatment_days: i64,
    pub post_treatment_days: i64,
    /// Short window used for the six-month counts.
    pub short_window_days: i64,
}

impl Default for HfConfig {
    fn default() -> Self {
        Self {
            pre_treatment_days: 365,
            post_treatment_days: 365 * 5,
            short_window_days: 183,
        }
    }
}

/// Filters applied before summarizing adverse events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AeFilters {
    pub serious_only: bool,
    pub device_related_only: bool,
    pub exclude_pre_procedure: bool,
    pub exclude_screen_failures: bool,
    /// Keep events with onset on or before this date.
    pub onset_cutoff: Option<NaiveDate>,
    /// Keep events reported on or before this date.
    pub report_cutoff: Option<NaiveDate>,
}

impl AeFilters {
    pub fn is_empty(&self) -> bool {
        *self == AeFilters::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Days past the as-of date an AE onset may fall before it is implausible.
    pub future_tolerance_days: i64,
    /// Reference date for "future" checks; today when unset.
    pub as_of: Option<NaiveDate>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            future_tolerance_days: 30,
            as_of: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GapConfig {
    /// Skip visits that have no recorded visit date.
    pub hide_future_visits: bool,
    pub exclude_screen_failures: bool,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            hide_future_visits: true,
            exclude_screen_failures: true,
        }
    }
}
