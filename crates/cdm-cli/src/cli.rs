//! CLI argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use cdm_model::{AeFilters, SheetKind};

#[derive(Parser)]
#[command(
    name = "cdm",
    version,
    about = "Clinical data event extraction - adverse events, HF hospitalizations, data checks",
    long_about = "Extract adverse events and heart-failure hospitalizations from a wide \
                  clinical-trial export.\n\n\
                  The export is a directory of CSV files, one per workbook sheet (Main, AE \
                  log, CVH log), or a single CSV read as the Main sheet."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient identifiers and cell values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the engine over a workbook export and print the results.
    Analyze(AnalyzeArgs),

    /// Classify free text against the HF vocabulary.
    Match(MatchArgs),

    /// List the columns the registry knows.
    Fields(FieldsArgs),
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Directory of per-sheet CSV exports, or a single CSV file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Engine configuration file (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long = "json", value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Reference date for "future" checks (default: today).
    #[arg(long = "as-of", value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Print every validation issue, not only the per-rule counts.
    #[arg(long = "issues")]
    pub issues: bool,
}

/// AE summary filters. Flags add to the config file's `[ae]` section.
#[derive(Args, Default)]
pub struct FilterArgs {
    /// Summarize serious events only.
    #[arg(long = "serious-only")]
    pub serious_only: bool,

    /// Summarize events related to any device component only.
    #[arg(long = "device-related-only")]
    pub device_related_only: bool,

    /// Drop events with onset before the procedure date.
    #[arg(long = "exclude-pre-procedure")]
    pub exclude_pre_procedure: bool,

    /// Drop patients whose status is a screen failure.
    #[arg(long = "exclude-screen-failures")]
    pub exclude_screen_failures: bool,

    /// Keep events with onset on or before this date.
    #[arg(long = "onset-cutoff", value_name = "YYYY-MM-DD")]
    pub onset_cutoff: Option<NaiveDate>,

    /// Keep events reported on or before this date.
    #[arg(long = "report-cutoff", value_name = "YYYY-MM-DD")]
    pub report_cutoff: Option<NaiveDate>,
}

impl FilterArgs {
    /// Merge the flags over `base`; a flag never turns a configured filter off.
    pub fn apply(&self, base: &AeFilters) -> AeFilters {
        AeFilters {
            serious_only: base.serious_only || self.serious_only,
            device_related_only: base.device_related_only || self.device_related_only,
            exclude_pre_procedure: base.exclude_pre_procedure || self.exclude_pre_procedure,
            exclude_screen_failures: base.exclude_screen_failures || self.exclude_screen_failures,
            onset_cutoff: self.onset_cutoff.or(base.onset_cutoff),
            report_cutoff: self.report_cutoff.or(base.report_cutoff),
        }
    }
}

#[derive(Parser)]
pub struct MatchArgs {
    /// Text to classify; each argument is classified separately.
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,

    /// Engine configuration file (TOML) with custom terms and threshold.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Allow vocabulary terms to match inside longer words.
    #[arg(long = "no-boundary")]
    pub no_boundary: bool,
}

#[derive(Parser)]
pub struct FieldsArgs {
    /// Only list columns of this sheet.
    #[arg(long = "sheet", value_enum)]
    pub sheet: Option<SheetArg>,

    /// Only list fields expected for gap analysis.
    #[arg(long = "expected")]
    pub expected: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SheetArg {
    Main,
    Ae,
    Cvh,
}

impl From<SheetArg> for SheetKind {
    fn from(arg: SheetArg) -> Self {
        match arg {
            SheetArg::Main => SheetKind::Main,
            SheetArg::Ae => SheetKind::AeLog,
            SheetArg::Cvh => SheetKind::CvhLog,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_merge_over_configured_filters() {
        let base = AeFilters {
            exclude_pre_procedure: true,
            onset_cutoff: NaiveDate::from_ymd_opt(2024, 12, 31),
            ..AeFilters::default()
        };
        let flags = FilterArgs {
            serious_only: true,
            onset_cutoff: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..FilterArgs::default()
        };
        let merged = flags.apply(&base);
        assert!(merged.serious_only);
        assert!(merged.exclude_pre_procedure);
        assert!(!merged.device_related_only);
        assert_eq!(merged.onset_cutoff, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn cli_parses_analyze_with_filters() {
        let cli = Cli::try_parse_from([
            "cdm",
            "analyze",
            "exports",
            "--as-of",
            "2025-01-31",
            "--serious-only",
            "--json",
            "report.json",
        ])
        .expect("parse args");
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert!(args.filters.serious_only);
        assert_eq!(args.json, Some(PathBuf::from("report.json")));
    }
}
