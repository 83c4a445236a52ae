//! Engine run with explicit stages.
//!
//! The stages run in order over one loaded session:
//! 1. **Load**: read the sheet exports and resolve columns
//! 2. **Detect**: adverse events and HF hospitalizations per patient
//! 3. **Summarize**: filtered AE statistics
//! 4. **Validate**: schema issues plus cross-form rules
//! 5. **Gaps**: expected fields left blank at visits that took place
//!
//! Nothing is cached between runs; a reload produces a new session and the
//! whole output is derived again.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, info_span};

use cdm_detect::{AeDetector, HfDetector, procedure_date, summarize};
use cdm_match::{TermMatch, TermMatcher, Vocabulary};
use cdm_model::{
    AdverseEvent, EngineConfig, EngineOutput, HfHospitalizationEvent, HfPatientSummary,
    PatientRecord, Session, ValidationReport,
};
use cdm_registry::ColumnRegistry;
use cdm_validate::{CrossFormValidator, GapAnalyzer};

use crate::logging::redact_value;

/// Long-lived engine inputs shared by every run.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registry: ColumnRegistry,
    vocabulary: Vocabulary,
    matcher: TermMatcher,
}

impl Engine {
    /// Build the registry and the configured vocabulary.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().context("validate engine config")?;
        let vocabulary =
            Vocabulary::with_config(&config.matcher).context("build term vocabulary")?;
        info!(
            vocabulary = vocabulary.version().short(),
            terms = vocabulary.terms().len(),
            "engine ready"
        );
        Ok(Self {
            config,
            registry: ColumnRegistry::standard(),
            vocabulary,
            matcher: TermMatcher::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn load(&self, path: &Path) -> Result<Session> {
        load(path, &self.registry)
    }

    pub fn run(&self, session: &Session) -> EngineOutput {
        run_engine(
            session,
            &self.config,
            &self.registry,
            &self.vocabulary,
            &self.matcher,
        )
    }

    /// Classify free text against the configured vocabulary.
    pub fn classify(&self, text: &str, boundary_mode: bool) -> Option<TermMatch> {
        self.matcher.classify(text, &self.vocabulary, boundary_mode)
    }
}

// ============================================================================
// Stage 1: Load
// ============================================================================

/// Load a workbook export into a new session.
pub fn load(path: &Path, registry: &ColumnRegistry) -> Result<Session> {
    let span = info_span!("load", source = %path.display());
    let _guard = span.enter();
    let start = Instant::now();
    let session = cdm_ingest::load_session(path, registry)
        .with_context(|| format!("load workbook {}", path.display()))?;
    info!(
        patients = session.patient_count(),
        schema_issues = session.schema_issues.len(),
        duration_ms = start.elapsed().as_millis(),
        "load complete"
    );
    Ok(session)
}

// ============================================================================
// Stage 2: Detect
// ============================================================================

/// Adverse events for every patient, in patient then AE log order.
pub fn detect_adverse_events(records: &[PatientRecord]) -> Vec<AdverseEvent> {
    let detector = AeDetector::new();
    let mut events = Vec::new();
    for record in records {
        let patient_events = detector.extract(record, procedure_date(record));
        debug!(
            patient = redact_value(record.id().subject()),
            events = patient_events.len(),
            "patient adverse events"
        );
        events.extend(patient_events);
    }
    events
}

/// HF hospitalizations and per-patient window counts.
#[derive(Debug, Default)]
pub struct HfDetection {
    pub events: Vec<HfHospitalizationEvent>,
    pub summaries: Vec<HfPatientSummary>,
}

pub fn detect_hf_hospitalizations(
    records: &[PatientRecord],
    config: &EngineConfig,
    vocabulary: &Vocabulary,
    matcher: &TermMatcher,
) -> HfDetection {
    let detector = HfDetector::new(vocabulary, matcher, &config.hf);
    let mut detection = HfDetection::default();
    for record in records {
        let events = detector.extract(record);
        debug!(
            patient = redact_value(record.id().subject()),
            events = events.len(),
            "patient HF hospitalizations"
        );
        detection
            .summaries
            .push(detector.summarize_patient(record, &events));
        detection.events.extend(events);
    }
    detection
}

// ============================================================================
// Stage 4: Validate
// ============================================================================

/// Schema issues from loading, followed by the cross-form findings.
pub fn validate(session: &Session, config: &EngineConfig) -> ValidationReport {
    let mut report = ValidationReport::new(session.schema_issues.clone());
    let cross_form = CrossFormValidator::new(&config.validation).validate(&session.records);
    report.extend(cross_form.issues);
    report
}

// ============================================================================
// Engine
// ============================================================================

/// Derive every output for `session`.
pub fn run_engine(
    session: &Session,
    config: &EngineConfig,
    registry: &ColumnRegistry,
    vocabulary: &Vocabulary,
    matcher: &TermMatcher,
) -> EngineOutput {
    let span = info_span!("engine", source = %session.source);
    let _guard = span.enter();
    let start = Instant::now();
    let records = &session.records;

    let adverse_events = detect_adverse_events(records);
    let hf = detect_hf_hospitalizations(records, config, vocabulary, matcher);
    info!(
        adverse_events = adverse_events.len(),
        hf_events = hf.events.len(),
        "detection complete"
    );

    let summary = summarize(&adverse_events, records, &session.mapping, &config.ae);

    let report = validate(session, config);
    info!(
        fatal = report.fatal_count(),
        warnings = report.warning_count(),
        info = report.info_count(),
        "validation complete"
    );

    let gaps = GapAnalyzer::new(registry, &session.mapping, &config.gaps).analyze(records);

    let output = EngineOutput {
        source: session.source.clone(),
        patients: session.patient_count(),
        adverse_events,
        hf_events: hf.events,
        hf_summaries: hf.summaries,
        report,
        gaps,
        summary,
    };
    info!(
        duration_ms = start.elapsed().as_millis(),
        unsatisfied_gaps = output.unsatisfied_gaps(),
        "engine run complete"
    );
    output
}

// ============================================================================
// Report
// ============================================================================

/// JSON report: the engine output plus what produced it.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub vocabulary_version: &'a str,
    pub config: &'a EngineConfig,
    #[serde(flatten)]
    pub output: &'a EngineOutput,
}

impl<'a> JsonReport<'a> {
    pub fn new(engine: &'a Engine, output: &'a EngineOutput) -> Self {
        Self {
            vocabulary_version: engine.vocabulary.version().as_str(),
            config: &engine.config,
            output,
        }
    }
}

pub fn write_json_report(path: &Path, report: &JsonReport<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("write JSON report {}", path.display()))?;
    info!(path = %path.display(), "JSON report written");
    Ok(())
}
