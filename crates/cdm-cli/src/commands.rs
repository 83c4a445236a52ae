use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};

use cdm_cli::pipeline::{Engine, JsonReport, write_json_report};
use cdm_model::{ConfidenceThresholds, EngineConfig, EngineOutput, SheetKind};

use crate::cli::{AnalyzeArgs, FieldsArgs, MatchArgs};
use crate::summary::{align_column, apply_table_style, dim_cell, header_cell};

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).context("load engine config"),
        None => Ok(EngineConfig::default()),
    }
}

pub fn run_analyze(args: &AnalyzeArgs) -> Result<EngineOutput> {
    let mut config = load_config(args.config.as_deref())?;
    config.ae = args.filters.apply(&config.ae);
    if let Some(as_of) = args.as_of {
        config.validation.as_of = Some(as_of);
    }

    let engine = Engine::new(config)?;
    let session = engine.load(&args.path)?;
    let output = engine.run(&session);
    if let Some(path) = &args.json {
        write_json_report(path, &JsonReport::new(&engine, &output))?;
    }
    Ok(output)
}

pub fn run_match(args: &MatchArgs) -> Result<()> {
    let engine = Engine::new(load_config(args.config.as_deref())?)?;
    let thresholds = ConfidenceThresholds::default();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Text"),
        header_cell("Term"),
        header_cell("Category"),
        header_cell("Kind"),
        header_cell("Confidence"),
        header_cell("Level"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    for text in &args.texts {
        match engine.classify(text, !args.no_boundary) {
            Some(hit) => {
                let category = hit
                    .category
                    .map_or_else(|| "-".to_string(), |category| format!("{category:?}"));
                table.add_row(vec![
                    Cell::new(text),
                    Cell::new(&hit.term),
                    Cell::new(category),
                    Cell::new(hit.kind.label()),
                    Cell::new(format!("{:.2}", hit.confidence)),
                    Cell::new(format!("{:?}", thresholds.categorize(hit.confidence))),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(text),
                    dim_cell("no match"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("0.00"),
                    dim_cell("-"),
                ]);
            }
        }
    }
    println!("Vocabulary: {}", engine.vocabulary().version().short());
    println!("{table}");
    Ok(())
}

pub fn run_fields(args: &FieldsArgs) -> Result<()> {
    let engine = Engine::new(EngineConfig::default())?;
    let sheet = args.sheet.map(SheetKind::from);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Field"),
        header_cell("Visit"),
        header_cell("Column"),
        header_cell("Form"),
        header_cell("Critical"),
        header_cell("Expected"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 5, CellAlignment::Center);
    align_column(&mut table, 6, CellAlignment::Center);
    let mut listed = 0usize;
    for entry in engine.registry().entries() {
        if sheet.is_some_and(|kind| kind != entry.sheet) {
            continue;
        }
        if args.expected && entry.gap_reason().is_none() {
            continue;
        }
        listed += 1;
        let visit = match entry.visit {
            Some(visit) => Cell::new(visit),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(entry.sheet),
            Cell::new(entry.key.field),
            visit,
            Cell::new(&entry.column),
            Cell::new(entry.spec.form),
            check_cell(entry.spec.critical),
            check_cell(entry.gap_reason().is_some()),
        ]);
    }
    println!("{table}");
    println!("{listed} columns");
    Ok(())
}

fn check_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓")
    } else {
        dim_cell("-")
    }
}
