use std::collections::BTreeMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use cdm_model::{
    EngineOutput, FieldId, IssueSeverity, RuleId, Stat, SummaryStats, ValidationIssue,
};
use cdm_validate::gap_counts;

pub fn print_summary(output: &EngineOutput, show_issues: bool) {
    println!("Source: {}", output.source);
    println!("Patients: {}", output.patients);
    println!(
        "Adverse events: {} | HF hospitalizations: {}",
        output.adverse_events.len(),
        output.hf_events.len()
    );
    println!();
    print_ae_table(&output.summary);
    print_top_terms(&output.summary);
    print_hf_table(output);
    print_gap_table(output);
    print_rule_table(output);
    if show_issues {
        print_issue_table(&output.report.issues);
    }
    if !output.summary.skipped_filters.is_empty() {
        eprintln!("Filters not applied:");
        for skipped in &output.summary.skipped_filters {
            eprintln!("- {} (missing: {})", skipped.filter, field_list(&skipped.missing));
        }
    }
}

fn print_ae_table(summary: &SummaryStats) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Adverse events"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Events"), Cell::new(summary.total_events)]);
    table.add_row(vec![
        Cell::new("Patients with events"),
        Cell::new(summary.patients_with_events),
    ]);
    for (label, stat) in [
        ("Serious", &summary.serious),
        ("Fatal", &summary.fatal),
        ("Ongoing", &summary.ongoing),
        ("Device related", &summary.device_related),
        ("Procedure related", &summary.procedure_related),
        ("Pre-procedure onset", &summary.pre_procedure),
    ] {
        table.add_row(vec![Cell::new(label), stat_cell(stat)]);
    }
    if let Some(criteria) = summary.sae_criteria.value() {
        for (criterion, count) in criteria {
            table.add_row(vec![
                dim_cell(format!("  SAE: {criterion}")),
                count_cell(*count, Color::Yellow),
            ]);
        }
    }
    if let Some(outcomes) = summary.outcome_distribution.value() {
        for (outcome, count) in outcomes {
            table.add_row(vec![
                dim_cell(format!("  Outcome: {outcome}")),
                Cell::new(count),
            ]);
        }
    }
    println!("{table}");

    if let Some(rows) = summary.relatedness.value() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Component"),
            header_cell("Related"),
            header_cell("Probable"),
            header_cell("Possible"),
            header_cell("Unlikely"),
            header_cell("Not related"),
            header_cell("Blank"),
            header_cell("Other"),
        ]);
        apply_table_style(&mut table);
        for index in 1..8 {
            align_column(&mut table, index, CellAlignment::Right);
        }
        for row in rows {
            table.add_row(vec![
                Cell::new(&row.component).add_attribute(Attribute::Bold),
                count_cell(row.related, Color::Red),
                count_cell(row.probable, Color::Red),
                count_cell(row.possible, Color::Yellow),
                Cell::new(row.unlikely),
                Cell::new(row.not_related),
                dim_cell(row.blank),
                dim_cell(row.other),
            ]);
        }
        println!("{table}");
    }
}

fn print_top_terms(summary: &SummaryStats) {
    if summary.top_terms.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Top terms"), header_cell("Events")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for term in &summary.top_terms {
        table.add_row(vec![Cell::new(&term.term), Cell::new(term.count)]);
    }
    println!("{table}");
}

fn print_hf_table(output: &EngineOutput) {
    let with_events: Vec<_> = output
        .hf_summaries
        .iter()
        .filter(|summary| {
            output
                .hf_events
                .iter()
                .any(|event| event.patient == summary.patient)
        })
        .collect();
    if with_events.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Patient"),
        header_cell("Treatment"),
        header_cell("Pre 6m"),
        header_cell("Pre 1y"),
        header_cell("Post 6m"),
        header_cell("Post 1y"),
        header_cell("Undated"),
    ]);
    apply_table_style(&mut table);
    for index in 2..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for summary in with_events {
        let treatment = match summary.treatment_date {
            Some(date) => Cell::new(date),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            patient_cell(summary.patient.subject()),
            treatment,
            count_cell(summary.pre_count_6m, Color::Yellow),
            count_cell(summary.pre_count_1y, Color::Yellow),
            count_cell(summary.post_count_6m, Color::Red),
            count_cell(summary.post_count_1y, Color::Red),
            dim_cell(summary.undated),
        ]);
    }
    println!();
    println!("HF hospitalizations:");
    println!("{table}");
}

fn print_gap_table(output: &EngineOutput) {
    let counts = gap_counts(&output.gaps);
    if counts.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Patient"),
        header_cell("Expected"),
        header_cell("Missing"),
        header_cell("Excused"),
    ]);
    apply_table_style(&mut table);
    for index in 1..4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_missing = 0usize;
    for (patient, count) in &counts {
        total_missing += count.missing;
        table.add_row(vec![
            patient_cell(patient.subject()),
            Cell::new(count.expected),
            count_cell(count.missing, Color::Yellow),
            dim_cell(count.excused),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(output.gaps.len()).add_attribute(Attribute::Bold),
        count_cell(total_missing, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!();
    println!("Missing expected data:");
    println!("{table}");
}

fn print_rule_table(output: &EngineOutput) {
    let mut counts: BTreeMap<(IssueSeverity, RuleId), usize> = BTreeMap::new();
    for issue in &output.report.issues {
        *counts.entry((issue.severity, issue.rule)).or_default() += 1;
    }
    if counts.is_empty() {
        println!();
        println!("No validation issues.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Rule"),
        header_cell("Count"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    // Most severe first.
    for ((severity, rule), count) in counts.into_iter().rev() {
        table.add_row(vec![
            severity_cell(severity),
            Cell::new(rule.code()),
            Cell::new(format!("{rule:?}")),
            Cell::new(count).fg(severity_color(severity)),
        ]);
    }
    println!();
    println!(
        "Validation: {} fatal, {} warnings, {} info",
        output.report.fatal_count(),
        output.report.warning_count(),
        output.report.info_count()
    );
    println!("{table}");
}

fn print_issue_table(issues: &[ValidationIssue]) {
    if issues.is_empty() {
        return;
    }
    let mut ordered: Vec<&ValidationIssue> = issues.iter().collect();
    ordered.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.patient.cmp(&b.patient))
            .then_with(|| a.rule.cmp(&b.rule))
    });
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Patient"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for issue in ordered {
        let patient = match &issue.patient {
            Some(patient) => patient_cell(patient.subject()),
            None => dim_cell(issue.sheet.as_deref().unwrap_or("-")),
        };
        let field = match issue.fields.first() {
            Some(field) => Cell::new(field.column.as_deref().unwrap_or(field.field.as_str())),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.rule.code()),
            patient,
            field,
            Cell::new(&issue.message),
        ]);
    }
    println!();
    println!("Issues:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::LowerBoundary(Width::Percentage(40)),
        ]);
    }
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn stat_cell(stat: &Stat<usize>) -> Cell {
    match stat {
        Stat::Available { value } => Cell::new(value),
        Stat::Unavailable { missing } => {
            dim_cell(format!("n/a (missing {})", field_list(missing)))
        }
    }
}

fn field_list(fields: &[FieldId]) -> String {
    fields
        .iter()
        .copied()
        .map(FieldId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Fatal => Cell::new("FATAL")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
        IssueSeverity::Info => Cell::new("INFO").fg(Color::Blue),
    }
}

fn severity_color(severity: IssueSeverity) -> Color {
    match severity {
        IssueSeverity::Fatal => Color::Red,
        IssueSeverity::Warning => Color::Yellow,
        IssueSeverity::Info => Color::Blue,
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn patient_cell(subject: &str) -> Cell {
    Cell::new(subject)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
