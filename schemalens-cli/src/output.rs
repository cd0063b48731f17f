//! Terminal output formatting for all schemalens commands.
//! Uses comfy-table for tabular output and colored for
//! status-aware terminal styling.

use colored::{ColoredString, Colorize};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use schemalens_core::error::SchemaLensError;
use schemalens_core::{ApplyReport, ChangeStatus, DdlReport, DiffReport, MergeReport, ReplayReport, StatusReport};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    table
}

/// Return a colored string representation of a change status.
fn format_status(status: ChangeStatus) -> ColoredString {
    match status {
        ChangeStatus::Added => "added".green(),
        ChangeStatus::Removed => "removed".red(),
        ChangeStatus::Modified => "modified".yellow(),
        ChangeStatus::Unchanged => "unchanged".dimmed(),
    }
}

/// Print a diff report: classified items, a summary, and migration SQL.
pub fn print_diff_report(report: &DiffReport) {
    if !report.has_changes {
        println!("{}", "No schema differences detected.".green().bold());
        return;
    }

    println!(
        "{}",
        format!(
            "Found {} operation(s), {} classified change(s):",
            report.operations.len(),
            report.items.len()
        )
        .yellow()
        .bold()
    );

    let mut table = new_table(&["Status", "Kind", "Entity"]);
    for item in &report.items {
        table.add_row(vec![
            Cell::new(format_status(item.status)),
            Cell::new(item.kind),
            Cell::new(&item.target),
        ]);
    }
    println!("{table}");

    let s = &report.summary;
    println!(
        "Tables: {} added, {} removed, {} modified",
        s.tables_added.to_string().green(),
        s.tables_removed.to_string().red(),
        s.tables_modified.to_string().yellow()
    );
    println!(
        "Columns: {} added, {} removed, {} modified",
        s.columns_added.to_string().green(),
        s.columns_removed.to_string().red(),
        s.columns_modified.to_string().yellow()
    );
    println!(
        "Indexes changed: {}, constraints changed: {}",
        s.indexes_changed, s.constraints_changed
    );

    if let Some(ref sql) = report.migration_sql {
        if !sql.is_empty() {
            println!();
            println!("{}", "Migration SQL:".bold());
            println!("{}", sql.dimmed());
        }
    }
    print_fragment_errors(&report.sql_errors);
}

/// Print generated DDL followed by any fragments that failed.
pub fn print_ddl_report(report: &DdlReport) {
    if report.ddl.is_empty() && report.errors.is_empty() {
        println!("{}", "Nothing to generate.".green());
        return;
    }
    println!("{}", report.ddl);
    println!();
    println!(
        "{}",
        format!(
            "-- {} statement(s) for {} table(s)",
            report.statement_count, report.table_count
        )
        .dimmed()
    );
    print_fragment_errors(&report.errors);
}

fn print_fragment_errors(errors: &[String]) {
    for error in errors {
        eprintln!("{} {}", "SKIPPED:".yellow().bold(), error);
    }
}

/// Turn collected fragment errors into a command failure.
pub fn fail_on_errors(errors: &[String]) -> Result<(), SchemaLensError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(SchemaLensError::DeparseFailed {
        count: errors.len(),
        details: errors.join("; "),
    })
}

/// Print a merge report.
pub fn print_merge_report(report: &MergeReport) {
    println!(
        "{}",
        format!("Merged schema has {} table(s).", report.schema.tables.len())
            .green()
            .bold()
    );
    if report.retained_tables.is_empty() && report.retained_columns.is_empty() {
        return;
    }

    let mut table = new_table(&["Retained from before", "Level"]);
    for name in &report.retained_tables {
        table.add_row(vec![Cell::new(name), Cell::new("table")]);
    }
    for target in &report.retained_columns {
        table.add_row(vec![Cell::new(target), Cell::new("column")]);
    }
    println!("{table}");
}

/// Print an apply report.
pub fn print_apply_report(report: &ApplyReport) {
    println!(
        "{}",
        format!(
            "Applied {} operation(s); result has {} object(s).",
            report.operations_applied,
            report.schema.object_count()
        )
        .green()
        .bold()
    );
}

/// Print a status report.
pub fn print_status_report(report: &StatusReport) {
    match report.kind {
        Some(kind) => println!("{} ({}): {}", report.target, kind, format_status(report.status)),
        None => println!("{}: {}", report.target, format_status(report.status)),
    }
}

/// Print a replay report.
pub fn print_replay_report(report: &ReplayReport) {
    println!(
        "{}",
        format!(
            "Materialized '{}' at version {} ({} patch(es) applied)",
            report.building_schema_id, report.version, report.versions_applied
        )
        .green()
        .bold()
    );

    let mut table = new_table(&["Table", "Columns", "Indexes", "Constraints"]);
    for t in report.schema.tables.values() {
        table.add_row(vec![
            Cell::new(&t.name),
            Cell::new(t.columns.len()),
            Cell::new(t.indexes.len()),
            Cell::new(t.constraints.len()),
        ]);
    }
    println!("{table}");
}
