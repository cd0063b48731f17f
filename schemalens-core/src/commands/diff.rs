//! Compare two schema snapshots and report the classified differences.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::classify::{ChangeStatus, OperationSet};
use crate::config::SchemaLensConfig;
use crate::deparser::deparse_migration;
use crate::diff::compute_operations;
use crate::diff_item::{build_schema_diff_items, SchemaDiffItem};
use crate::error::Result;
use crate::operation::Operation;
use crate::schema::{Schema, Table};

/// Report produced by the diff command.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// Operations transforming `before` into `after`.
    pub operations: Vec<Operation>,
    /// Classified entity and attribute changes.
    pub items: Vec<SchemaDiffItem>,
    /// Per-level change counts.
    pub summary: DiffSummary,
    /// Migration DDL, when enabled in the config.
    pub migration_sql: Option<String>,
    /// Fragments the migration DDL could not include.
    pub sql_errors: Vec<String>,
    /// Whether any differences were detected.
    pub has_changes: bool,
}

/// Change counts by entity level.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DiffSummary {
    pub tables_added: usize,
    pub tables_removed: usize,
    pub tables_modified: usize,
    pub columns_added: usize,
    pub columns_removed: usize,
    pub columns_modified: usize,
    pub indexes_changed: usize,
    pub constraints_changed: usize,
}

impl DiffSummary {
    /// Count entity-level statuses. Children of added or removed tables are
    /// covered by the table count.
    pub fn from_operations(before: &Schema, after: &Schema, operations: &OperationSet) -> Self {
        let mut summary = DiffSummary::default();

        for table_id in operations.touched_tables() {
            match operations.table_status(&table_id) {
                ChangeStatus::Added => {
                    summary.tables_added += 1;
                    continue;
                }
                ChangeStatus::Removed => {
                    summary.tables_removed += 1;
                    continue;
                }
                ChangeStatus::Modified => summary.tables_modified += 1,
                ChangeStatus::Unchanged => {}
            }

            let tables: Vec<&Table> = [before.tables.get(&table_id), after.tables.get(&table_id)]
                .into_iter()
                .flatten()
                .collect();

            for column_id in union_keys(tables.iter().map(|t| &t.columns)) {
                match operations.column_status(&table_id, &column_id) {
                    ChangeStatus::Added => summary.columns_added += 1,
                    ChangeStatus::Removed => summary.columns_removed += 1,
                    ChangeStatus::Modified => summary.columns_modified += 1,
                    ChangeStatus::Unchanged => {}
                }
            }
            summary.indexes_changed += union_keys(tables.iter().map(|t| &t.indexes))
                .iter()
                .filter(|id| operations.index_status(&table_id, id).is_changed())
                .count();
            summary.constraints_changed += union_keys(tables.iter().map(|t| &t.constraints))
                .iter()
                .filter(|id| operations.constraint_status(&table_id, id).is_changed())
                .count();
        }

        summary
    }

    pub fn total(&self) -> usize {
        self.tables_added
            + self.tables_removed
            + self.tables_modified
            + self.columns_added
            + self.columns_removed
            + self.columns_modified
            + self.indexes_changed
            + self.constraints_changed
    }
}

fn union_keys<'a, V: 'a>(maps: impl Iterator<Item = &'a IndexMap<String, V>>) -> IndexSet<String> {
    maps.flat_map(|map| map.keys().cloned()).collect()
}

/// Schema without the tables the config ignores.
fn without_ignored(schema: &Schema, ignore_tables: &[String]) -> Schema {
    let mut schema = schema.clone();
    schema.tables.retain(|name, _| !ignore_tables.contains(name));
    schema
}

/// Execute the diff command.
pub fn execute(config: &SchemaLensConfig, before: &Schema, after: &Schema) -> Result<DiffReport> {
    let ignore = &config.diff.ignore_tables;
    let before = without_ignored(before, ignore);
    let after = without_ignored(after, ignore);
    if !ignore.is_empty() {
        log::debug!("Ignoring tables: {}", ignore.join(", "));
    }

    let operations = compute_operations(&before, &after)?;
    let set = OperationSet::new(&operations);
    let items = build_schema_diff_items(&before, &after, &set);
    let summary = DiffSummary::from_operations(&before, &after, &set);

    let (migration_sql, sql_errors) = if config.diff.include_sql {
        let output = deparse_migration(&before, &after, &config.deparser)?;
        (Some(output.ddl), output.errors)
    } else {
        (None, Vec::new())
    };

    let has_changes = !operations.is_empty();
    log::info!(
        "Diff complete; operations={}, items={}, has_changes={}",
        operations.len(),
        items.len(),
        has_changes
    );

    Ok(DiffReport {
        operations,
        items,
        summary,
        migration_sql,
        sql_errors,
        has_changes,
    })
}
