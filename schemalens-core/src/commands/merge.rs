//! Build the merged before/after view used for rendering a diff.

use serde::Serialize;

use crate::error::Result;
use crate::merge::{merge, retained_columns};
use crate::path::EntityTarget;
use crate::schema::Schema;

/// Report produced by the merge command.
#[derive(Debug, Serialize)]
pub struct MergeReport {
    /// `after` plus the entities only `before` has.
    pub schema: Schema,
    /// Columns kept from `before` in tables present on both sides.
    pub retained_columns: Vec<EntityTarget>,
    /// Tables kept from `before`.
    pub retained_tables: Vec<String>,
}

/// Execute the merge command.
pub fn execute(before: &Schema, after: &Schema) -> Result<MergeReport> {
    let schema = merge(before, after)?;
    let retained_tables: Vec<String> = before
        .tables
        .keys()
        .filter(|id| !after.tables.contains_key(*id))
        .cloned()
        .collect();
    let retained_columns = retained_columns(before, after);

    log::info!(
        "Merged schemas; tables={}, retained_tables={}, retained_columns={}",
        schema.tables.len(),
        retained_tables.len(),
        retained_columns.len()
    );

    Ok(MergeReport {
        schema,
        retained_columns,
        retained_tables,
    })
}
