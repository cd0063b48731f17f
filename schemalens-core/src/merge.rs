//! Merged before/after view for diff rendering.

use indexmap::IndexSet;

use crate::error::{Result, SchemaLensError};
use crate::path::EntityTarget;
use crate::schema::Schema;

/// Combine `before` and `after` into one superset schema.
///
/// The result is `after` plus every table that exists only in `before` and,
/// for tables present on both sides, the columns that `after` dropped. The
/// classifier reports those retained entities as removed.
pub fn merge(before: &Schema, after: &Schema) -> Result<Schema> {
    let mut merged = after.clone();

    let table_ids: IndexSet<&String> = before.tables.keys().chain(after.tables.keys()).collect();
    for table_id in table_ids {
        match (before.tables.get(table_id), after.tables.get(table_id)) {
            (Some(old), Some(_)) => {
                let Some(current) = merged.tables.get_mut(table_id) else {
                    return Err(SchemaLensError::MergeFailed {
                        table: table_id.clone(),
                    });
                };
                for (column_id, column) in &old.columns {
                    if !current.columns.contains_key(column_id) {
                        current.columns.insert(column_id.clone(), column.clone());
                    }
                }
            }
            (Some(old), None) => {
                merged.tables.insert(table_id.clone(), old.clone());
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(SchemaLensError::MergeFailed {
                    table: table_id.clone(),
                })
            }
        }
    }

    Ok(merged)
}

/// Columns of tables present on both sides that only `before` still has.
pub fn retained_columns(before: &Schema, after: &Schema) -> Vec<EntityTarget> {
    before
        .tables
        .iter()
        .filter_map(|(table_id, old)| after.tables.get(table_id).map(|new| (table_id, old, new)))
        .flat_map(|(table_id, old, new)| {
            old.columns
                .keys()
                .filter(|column_id| !new.columns.contains_key(*column_id))
                .map(|column_id| EntityTarget::column(table_id, column_id))
                .collect::<Vec<_>>()
        })
        .collect()
}
