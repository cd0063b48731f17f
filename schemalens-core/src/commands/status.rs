//! Classify the change status of one entity or attribute between two schemas.

use serde::Serialize;

use crate::classify::{ChangeStatus, OperationSet};
use crate::diff::compute_operations;
use crate::error::{Result, SchemaLensError};
use crate::path::{EntityTarget, PathKind};
use crate::schema::Schema;

/// Report produced by the status command.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub target: EntityTarget,
    /// The queried path kind; `None` means the whole entity.
    pub kind: Option<PathKind>,
    pub status: ChangeStatus,
}

fn exists(schema: &Schema, target: &EntityTarget) -> bool {
    let Some(table) = schema.tables.get(&target.table_id) else {
        return false;
    };
    match (&target.column_id, &target.index_id, &target.constraint_id) {
        (Some(id), _, _) => table.columns.contains_key(id),
        (_, Some(id), _) => table.indexes.contains_key(id),
        (_, _, Some(id)) => table.constraints.contains_key(id),
        _ => true,
    }
}

/// Execute the status command.
pub fn execute(
    before: &Schema,
    after: &Schema,
    target: &EntityTarget,
    kind: Option<PathKind>,
) -> Result<StatusReport> {
    if !exists(before, target) && !exists(after, target) {
        return Err(SchemaLensError::UnknownTarget(target.to_string()));
    }
    if let Some(kind) = kind {
        if kind.level() != target.level() {
            return Err(SchemaLensError::UnknownTarget(format!(
                "{} has no '{}' attribute",
                target, kind
            )));
        }
    }

    let operations = compute_operations(before, after)?;
    let set = OperationSet::new(&operations);

    let status = match kind {
        Some(kind) => set.status(target, kind),
        None => match (&target.column_id, &target.index_id, &target.constraint_id) {
            (Some(column), _, _) => set.column_status(&target.table_id, column),
            (_, Some(index), _) => set.index_status(&target.table_id, index),
            (_, _, Some(constraint)) => set.constraint_status(&target.table_id, constraint),
            _ => set.table_status(&target.table_id),
        },
    };

    log::debug!("Status of {} ({:?}): {}", target, kind, status);
    Ok(StatusReport {
        target: target.clone(),
        kind,
        status,
    })
}
