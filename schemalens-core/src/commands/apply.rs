//! Apply a stored patch to a schema.

use serde::Serialize;

use crate::error::Result;
use crate::operation::Operation;
use crate::patch::apply_patch;
use crate::schema::Schema;

/// Report produced by the apply command.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    pub schema: Schema,
    pub operations_applied: usize,
}

/// Execute the apply command.
pub fn execute(schema: &Schema, operations: &[Operation]) -> Result<ApplyReport> {
    let patched = apply_patch(schema, operations)?;
    log::info!("Applied {} operation(s)", operations.len());
    Ok(ApplyReport {
        schema: patched,
        operations_applied: operations.len(),
    })
}
