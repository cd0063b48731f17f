//! Structural diff between two schema snapshots.
//!
//! Both schemas are lowered to their JSON document form and compared key by
//! key. The result is a JSON-Patch style operation list that transforms
//! `before` into `after`, restricted to the recognized path vocabulary.

use serde_json::Value;

use crate::error::Result;
use crate::operation::{escape_token, Operation};
use crate::path::{is_recognized, PathDescriptor, PathKind};
use crate::schema::Schema;

/// Compute the ordered operations that transform `before` into `after`.
///
/// Tables are visited in mapping order, and within each table the name,
/// comment, columns, indexes, and constraints in turn. Operations outside
/// the table/column/index/constraint vocabulary are dropped.
pub fn compute_operations(before: &Schema, after: &Schema) -> Result<Vec<Operation>> {
    let raw = compute_document_operations(before, after)?;
    let total = raw.len();
    let operations: Vec<Operation> = raw
        .into_iter()
        .filter(|op| is_recognized(op.path()))
        .collect();

    if operations.len() != total {
        log::debug!(
            "Dropped {} operation(s) outside the recognized path vocabulary",
            total - operations.len()
        );
    }
    Ok(operations)
}

/// Operations over the whole document, enums and extensions included.
///
/// Applying the result to `before` always yields `after`.
pub fn compute_document_operations(before: &Schema, after: &Schema) -> Result<Vec<Operation>> {
    let before_doc = serde_json::to_value(before)?;
    let after_doc = serde_json::to_value(after)?;

    let mut ops = Vec::new();
    compare(&before_doc, &after_doc, "", &mut ops);
    Ok(ops)
}

fn compare(before: &Value, after: &Value, path: &str, ops: &mut Vec<Operation>) {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            if is_constraint_kind_change(path, before, after) {
                ops.push(Operation::replace(path, after.clone()));
                return;
            }
            for (key, bv) in b {
                let child = format!("{}/{}", path, escape_token(key));
                match a.get(key) {
                    Some(av) => compare(bv, av, &child, ops),
                    None => ops.push(Operation::remove(child)),
                }
            }
            for (key, av) in a {
                if !b.contains_key(key) {
                    let child = format!("{}/{}", path, escape_token(key));
                    ops.push(Operation::add(child, av.clone()));
                }
            }
        }
        (Value::Array(b), Value::Array(a)) => {
            let shared = b.len().min(a.len());
            for i in 0..shared {
                compare(&b[i], &a[i], &format!("{}/{}", path, i), ops);
            }
            // Highest index first so each removal leaves earlier indices valid
            for i in (shared..b.len()).rev() {
                ops.push(Operation::remove(format!("{}/{}", path, i)));
            }
            for (i, av) in a.iter().enumerate().skip(shared) {
                ops.push(Operation::add(format!("{}/{}", path, i), av.clone()));
            }
        }
        _ => {
            if before != after {
                ops.push(Operation::replace(path, after.clone()));
            }
        }
    }
}

/// A constraint whose `type` tag changed is replaced whole: a field-by-field
/// patch across variants would not replay into a well-typed constraint.
fn is_constraint_kind_change(path: &str, before: &Value, after: &Value) -> bool {
    if before.get("type") == after.get("type") {
        return false;
    }
    matches!(
        PathDescriptor::parse(path),
        Some(PathDescriptor {
            kind: PathKind::Constraint,
            ..
        })
    )
}
