//! Classified diff items for rendering and reporting.
//!
//! Every (entity, path kind) pair across the union of both schemas is
//! classified against the operation set; items with a change are emitted
//! together with the value they describe.

use indexmap::IndexSet;

use serde::Serialize;

use crate::classify::{ChangeStatus, OperationSet};
use crate::diff::compute_operations;
use crate::error::Result;
use crate::path::{EntityTarget, PathKind};
use crate::schema::{Column, Constraint, ForeignKeyAction, Index, Schema, Table};

/// Value carried by a diff item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiffValue {
    Table(Table),
    Column(Column),
    Index(Index),
    Constraint(Constraint),
    Text(String),
    OptionalText(Option<String>),
    Flag(bool),
    Names(Vec<String>),
    Action(ForeignKeyAction),
}

/// One classified change to an entity or one of its attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiffItem {
    pub kind: PathKind,
    pub status: ChangeStatus,
    #[serde(flatten)]
    pub target: EntityTarget,
    pub data: DiffValue,
}

impl std::fmt::Display for SchemaDiffItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.status, self.kind, self.target)
    }
}

/// Diff two schemas and classify the result.
pub fn build_schema_diff(before: &Schema, after: &Schema) -> Result<Vec<SchemaDiffItem>> {
    let operations = compute_operations(before, after)?;
    let set = OperationSet::new(&operations);
    Ok(build_schema_diff_items(before, after, &set))
}

/// Classify every entity of `before` ∪ `after` against `operations`.
pub fn build_schema_diff_items(
    before: &Schema,
    after: &Schema,
    operations: &OperationSet,
) -> Vec<SchemaDiffItem> {
    let mut items = Vec::new();
    let table_ids: IndexSet<&String> = before.tables.keys().chain(after.tables.keys()).collect();

    for table_id in table_ids {
        let sides = Sides {
            before: before.tables.get(table_id),
            after: after.tables.get(table_id),
        };
        let target = EntityTarget::table(table_id);

        for kind in std::iter::once(PathKind::Table).chain(PathKind::TABLE_ATTRIBUTES) {
            push_item(&mut items, operations, &target, kind, |status| {
                sides.pick(status).map(|t| table_value(t, kind))
            });
        }

        for column_id in sides.keys(|t| t.columns.keys()) {
            let target = EntityTarget::column(table_id, column_id);
            for kind in std::iter::once(PathKind::Column).chain(PathKind::COLUMN_ATTRIBUTES) {
                push_item(&mut items, operations, &target, kind, |status| {
                    sides
                        .pick_with(status, |t| t.columns.contains_key(column_id))
                        .and_then(|t| column_value(t, column_id, kind))
                });
            }
        }

        for index_id in sides.keys(|t| t.indexes.keys()) {
            let target = EntityTarget::index(table_id, index_id);
            for kind in std::iter::once(PathKind::Index).chain(PathKind::INDEX_ATTRIBUTES) {
                push_item(&mut items, operations, &target, kind, |status| {
                    sides
                        .pick_with(status, |t| t.indexes.contains_key(index_id))
                        .and_then(|t| t.indexes.get(index_id))
                        .map(|index| index_value(index, kind))
                });
            }
        }

        for constraint_id in sides.keys(|t| t.constraints.keys()) {
            let target = EntityTarget::constraint(table_id, constraint_id);
            for kind in std::iter::once(PathKind::Constraint).chain(PathKind::CONSTRAINT_ATTRIBUTES) {
                push_item(&mut items, operations, &target, kind, |status| {
                    sides
                        .pick_with(status, |t| t.constraints.contains_key(constraint_id))
                        .and_then(|t| t.constraints.get(constraint_id))
                        .and_then(|c| constraint_value(c, kind))
                });
            }
        }
    }

    log::debug!("Built {} diff item(s)", items.len());
    items
}

fn push_item(
    items: &mut Vec<SchemaDiffItem>,
    operations: &OperationSet,
    target: &EntityTarget,
    kind: PathKind,
    data: impl FnOnce(ChangeStatus) -> Option<DiffValue>,
) {
    let status = operations.status(target, kind);
    if !status.is_changed() {
        return;
    }
    match data(status) {
        Some(data) => items.push(SchemaDiffItem {
            kind,
            status,
            target: target.clone(),
            data,
        }),
        None => log::warn!("No data for {} {} ({}); item skipped", status, kind, target),
    }
}

/// The two versions of one table.
struct Sides<'a> {
    before: Option<&'a Table>,
    after: Option<&'a Table>,
}

impl<'a> Sides<'a> {
    /// `before` for removals, `after` otherwise, falling back to the other side.
    fn pick(&self, status: ChangeStatus) -> Option<&'a Table> {
        self.pick_with(status, |_| true)
    }

    fn pick_with(&self, status: ChangeStatus, has: impl Fn(&Table) -> bool) -> Option<&'a Table> {
        let (first, second) = if status == ChangeStatus::Removed {
            (self.before, self.after)
        } else {
            (self.after, self.before)
        };
        first.filter(|t| has(*t)).or(second.filter(|t| has(*t)))
    }

    fn keys<I>(&self, keys: impl Fn(&'a Table) -> I) -> IndexSet<&'a String>
    where
        I: Iterator<Item = &'a String>,
    {
        self.before
            .into_iter()
            .chain(self.after)
            .flat_map(keys)
            .collect()
    }
}

fn table_value(table: &Table, kind: PathKind) -> DiffValue {
    match kind {
        PathKind::TableName => DiffValue::Text(table.name.clone()),
        PathKind::TableComment => DiffValue::OptionalText(table.comment.clone()),
        _ => DiffValue::Table(table.clone()),
    }
}

fn column_value(table: &Table, column_id: &str, kind: PathKind) -> Option<DiffValue> {
    let column = table.columns.get(column_id)?;
    let value = match kind {
        PathKind::ColumnName => DiffValue::Text(column.name.clone()),
        PathKind::ColumnComment => DiffValue::OptionalText(column.comment.clone()),
        PathKind::ColumnCheck => DiffValue::OptionalText(column.check.clone()),
        PathKind::ColumnUnique => DiffValue::Flag(table.is_unique_column(column_id)),
        PathKind::ColumnNotNull => DiffValue::Flag(column.not_null),
        PathKind::ColumnPrimary => DiffValue::Flag(table.is_primary_key_column(column_id)),
        PathKind::ColumnType => DiffValue::Text(column.data_type.clone()),
        PathKind::ColumnDefault => DiffValue::OptionalText(column.default.clone()),
        _ => DiffValue::Column(column.clone()),
    };
    Some(value)
}

fn index_value(index: &Index, kind: PathKind) -> DiffValue {
    match kind {
        PathKind::IndexName => DiffValue::Text(index.name.clone()),
        PathKind::IndexUnique => DiffValue::Flag(index.unique),
        PathKind::IndexColumns => DiffValue::Names(index.columns.clone()),
        PathKind::IndexType => DiffValue::Text(index.index_type.clone()),
        _ => DiffValue::Index(index.clone()),
    }
}

/// `None` when the constraint variant has no such attribute.
fn constraint_value(constraint: &Constraint, kind: PathKind) -> Option<DiffValue> {
    let value = match (kind, constraint) {
        (PathKind::ConstraintName, c) => DiffValue::Text(c.name().to_string()),
        (PathKind::ConstraintColumnName, Constraint::Check(_)) => return None,
        (PathKind::ConstraintColumnName, c) => DiffValue::Names(c.column_names().to_vec()),
        (PathKind::ConstraintTargetTableName, Constraint::ForeignKey(fk)) => {
            DiffValue::Text(fk.target_table_name.clone())
        }
        (PathKind::ConstraintTargetColumnName, Constraint::ForeignKey(fk)) => {
            DiffValue::Names(fk.target_column_names.clone())
        }
        (PathKind::ConstraintUpdateConstraint, Constraint::ForeignKey(fk)) => {
            DiffValue::Action(fk.update_constraint)
        }
        (PathKind::ConstraintDeleteConstraint, Constraint::ForeignKey(fk)) => {
            DiffValue::Action(fk.delete_constraint)
        }
        (PathKind::ConstraintDetail, Constraint::Check(check)) => DiffValue::Text(check.detail.clone()),
        (PathKind::Constraint, c) => DiffValue::Constraint(c.clone()),
        _ => return None,
    };
    Some(value)
}
