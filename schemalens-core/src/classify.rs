//! Change classification of schema entities against a patch.
//!
//! A status is derived purely from the operation list: operations are parsed
//! into [`PathDescriptor`]s, filtered to one path kind and one entity, and the
//! surviving operation kinds are folded into a [`ChangeStatus`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationKind};
use crate::path::{EntityTarget, PathDescriptor, PathKind};

/// Change status of an entity or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl ChangeStatus {
    pub fn is_changed(&self) -> bool {
        *self != ChangeStatus::Unchanged
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Removed => "removed",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Fold the kinds of the matching operations into a status.
///
/// `replace` wins, then `add` with `remove`, then `add` alone, then `remove`
/// alone. `move`, `copy` and `test` do not contribute.
fn fold_status(kinds: impl IntoIterator<Item = OperationKind>) -> ChangeStatus {
    let mut added = false;
    let mut removed = false;
    for kind in kinds {
        match kind {
            OperationKind::Replace => return ChangeStatus::Modified,
            OperationKind::Add => added = true,
            OperationKind::Remove => removed = true,
            OperationKind::Move | OperationKind::Copy | OperationKind::Test => {}
        }
    }
    match (added, removed) {
        (true, true) => ChangeStatus::Modified,
        (true, false) => ChangeStatus::Added,
        (false, true) => ChangeStatus::Removed,
        (false, false) => ChangeStatus::Unchanged,
    }
}

/// Status of `target` under `kind` for a raw operation list.
pub fn change_status(target: &EntityTarget, kind: PathKind, operations: &[Operation]) -> ChangeStatus {
    fold_status(operations.iter().filter_map(|op| {
        let desc = PathDescriptor::parse(op.path())?;
        (desc.kind == kind && desc.target == *target).then(|| op.kind())
    }))
}

/// Operations with their paths parsed once, for repeated classification.
#[derive(Debug, Clone, Default)]
pub struct OperationSet {
    entries: Vec<(PathDescriptor, OperationKind)>,
}

impl OperationSet {
    pub fn new(operations: &[Operation]) -> Self {
        let entries = operations
            .iter()
            .filter_map(|op| PathDescriptor::parse(op.path()).map(|desc| (desc, op.kind())))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status of `target` under exactly one path kind.
    pub fn status(&self, target: &EntityTarget, kind: PathKind) -> ChangeStatus {
        fold_status(
            self.entries
                .iter()
                .filter(|(desc, _)| desc.kind == kind && desc.target == *target)
                .map(|(_, op)| *op),
        )
    }

    /// Whole-table status over the base, name and comment kinds.
    pub fn table_status(&self, table_id: &str) -> ChangeStatus {
        let target = EntityTarget::table(table_id);
        self.composite(&target, PathKind::Table, &PathKind::TABLE_ATTRIBUTES)
    }

    pub fn column_status(&self, table_id: &str, column_id: &str) -> ChangeStatus {
        self.child_status(
            &EntityTarget::column(table_id, column_id),
            PathKind::Column,
            &PathKind::COLUMN_ATTRIBUTES,
        )
    }

    pub fn index_status(&self, table_id: &str, index_id: &str) -> ChangeStatus {
        self.child_status(
            &EntityTarget::index(table_id, index_id),
            PathKind::Index,
            &PathKind::INDEX_ATTRIBUTES,
        )
    }

    pub fn constraint_status(&self, table_id: &str, constraint_id: &str) -> ChangeStatus {
        self.child_status(
            &EntityTarget::constraint(table_id, constraint_id),
            PathKind::Constraint,
            &PathKind::CONSTRAINT_ATTRIBUTES,
        )
    }

    /// Tables addressed by at least one operation, in name order.
    pub fn touched_tables(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|(desc, _)| desc.target.table_id.clone())
            .collect()
    }

    /// A table that was added or removed as a whole decides its children.
    fn child_status(&self, target: &EntityTarget, base: PathKind, attributes: &[PathKind]) -> ChangeStatus {
        match self.status(&target.table_only(), PathKind::Table) {
            status @ (ChangeStatus::Added | ChangeStatus::Removed) => status,
            _ => self.composite(target, base, attributes),
        }
    }

    fn composite(&self, target: &EntityTarget, base: PathKind, attributes: &[PathKind]) -> ChangeStatus {
        let base_status = self.status(target, base);
        if base_status.is_changed() {
            return base_status;
        }
        if attributes
            .iter()
            .any(|kind| self.status(target, *kind).is_changed())
        {
            ChangeStatus::Modified
        } else {
            ChangeStatus::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fold_rules() {
        use OperationKind::*;
        assert_eq!(fold_status([Add, Remove, Replace]), ChangeStatus::Modified);
        assert_eq!(fold_status([Add, Remove]), ChangeStatus::Modified);
        assert_eq!(fold_status([Add]), ChangeStatus::Added);
        assert_eq!(fold_status([Remove, Remove]), ChangeStatus::Removed);
        assert_eq!(fold_status([Test, Move]), ChangeStatus::Unchanged);
        assert_eq!(fold_status(Vec::new()), ChangeStatus::Unchanged);
    }

    #[test]
    fn test_added_column_classification() {
        let ops = vec![Operation::add(
            "/tables/users/columns/email",
            json!({ "name": "email", "type": "text" }),
        )];
        let email = EntityTarget::column("users", "email");
        let id = EntityTarget::column("users", "id");

        assert_eq!(change_status(&email, PathKind::Column, &ops), ChangeStatus::Added);
        assert_eq!(change_status(&id, PathKind::Column, &ops), ChangeStatus::Unchanged);
        // Another table with a same-named column is unaffected
        let other = EntityTarget::column("accounts", "email");
        assert_eq!(change_status(&other, PathKind::Column, &ops), ChangeStatus::Unchanged);

        let set = OperationSet::new(&ops);
        assert_eq!(set.column_status("users", "email"), ChangeStatus::Added);
        assert_eq!(set.table_status("users"), ChangeStatus::Unchanged);
    }

    #[test]
    fn test_attribute_replace_marks_column_modified() {
        let ops = vec![Operation::replace("/tables/users/columns/age/notNull", json!(true))];
        let set = OperationSet::new(&ops);
        let age = EntityTarget::column("users", "age");

        assert_eq!(set.status(&age, PathKind::ColumnNotNull), ChangeStatus::Modified);
        assert_eq!(set.status(&age, PathKind::Column), ChangeStatus::Unchanged);
        assert_eq!(set.column_status("users", "age"), ChangeStatus::Modified);
    }

    #[test]
    fn test_removed_table_short_circuits_children() {
        let set = OperationSet::new(&[Operation::remove("/tables/posts")]);
        assert_eq!(set.table_status("posts"), ChangeStatus::Removed);
        assert_eq!(set.column_status("posts", "title"), ChangeStatus::Removed);
        assert_eq!(set.index_status("posts", "posts_title_idx"), ChangeStatus::Removed);
        assert_eq!(set.constraint_status("posts", "posts_pkey"), ChangeStatus::Removed);
        assert_eq!(set.column_status("users", "id"), ChangeStatus::Unchanged);
    }

    #[test]
    fn test_array_element_add_and_remove_is_modified() {
        let ops = vec![
            Operation::remove("/tables/t/indexes/t_idx/columns/1"),
            Operation::add("/tables/t/indexes/t_idx/columns/1", json!("c")),
        ];
        let target = EntityTarget::index("t", "t_idx");
        assert_eq!(change_status(&target, PathKind::IndexColumns, &ops), ChangeStatus::Modified);
        assert_eq!(OperationSet::new(&ops).index_status("t", "t_idx"), ChangeStatus::Modified);
    }

    #[test]
    fn test_table_comment_marks_table_modified() {
        let set = OperationSet::new(&[Operation::replace("/tables/users/comment", json!("people"))]);
        assert_eq!(set.table_status("users"), ChangeStatus::Modified);
        assert_eq!(set.column_status("users", "id"), ChangeStatus::Unchanged);
    }

    #[test]
    fn test_unrecognized_paths_are_ignored() {
        let set = OperationSet::new(&[
            Operation::add("/extensions/citext", json!({ "name": "citext" })),
            Operation::replace("/tables/users/columns/id/type", json!("uuid")),
            Operation::add("/tables/orders", json!({})),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.touched_tables().into_iter().collect::<Vec<_>>(),
            vec!["orders", "users"]
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ChangeStatus::Modified).unwrap(), json!("modified"));
        assert_eq!(ChangeStatus::Removed.to_string(), "removed");
    }
}
