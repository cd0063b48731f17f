use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::DeparserConfig;
use crate::diff::compute_operations;
use crate::error::Result;
use crate::operation::Operation;
use crate::path::{EntityLevel, EntityTarget, PathDescriptor, PathKind};
use crate::schema::{Column, Constraint, Index, Schema, Table};

use super::sql;
use super::{DeparseOutput, Statements};

/// Render a single operation as DDL without access to either schema.
///
/// Only operations whose value carries everything the statement needs can
/// be rendered; attribute changes of indexes and constraints other than a
/// rename cannot, and fail with `DeparseFailed`.
pub fn deparse_operation(op: &Operation) -> Result<String> {
    let config = DeparserConfig::default();
    let mut out = Statements::default();
    let mut deferred = Statements::default();
    render_operation(op, &config, &mut out, &mut deferred);
    out.extend(deferred);
    out.finish().into_result()
}

/// Render the migration from `before` to `after` as DDL.
///
/// New extensions and enum types come first, then dropped constraints, then
/// one or more statements per remaining operation in diff order, then every
/// added foreign key, then dropped enum types and extensions. Attribute changes of an index or constraint
/// are rendered once per entity as a drop and a recreate from `after`.
pub fn deparse_migration(
    before: &Schema,
    after: &Schema,
    config: &DeparserConfig,
) -> Result<DeparseOutput> {
    let operations = compute_operations(before, after)?;
    log::debug!("Deparsing {} operation(s)", operations.len());

    let mut out = Statements::default();
    let mut deferred = Statements::default();
    let mut recreated: HashSet<EntityTarget> = HashSet::new();

    if config.extensions {
        for name in after.extensions.keys().filter(|n| !before.extensions.contains_key(*n)) {
            out.push(sql::create_extension(name));
        }
    }
    if config.enums {
        render_enum_changes(before, after, config.comments, &mut out);
    }

    // A foreign key blocks DROP TABLE of the table it references
    let (drops, rest): (Vec<&Operation>, Vec<&Operation>) =
        operations.iter().partition(|op| is_constraint_drop(op));

    for op in drops.into_iter().chain(rest) {
        if let Some(desc) = PathDescriptor::parse(op.path()) {
            if needs_recreate(desc.kind) {
                if recreated.insert(desc.target.clone()) {
                    recreate(&desc.target, after, &mut out, &mut deferred);
                }
                continue;
            }
        }
        render_operation(op, config, &mut out, &mut deferred);
    }

    out.extend(deferred);

    if config.enums {
        for name in before.enums.keys().filter(|n| !after.enums.contains_key(*n)) {
            out.push(sql::drop_enum(name));
        }
    }
    if config.extensions {
        for name in before.extensions.keys().filter(|n| !after.extensions.contains_key(*n)) {
            out.push(sql::drop_extension(name));
        }
    }

    Ok(out.finish())
}

fn is_constraint_drop(op: &Operation) -> bool {
    matches!(op, Operation::Remove { .. })
        && PathDescriptor::parse(op.path()).is_some_and(|d| d.kind == PathKind::Constraint)
}

/// Index and constraint attributes that SQL cannot alter in place.
fn needs_recreate(kind: PathKind) -> bool {
    matches!(
        kind,
        PathKind::IndexUnique
            | PathKind::IndexColumns
            | PathKind::IndexType
            | PathKind::ConstraintColumnName
            | PathKind::ConstraintTargetTableName
            | PathKind::ConstraintTargetColumnName
            | PathKind::ConstraintUpdateConstraint
            | PathKind::ConstraintDeleteConstraint
            | PathKind::ConstraintDetail
    )
}

fn recreate(target: &EntityTarget, after: &Schema, out: &mut Statements, deferred: &mut Statements) {
    let table_id = &target.table_id;
    let table = after.tables.get(table_id);

    if let Some(index_id) = &target.index_id {
        out.push(sql::drop_index(index_id));
        match table.and_then(|t| t.indexes.get(index_id)) {
            Some(index) => out.push_fragment(sql::create_index(table_id, index)),
            None => out.error(format!(
                "Index {} on {} is missing from the target schema",
                index_id, table_id
            )),
        }
    } else if let Some(constraint_id) = &target.constraint_id {
        out.push(sql::drop_constraint(table_id, constraint_id));
        match table.and_then(|t| t.constraints.get(constraint_id)) {
            Some(c) if c.is_foreign_key() => deferred.push_fragment(sql::add_constraint(table_id, c)),
            Some(c) => out.push_fragment(sql::add_constraint(table_id, c)),
            None => out.error(format!(
                "Constraint {} on {} is missing from the target schema",
                constraint_id, table_id
            )),
        }
    }
}

fn render_enum_changes(before: &Schema, after: &Schema, comments: bool, out: &mut Statements) {
    for (name, def) in &after.enums {
        let Some(old) = before.enums.get(name) else {
            out.push(sql::create_enum(def));
            if let (true, Some(comment)) = (comments, def.comment.as_deref()) {
                out.push(sql::comment_on_type(name, Some(comment)));
            }
            continue;
        };
        if old.values != def.values {
            if def.values.starts_with(&old.values) {
                for value in &def.values[old.values.len()..] {
                    out.push(sql::add_enum_value(name, value));
                }
            } else {
                out.error(format!(
                    "Enum {} drops or reorders values, which ALTER TYPE cannot express",
                    name
                ));
            }
        }
        if comments && old.comment != def.comment {
            out.push(sql::comment_on_type(name, def.comment.as_deref()));
        }
    }
}

fn render_operation(
    op: &Operation,
    config: &DeparserConfig,
    out: &mut Statements,
    deferred: &mut Statements,
) {
    let desc = match PathDescriptor::parse(op.path()) {
        Some(desc) => desc,
        None => {
            out.error(format!("No DDL for unrecognized path '{}'", op.path()));
            return;
        }
    };
    if matches!(op, Operation::Move { .. } | Operation::Copy { .. } | Operation::Test { .. }) {
        out.error(format!("No DDL for {} operation at '{}'", op.kind(), op.path()));
        return;
    }

    let result = match desc.target.level() {
        EntityLevel::Table => render_table_op(op, &desc, config, out, deferred),
        EntityLevel::Column => render_column_op(op, &desc, config, out),
        EntityLevel::Index => render_index_op(op, &desc, out),
        EntityLevel::Constraint => render_constraint_op(op, &desc, out, deferred),
    };
    if let Err(message) = result {
        out.error(message);
    }
}

type Rendered = std::result::Result<(), String>;

fn render_table_op(
    op: &Operation,
    desc: &PathDescriptor,
    config: &DeparserConfig,
    out: &mut Statements,
    deferred: &mut Statements,
) -> Rendered {
    let table_id = desc.target.table_id.as_str();
    match (desc.kind, op) {
        (PathKind::Table, Operation::Add { value, .. }) => {
            let table: Table = decode(op, value)?;
            create_table(&table, config, out, deferred);
        }
        (PathKind::Table, Operation::Remove { .. }) => out.push(sql::drop_table(table_id, config)),
        (PathKind::Table, Operation::Replace { value, .. }) => {
            let table: Table = decode(op, value)?;
            out.push(sql::drop_table(table_id, config));
            create_table(&table, config, out, deferred);
        }
        (PathKind::TableName, Operation::Add { value, .. } | Operation::Replace { value, .. }) => {
            let name = text(op, value)?;
            if name != table_id {
                out.push(sql::rename_table(table_id, &name));
            }
        }
        (PathKind::TableComment, _) => {
            if config.comments {
                let comment = optional_text(op)?;
                out.push(sql::comment_on_table(table_id, comment.as_deref()));
            }
        }
        _ => return Err(unsupported(op, desc)),
    }
    Ok(())
}

/// A new table with its comments, indexes and constraints; foreign keys go
/// to `deferred` so the tables they reference are created first.
fn create_table(table: &Table, config: &DeparserConfig, out: &mut Statements, deferred: &mut Statements) {
    out.push_fragment(sql::create_table(table, config));
    if config.comments {
        for statement in sql::table_comments(table) {
            out.push(statement);
        }
    }
    for index in table.indexes.values() {
        out.push_fragment(sql::create_index(&table.name, index));
    }
    for constraint in table.constraints.values() {
        let fragment = sql::add_constraint(&table.name, constraint);
        if constraint.is_foreign_key() {
            deferred.push_fragment(fragment);
        } else {
            out.push_fragment(fragment);
        }
    }
}

fn render_column_op(
    op: &Operation,
    desc: &PathDescriptor,
    config: &DeparserConfig,
    out: &mut Statements,
) -> Rendered {
    let table_id = desc.target.table_id.as_str();
    let column_id = desc.target.column_id.as_deref().unwrap_or_default();

    match (desc.kind, op) {
        (PathKind::Column, Operation::Add { value, .. }) => {
            let column: Column = decode(op, value)?;
            out.push_fragment(sql::add_column(table_id, &column));
            if config.comments {
                if let Some(ref comment) = column.comment {
                    out.push(sql::comment_on_column(table_id, &column.name, Some(comment)));
                }
            }
        }
        (PathKind::Column, Operation::Remove { .. }) => out.push(sql::drop_column(table_id, column_id)),
        (PathKind::Column, Operation::Replace { value, .. }) => {
            let column: Column = decode(op, value)?;
            out.push(sql::drop_column(table_id, column_id));
            out.push_fragment(sql::add_column(table_id, &column));
        }
        (PathKind::ColumnName, Operation::Add { value, .. } | Operation::Replace { value, .. }) => {
            let name = text(op, value)?;
            if name != column_id {
                out.push(sql::rename_column(table_id, column_id, &name));
            }
        }
        (PathKind::ColumnType, Operation::Add { value, .. } | Operation::Replace { value, .. }) => {
            let data_type = text(op, value)?;
            if data_type.trim().is_empty() {
                return Err(format!("Column {}.{} has no type", table_id, column_id));
            }
            out.push(sql::alter_column(table_id, column_id, &format!("TYPE {}", data_type)));
        }
        (PathKind::ColumnNotNull, _) => {
            let not_null = match op.value() {
                Some(value) => value
                    .as_bool()
                    .ok_or_else(|| invalid_value(op, "a boolean"))?,
                None => false,
            };
            let action = if not_null { "SET NOT NULL" } else { "DROP NOT NULL" };
            out.push(sql::alter_column(table_id, column_id, action));
        }
        (PathKind::ColumnDefault, _) => match optional_text(op)? {
            Some(default) => out.push(sql::alter_column(
                table_id,
                column_id,
                &format!("SET DEFAULT {}", default),
            )),
            None => out.push(sql::alter_column(table_id, column_id, "DROP DEFAULT")),
        },
        (PathKind::ColumnCheck, _) => {
            let name = sql::column_check_name(table_id, column_id);
            out.push(sql::drop_constraint_if_exists(table_id, &name));
            if let Some(check) = optional_text(op)? {
                let constraint = Constraint::check(&name, &check);
                out.push_fragment(sql::add_constraint(table_id, &constraint));
            }
        }
        (PathKind::ColumnComment, _) => {
            if config.comments {
                let comment = optional_text(op)?;
                out.push(sql::comment_on_column(table_id, column_id, comment.as_deref()));
            }
        }
        (PathKind::ColumnPrimary | PathKind::ColumnUnique, Operation::Add { value, .. } | Operation::Replace { value, .. })
            if value.as_bool() == Some(true) =>
        {
            let key = if desc.kind == PathKind::ColumnPrimary {
                "PRIMARY KEY"
            } else {
                "UNIQUE"
            };
            out.push(sql::add_column_key(table_id, column_id, key));
        }
        _ => return Err(unsupported(op, desc)),
    }
    Ok(())
}

fn render_index_op(op: &Operation, desc: &PathDescriptor, out: &mut Statements) -> Rendered {
    let table_id = desc.target.table_id.as_str();
    let index_id = desc.target.index_id.as_deref().unwrap_or_default();

    match (desc.kind, op) {
        (PathKind::Index, Operation::Add { value, .. }) => {
            let index: Index = decode(op, value)?;
            out.push_fragment(sql::create_index(table_id, &index));
        }
        (PathKind::Index, Operation::Remove { .. }) => out.push(sql::drop_index(index_id)),
        (PathKind::Index, Operation::Replace { value, .. }) => {
            let index: Index = decode(op, value)?;
            out.push(sql::drop_index(index_id));
            out.push_fragment(sql::create_index(table_id, &index));
        }
        (PathKind::IndexName, Operation::Add { value, .. } | Operation::Replace { value, .. }) => {
            let name = text(op, value)?;
            if name != index_id {
                out.push(sql::rename_index(index_id, &name));
            }
        }
        _ => return Err(unsupported(op, desc)),
    }
    Ok(())
}

fn render_constraint_op(
    op: &Operation,
    desc: &PathDescriptor,
    out: &mut Statements,
    deferred: &mut Statements,
) -> Rendered {
    let table_id = desc.target.table_id.as_str();
    let constraint_id = desc.target.constraint_id.as_deref().unwrap_or_default();

    match (desc.kind, op) {
        (PathKind::Constraint, Operation::Add { value, .. }) => {
            let constraint: Constraint = decode(op, value)?;
            push_constraint(table_id, &constraint, out, deferred);
        }
        (PathKind::Constraint, Operation::Remove { .. }) => {
            out.push(sql::drop_constraint(table_id, constraint_id))
        }
        (PathKind::Constraint, Operation::Replace { value, .. }) => {
            let constraint: Constraint = decode(op, value)?;
            out.push(sql::drop_constraint(table_id, constraint_id));
            push_constraint(table_id, &constraint, out, deferred);
        }
        (PathKind::ConstraintName, Operation::Add { value, .. } | Operation::Replace { value, .. }) => {
            let name = text(op, value)?;
            if name != constraint_id {
                out.push(sql::rename_constraint(table_id, constraint_id, &name));
            }
        }
        _ => return Err(unsupported(op, desc)),
    }
    Ok(())
}

fn push_constraint(table_id: &str, constraint: &Constraint, out: &mut Statements, deferred: &mut Statements) {
    let fragment = sql::add_constraint(table_id, constraint);
    if constraint.is_foreign_key() {
        deferred.push_fragment(fragment);
    } else {
        out.push_fragment(fragment);
    }
}

fn decode<T: DeserializeOwned>(op: &Operation, value: &Value) -> std::result::Result<T, String> {
    serde_json::from_value(value.clone())
        .map_err(|e| format!("Invalid value for {} at '{}': {}", op.kind(), op.path(), e))
}

fn text(op: &Operation, value: &Value) -> std::result::Result<String, String> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| invalid_value(op, "a string"))
}

/// A nullable string attribute; `remove` reads as null.
fn optional_text(op: &Operation) -> std::result::Result<Option<String>, String> {
    match op.value() {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid_value(op, "a string or null")),
    }
}

fn invalid_value(op: &Operation, expected: &str) -> String {
    format!("Expected {} for {} at '{}'", expected, op.kind(), op.path())
}

fn unsupported(op: &Operation, desc: &PathDescriptor) -> String {
    format!(
        "No DDL for {} of {} on {}; the change needs the target schema",
        op.kind(),
        desc.kind,
        desc.target
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumDef;
    use serde_json::json;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", "bigint").not_null())
            .with_column(Column::new("name", "text"))
            .with_constraint(Constraint::primary_key("users_pkey", &["id"]))
    }

    fn migrate(before: &Schema, after: &Schema) -> DeparseOutput {
        deparse_migration(before, after, &DeparserConfig::default()).unwrap()
    }

    #[test]
    fn test_identical_schemas_need_no_migration() {
        let schema = Schema::default().with_table(users());
        let output = migrate(&schema, &schema);
        assert!(output.ddl.is_empty());
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_add_column() {
        let before = Schema::default().with_table(users());
        let after = Schema::default().with_table(
            users().with_column(Column::new("email", "text").with_comment("login")),
        );
        let output = migrate(&before, &after);
        assert_eq!(
            output.ddl,
            "ALTER TABLE \"users\" ADD COLUMN \"email\" text;\n\n\
             COMMENT ON COLUMN \"users\".\"email\" IS 'login';"
        );
    }

    #[test]
    fn test_column_attribute_changes() {
        let before = Schema::default().with_table(
            Table::new("users").with_column(Column::new("age", "int").with_default("0")),
        );
        let after = Schema::default().with_table(
            Table::new("users").with_column(Column::new("age", "bigint").not_null()),
        );
        let output = migrate(&before, &after);
        assert!(output.errors.is_empty());
        assert!(output.ddl.contains("ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE bigint;"));
        assert!(output.ddl.contains("ALTER TABLE \"users\" ALTER COLUMN \"age\" SET NOT NULL;"));
        assert!(output.ddl.contains("ALTER TABLE \"users\" ALTER COLUMN \"age\" DROP DEFAULT;"));
    }

    #[test]
    fn test_drop_table_honours_cascade() {
        let before = Schema::default().with_table(users()).with_table(Table::new("posts"));
        let after = Schema::default().with_table(users());

        assert_eq!(migrate(&before, &after).ddl, "DROP TABLE \"posts\";");

        let config = DeparserConfig {
            drop_cascade: true,
            ..Default::default()
        };
        let output = deparse_migration(&before, &after, &config).unwrap();
        assert_eq!(output.ddl, "DROP TABLE \"posts\" CASCADE;");
    }

    #[test]
    fn test_new_tables_defer_foreign_keys() {
        // `comments` is declared before `posts`, which it references
        let after = Schema::default()
            .with_table(
                Table::new("comments")
                    .with_column(Column::new("post_id", "bigint"))
                    .with_constraint(Constraint::foreign_key("comments_post_fk", &["post_id"], "posts", &["id"])),
            )
            .with_table(
                Table::new("posts")
                    .with_column(Column::new("id", "bigint").not_null())
                    .with_constraint(Constraint::primary_key("posts_pkey", &["id"])),
            );
        let output = migrate(&Schema::default(), &after);
        assert!(output.errors.is_empty());

        let ddl = &output.ddl;
        let posts = ddl.find("CREATE TABLE \"posts\"").unwrap();
        let fk = ddl.find("FOREIGN KEY").unwrap();
        assert!(posts < fk);
        assert!(ddl.ends_with("ON UPDATE NO ACTION ON DELETE NO ACTION;"));
    }

    #[test]
    fn test_index_change_recreates_once() {
        let before = Schema::default()
            .with_table(users().with_index(Index::new("users_name_idx", &["name"])));
        let after = Schema::default().with_table(
            users().with_index(Index::new("users_name_idx", &["name", "id"]).unique()),
        );
        let output = migrate(&before, &after);
        assert_eq!(
            output.ddl,
            "DROP INDEX \"users_name_idx\";\n\n\
             CREATE UNIQUE INDEX \"users_name_idx\" ON \"users\" (\"name\", \"id\");"
        );
    }

    #[test]
    fn test_constraint_kind_change_is_drop_and_add() {
        let before = Schema::default()
            .with_table(users().with_constraint(Constraint::unique("users_name_key", &["name"])));
        let after = Schema::default()
            .with_table(users().with_constraint(Constraint::check("users_name_key", "name <> ''")));
        let output = migrate(&before, &after);
        assert_eq!(
            output.ddl,
            "ALTER TABLE \"users\" DROP CONSTRAINT \"users_name_key\";\n\n\
             ALTER TABLE \"users\" ADD CONSTRAINT \"users_name_key\" CHECK (name <> '');"
        );
    }

    #[test]
    fn test_extensions_and_enums() {
        let mood = |values: &[&str]| EnumDef {
            name: "mood".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            comment: None,
        };
        let before = Schema::default()
            .with_enum(mood(&["happy"]))
            .with_extension("hstore");
        let after = Schema::default()
            .with_enum(mood(&["happy", "sad"]))
            .with_extension("citext")
            .with_table(Table::new("t"));

        let output = migrate(&before, &after);
        let statements: Vec<&str> = output.ddl.split("\n\n").collect();
        assert_eq!(statements[0], "CREATE EXTENSION IF NOT EXISTS \"citext\";");
        assert_eq!(statements[1], "ALTER TYPE \"mood\" ADD VALUE 'sad';");
        assert!(statements[2].starts_with("CREATE TABLE \"t\""));
        assert_eq!(statements[3], "DROP EXTENSION IF EXISTS \"hstore\";");

        let reordered = Schema::default().with_enum(mood(&["sad", "happy"]));
        let output = migrate(&after, &reordered);
        assert_eq!(output.errors.len(), 1);
    }

    #[test]
    fn test_deparse_single_operations() {
        assert_eq!(
            deparse_operation(&Operation::replace("/tables/users/name", json!("members"))).unwrap(),
            "ALTER TABLE \"users\" RENAME TO \"members\";"
        );
        assert_eq!(
            deparse_operation(&Operation::remove("/tables/users/columns/legacy")).unwrap(),
            "ALTER TABLE \"users\" DROP COLUMN \"legacy\";"
        );
        assert_eq!(
            deparse_operation(&Operation::replace("/tables/users/columns/name/comment", Value::Null))
                .unwrap(),
            "COMMENT ON COLUMN \"users\".\"name\" IS NULL;"
        );
        assert_eq!(
            deparse_operation(&Operation::replace("/tables/users/columns/id/primary", json!(true)))
                .unwrap(),
            "ALTER TABLE \"users\" ADD PRIMARY KEY (\"id\");"
        );
    }

    #[test]
    fn test_deparse_operation_errors() {
        let moved = Operation::Move {
            from: "/tables/a".to_string(),
            path: "/tables/b".to_string(),
        };
        assert!(deparse_operation(&moved).is_err());
        assert!(deparse_operation(&Operation::remove("/enums/mood")).is_err());
        assert!(deparse_operation(&Operation::replace(
            "/tables/t/indexes/t_idx/columns/0",
            json!("a")
        ))
        .is_err());
        assert!(deparse_operation(&Operation::replace(
            "/tables/t/columns/c/notNull",
            json!("yes")
        ))
        .is_err());
    }

    #[test]
    fn test_constraint_drops_precede_table_drops() {
        let parent = Table::new("a")
            .with_column(Column::new("id", "bigint").not_null())
            .with_constraint(Constraint::primary_key("a_pkey", &["id"]));
        let child = Table::new("b").with_column(Column::new("a_id", "bigint"));
        let before = Schema::default().with_table(parent).with_table(
            child
                .clone()
                .with_constraint(Constraint::foreign_key("b_a_fk", &["a_id"], "a", &["id"])),
        );
        let after = Schema::default().with_table(child);

        let output = migrate(&before, &after);
        assert!(output.errors.is_empty());
        assert_eq!(
            output.ddl,
            "ALTER TABLE \"b\" DROP CONSTRAINT \"b_a_fk\";\n\n\
             DROP TABLE \"a\";"
        );
    }

    #[test]
    fn test_enum_comments() {
        let mood = |comment: Option<&str>| EnumDef {
            name: "mood".to_string(),
            values: vec!["happy".to_string()],
            comment: comment.map(str::to_string),
        };
        let created = Schema::default().with_enum(mood(Some("feelings")));
        let output = migrate(&Schema::default(), &created);
        assert_eq!(
            output.ddl,
            "CREATE TYPE \"mood\" AS ENUM ('happy');\n\n\
             COMMENT ON TYPE \"mood\" IS 'feelings';"
        );

        let cleared = Schema::default().with_enum(mood(None));
        assert_eq!(
            migrate(&created, &cleared).ddl,
            "COMMENT ON TYPE \"mood\" IS NULL;"
        );

        let config = DeparserConfig {
            comments: false,
            ..DeparserConfig::default()
        };
        let output = deparse_migration(&created, &cleared, &config).unwrap();
        assert!(output.ddl.is_empty());
    }
}
