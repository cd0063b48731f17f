//! Applying patch operations to a schema.
//!
//! Operations are applied in order to the JSON document form of the schema
//! with RFC 6902 semantics, and the result is read back into a [`Schema`].
//! The input is never mutated; the first failing operation aborts the patch.

use serde_json::Value;

use crate::error::{Result, SchemaLensError};
use crate::operation::{parse_pointer, Operation};
use crate::schema::Schema;

/// Apply `operations` to `target`, producing the patched schema.
pub fn apply_patch(target: &Schema, operations: &[Operation]) -> Result<Schema> {
    let mut doc = serde_json::to_value(target)?;

    for (index, op) in operations.iter().enumerate() {
        apply_operation(&mut doc, op).map_err(|reason| SchemaLensError::PatchFailed {
            index,
            op: op.kind().to_string(),
            path: op.path().to_string(),
            reason,
        })?;
    }

    log::debug!("Applied {} patch operation(s)", operations.len());

    let patched: Schema =
        serde_json::from_value(doc).map_err(|e| SchemaLensError::SchemaParseError {
            source_name: "patched schema".to_string(),
            reason: e.to_string(),
        })?;
    patched.validate()?;
    Ok(patched)
}

type StepResult<T> = std::result::Result<T, String>;

fn apply_operation(doc: &mut Value, op: &Operation) -> StepResult<()> {
    match op {
        Operation::Add { path, value } => add(doc, &tokens(path)?, value.clone()),
        Operation::Remove { path } => remove(doc, &tokens(path)?).map(|_| ()),
        Operation::Replace { path, value } => {
            let slot = resolve_mut(doc, &tokens(path)?)?;
            *slot = value.clone();
            Ok(())
        }
        Operation::Move { from, path } => {
            if from == path {
                return Ok(());
            }
            if path.starts_with(&format!("{}/", from)) {
                return Err(format!("cannot move '{}' into its own child", from));
            }
            let value = remove(doc, &tokens(from)?)?;
            add(doc, &tokens(path)?, value)
        }
        Operation::Copy { from, path } => {
            let value = resolve(doc, &tokens(from)?)?.clone();
            add(doc, &tokens(path)?, value)
        }
        Operation::Test { path, value } => {
            let actual = resolve(doc, &tokens(path)?)?;
            if actual == value {
                Ok(())
            } else {
                Err(format!("expected {}, found {}", value, actual))
            }
        }
    }
}

fn tokens(path: &str) -> StepResult<Vec<String>> {
    parse_pointer(path).map_err(|e| e.to_string())
}

fn array_index(token: &str, len: usize, allow_end: bool) -> StepResult<usize> {
    if allow_end && token == "-" {
        return Ok(len);
    }
    let valid = !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if !valid {
        return Err(format!("'{}' is not a valid array index", token));
    }
    let index: usize = token
        .parse()
        .map_err(|_| format!("'{}' is not a valid array index", token))?;
    let limit = if allow_end { len } else { len.saturating_sub(1) };
    if (allow_end && index > limit) || (!allow_end && (len == 0 || index > limit)) {
        return Err(format!("array index {} out of bounds (length {})", index, len));
    }
    Ok(index)
}

fn resolve<'a>(doc: &'a Value, tokens: &[String]) -> StepResult<&'a Value> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => map
                .get(token)
                .ok_or_else(|| format!("key '{}' does not exist", token))?,
            Value::Array(items) => &items[array_index(token, items.len(), false)?],
            _ => return Err(format!("cannot descend into a scalar at '{}'", token)),
        };
    }
    Ok(current)
}

fn resolve_mut<'a>(doc: &'a mut Value, tokens: &[String]) -> StepResult<&'a mut Value> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| format!("key '{}' does not exist", token))?,
            Value::Array(items) => {
                let index = array_index(token, items.len(), false)?;
                &mut items[index]
            }
            _ => return Err(format!("cannot descend into a scalar at '{}'", token)),
        };
    }
    Ok(current)
}

fn add(doc: &mut Value, tokens: &[String], value: Value) -> StepResult<()> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };
    match resolve_mut(doc, parent_tokens)? {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(last, items.len(), true)?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err("parent of the target location is not a container".to_string()),
    }
}

fn remove(doc: &mut Value, tokens: &[String]) -> StepResult<Value> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        return Err("cannot remove the document root".to_string());
    };
    match resolve_mut(doc, parent_tokens)? {
        Value::Object(map) => map
            .shift_remove(last)
            .ok_or_else(|| format!("key '{}' does not exist", last)),
        Value::Array(items) => {
            let index = array_index(last, items.len(), false)?;
            Ok(items.remove(index))
        }
        _ => Err("parent of the target location is not a container".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_operations;
    use crate::schema::{Column, Constraint, Index, Table};
    use serde_json::json;

    fn base() -> Schema {
        Schema::default().with_table(
            Table::new("users")
                .with_column(Column::new("id", "bigint").not_null())
                .with_column(Column::new("name", "text"))
                .with_index(Index::new("users_name_idx", &["name"]))
                .with_constraint(Constraint::primary_key("users_pkey", &["id"])),
        )
    }

    #[test]
    fn test_add_column() {
        let column = serde_json::to_value(Column::new("email", "text")).unwrap();
        let ops = vec![Operation::add("/tables/users/columns/email", column)];
        let patched = apply_patch(&base(), &ops).unwrap();
        assert_eq!(patched.tables["users"].columns["email"].data_type, "text");
    }

    #[test]
    fn test_replace_missing_path_fails() {
        let ops = vec![Operation::replace("/tables/users/columns/ghost/type", json!("text"))];
        match apply_patch(&base(), &ops).unwrap_err() {
            SchemaLensError::PatchFailed { index, op, path, .. } => {
                assert_eq!(index, 0);
                assert_eq!(op, "replace");
                assert_eq!(path, "/tables/users/columns/ghost/type");
            }
            other => panic!("Expected PatchFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_path_fails() {
        let ops = vec![Operation::remove("tables/users")];
        assert!(matches!(
            apply_patch(&base(), &ops),
            Err(SchemaLensError::PatchFailed { .. })
        ));
    }

    #[test]
    fn test_array_insert_and_append() {
        let ops = vec![
            Operation::add("/tables/users/indexes/users_name_idx/columns/0", json!("id")),
            Operation::add("/tables/users/indexes/users_name_idx/columns/-", json!("email")),
        ];
        let patched = apply_patch(&base(), &ops).unwrap();
        assert_eq!(
            patched.tables["users"].indexes["users_name_idx"].columns,
            vec!["id", "name", "email"]
        );

        let out_of_bounds = vec![Operation::add(
            "/tables/users/indexes/users_name_idx/columns/5",
            json!("x"),
        )];
        assert!(apply_patch(&base(), &out_of_bounds).is_err());
    }

    #[test]
    fn test_move_copy_and_test() {
        let ops = vec![
            Operation::Test {
                path: "/tables/users/columns/id/notNull".to_string(),
                value: json!(true),
            },
            Operation::Copy {
                from: "/tables/users/columns/name/type".to_string(),
                path: "/tables/users/columns/id/type".to_string(),
            },
            Operation::Move {
                from: "/tables/users/comment".to_string(),
                path: "/tables/users/columns/name/comment".to_string(),
            },
            Operation::add("/tables/users/comment", Value::Null),
        ];
        let patched = apply_patch(&base(), &ops).unwrap();
        assert_eq!(patched.tables["users"].columns["id"].data_type, "text");
        assert!(patched.tables["users"].comment.is_none());

        let failing = vec![Operation::Test {
            path: "/tables/users/columns/id/notNull".to_string(),
            value: json!(false),
        }];
        assert!(apply_patch(&base(), &failing).is_err());

        let into_child = vec![Operation::Move {
            from: "/tables/users".to_string(),
            path: "/tables/users/columns/nested".to_string(),
        }];
        assert!(apply_patch(&base(), &into_child).is_err());
    }

    #[test]
    fn test_shape_error_is_reported() {
        let ops = vec![Operation::replace("/tables/users/columns/id/notNull", json!("yes"))];
        assert!(matches!(
            apply_patch(&base(), &ops),
            Err(SchemaLensError::SchemaParseError { .. })
        ));
    }

    #[test]
    fn test_key_name_mismatch_is_rejected() {
        let ops = vec![Operation::add("/tables/people", json!({ "name": "users" }))];
        assert!(matches!(
            apply_patch(&Schema::default(), &ops),
            Err(SchemaLensError::InvalidSchema { count: 1, .. })
        ));

        let moved = vec![Operation::Move {
            from: "/tables/users".to_string(),
            path: "/tables/accounts".to_string(),
        }];
        assert!(matches!(
            apply_patch(&base(), &moved),
            Err(SchemaLensError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_round_trip_through_diff() {
        let before = base();
        let after = Schema::default()
            .with_table(
                Table::new("users")
                    .with_comment("application users")
                    .with_column(Column::new("id", "uuid").not_null().with_default("gen_random_uuid()"))
                    .with_column(Column::new("email", "citext").not_null())
                    .with_index(Index::new("users_name_idx", &["email"]).unique())
                    .with_constraint(Constraint::primary_key("users_pkey", &["id"]))
                    .with_constraint(Constraint::unique("users_email_key", &["email"])),
            )
            .with_table(
                Table::new("posts")
                    .with_column(Column::new("author_id", "uuid"))
                    .with_constraint(Constraint::foreign_key(
                        "posts_author_fk",
                        &["author_id"],
                        "users",
                        &["id"],
                    )),
            );

        let ops = compute_operations(&before, &after).unwrap();
        assert_eq!(apply_patch(&before, &ops).unwrap(), after);

        let back = compute_operations(&after, &before).unwrap();
        assert_eq!(apply_patch(&after, &back).unwrap(), before);
    }
}
