//! SQL fragment builders shared by the schema and migration deparsers.
//!
//! Builders that can reject their input return `Fragment`, whose error is a
//! human-readable message collected by the caller instead of aborting.

use crate::config::DeparserConfig;
use crate::schema::{Column, Constraint, EnumDef, Index, Table};

pub(crate) type Fragment = std::result::Result<String, String>;

/// Quote a SQL identifier.
///
/// Doubles any embedded double-quotes and wraps in double-quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn column_definition(table: &str, column: &Column) -> Fragment {
    if column.data_type.trim().is_empty() {
        return Err(format!(
            "Column {}.{} has no type",
            table, column.name
        ));
    }
    let mut col = format!("{} {}", quote_ident(&column.name), column.data_type);
    if column.not_null {
        col.push_str(" NOT NULL");
    }
    if let Some(ref default) = column.default {
        col.push_str(&format!(" DEFAULT {}", default));
    }
    if let Some(ref check) = column.check {
        col.push_str(&format!(" CHECK ({})", check));
    }
    Ok(col)
}

pub(crate) fn create_table(table: &Table, config: &DeparserConfig) -> Fragment {
    let cols = table
        .columns
        .values()
        .map(|c| column_definition(&table.name, c).map(|def| format!("    {}", def)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let keyword = if config.if_not_exists {
        "CREATE TABLE IF NOT EXISTS"
    } else {
        "CREATE TABLE"
    };
    if cols.is_empty() {
        return Ok(format!("{} {} ();", keyword, quote_ident(&table.name)));
    }
    Ok(format!(
        "{} {} (\n{}\n);",
        keyword,
        quote_ident(&table.name),
        cols.join(",\n")
    ))
}

pub(crate) fn drop_table(table: &str, config: &DeparserConfig) -> String {
    if config.drop_cascade {
        format!("DROP TABLE {} CASCADE;", quote_ident(table))
    } else {
        format!("DROP TABLE {};", quote_ident(table))
    }
}

pub(crate) fn rename_table(from: &str, to: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {};", quote_ident(from), quote_ident(to))
}

fn comment_value(comment: Option<&str>) -> String {
    comment.map(quote_literal).unwrap_or_else(|| "NULL".to_string())
}

pub(crate) fn comment_on_table(table: &str, comment: Option<&str>) -> String {
    format!(
        "COMMENT ON TABLE {} IS {};",
        quote_ident(table),
        comment_value(comment)
    )
}

pub(crate) fn comment_on_column(table: &str, column: &str, comment: Option<&str>) -> String {
    format!(
        "COMMENT ON COLUMN {}.{} IS {};",
        quote_ident(table),
        quote_ident(column),
        comment_value(comment)
    )
}

/// Comment statements for a freshly created table and its columns.
pub(crate) fn table_comments(table: &Table) -> Vec<String> {
    let mut statements = Vec::new();
    if let Some(ref comment) = table.comment {
        statements.push(comment_on_table(&table.name, Some(comment)));
    }
    for column in table.columns.values() {
        if let Some(ref comment) = column.comment {
            statements.push(comment_on_column(&table.name, &column.name, Some(comment)));
        }
    }
    statements
}

pub(crate) fn add_column(table: &str, column: &Column) -> Fragment {
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {};",
        quote_ident(table),
        column_definition(table, column)?
    ))
}

pub(crate) fn drop_column(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        quote_ident(table),
        quote_ident(column)
    )
}

pub(crate) fn rename_column(table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {};",
        quote_ident(table),
        quote_ident(from),
        quote_ident(to)
    )
}

/// `ALTER TABLE t ALTER COLUMN c <action>;`
pub(crate) fn alter_column(table: &str, column: &str, action: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {};",
        quote_ident(table),
        quote_ident(column),
        action
    )
}

/// Name PostgreSQL assigns to an inline column check.
pub(crate) fn column_check_name(table: &str, column: &str) -> String {
    format!("{}_{}_check", table, column)
}

pub(crate) fn create_index(table: &str, index: &Index) -> Fragment {
    if index.columns.is_empty() {
        return Err(format!("Index {} on {} has no columns", index.name, table));
    }
    let unique = if index.unique { "UNIQUE " } else { "" };
    let using = if index.index_type.is_empty() {
        String::new()
    } else {
        format!(" USING {}", index.index_type)
    };
    Ok(format!(
        "CREATE {}INDEX {} ON {}{} ({});",
        unique,
        quote_ident(&index.name),
        quote_ident(table),
        using,
        quote_list(&index.columns)
    ))
}

pub(crate) fn drop_index(index: &str) -> String {
    format!("DROP INDEX {};", quote_ident(index))
}

pub(crate) fn rename_index(from: &str, to: &str) -> String {
    format!("ALTER INDEX {} RENAME TO {};", quote_ident(from), quote_ident(to))
}

/// Body of a constraint after `ADD CONSTRAINT name`.
pub(crate) fn constraint_body(table: &str, constraint: &Constraint) -> Fragment {
    let require_columns = |columns: &[String]| {
        if columns.is_empty() {
            Err(format!(
                "{} constraint {} on {} has no columns",
                constraint.kind(),
                constraint.name(),
                table
            ))
        } else {
            Ok(quote_list(columns))
        }
    };

    match constraint {
        Constraint::PrimaryKey(pk) => Ok(format!("PRIMARY KEY ({})", require_columns(&pk.column_names)?)),
        Constraint::Unique(u) => Ok(format!("UNIQUE ({})", require_columns(&u.column_names)?)),
        Constraint::ForeignKey(fk) => {
            let columns = require_columns(&fk.column_names)?;
            if fk.column_names.len() != fk.target_column_names.len() {
                return Err(format!(
                    "Foreign key {} on {} maps {} column(s) to {} target column(s)",
                    fk.name,
                    table,
                    fk.column_names.len(),
                    fk.target_column_names.len()
                ));
            }
            Ok(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
                columns,
                quote_ident(&fk.target_table_name),
                quote_list(&fk.target_column_names),
                fk.update_constraint.as_sql(),
                fk.delete_constraint.as_sql()
            ))
        }
        Constraint::Check(check) => {
            if check.detail.trim().is_empty() {
                return Err(format!(
                    "Check constraint {} on {} has an empty expression",
                    check.name, table
                ));
            }
            Ok(format!("CHECK ({})", check.detail))
        }
    }
}

pub(crate) fn add_constraint(table: &str, constraint: &Constraint) -> Fragment {
    Ok(format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {};",
        quote_ident(table),
        quote_ident(constraint.name()),
        constraint_body(table, constraint)?
    ))
}

pub(crate) fn drop_constraint(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {};",
        quote_ident(table),
        quote_ident(constraint)
    )
}

pub(crate) fn drop_constraint_if_exists(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
        quote_ident(table),
        quote_ident(constraint)
    )
}

/// Unnamed single-column key, e.g. `PRIMARY KEY` or `UNIQUE`.
pub(crate) fn add_column_key(table: &str, column: &str, key: &str) -> String {
    format!(
        "ALTER TABLE {} ADD {} ({});",
        quote_ident(table),
        key,
        quote_ident(column)
    )
}

pub(crate) fn rename_constraint(table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME CONSTRAINT {} TO {};",
        quote_ident(table),
        quote_ident(from),
        quote_ident(to)
    )
}

pub(crate) fn create_extension(name: &str) -> String {
    format!("CREATE EXTENSION IF NOT EXISTS {};", quote_ident(name))
}

pub(crate) fn drop_extension(name: &str) -> String {
    format!("DROP EXTENSION IF EXISTS {};", quote_ident(name))
}

pub(crate) fn create_enum(def: &EnumDef) -> String {
    let values: Vec<String> = def.values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({});",
        quote_ident(&def.name),
        values.join(", ")
    )
}

pub(crate) fn comment_on_type(name: &str, comment: Option<&str>) -> String {
    format!(
        "COMMENT ON TYPE {} IS {};",
        quote_ident(name),
        comment_value(comment)
    )
}

pub(crate) fn drop_enum(name: &str) -> String {
    format!("DROP TYPE {};", quote_ident(name))
}

pub(crate) fn add_enum_value(name: &str, value: &str) -> String {
    format!(
        "ALTER TYPE {} ADD VALUE {};",
        quote_ident(name),
        quote_literal(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKeyAction;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_column_definition() {
        let column = Column::new("qty", "integer")
            .not_null()
            .with_default("0")
            .with_check("qty >= 0");
        assert_eq!(
            column_definition("items", &column).unwrap(),
            "\"qty\" integer NOT NULL DEFAULT 0 CHECK (qty >= 0)"
        );
        assert!(column_definition("items", &Column::new("broken", " ")).is_err());
    }

    #[test]
    fn test_create_table() {
        let table = Table::new("users")
            .with_column(Column::new("id", "bigint").not_null())
            .with_column(Column::new("name", "text"));
        assert_eq!(
            create_table(&table, &DeparserConfig::default()).unwrap(),
            "CREATE TABLE \"users\" (\n    \"id\" bigint NOT NULL,\n    \"name\" text\n);"
        );

        let config = DeparserConfig {
            if_not_exists: true,
            ..Default::default()
        };
        assert!(create_table(&table, &config)
            .unwrap()
            .starts_with("CREATE TABLE IF NOT EXISTS"));
    }

    #[test]
    fn test_create_index() {
        let index = Index::new("users_email_idx", &["email", "id"]).unique().using("btree");
        assert_eq!(
            create_index("users", &index).unwrap(),
            "CREATE UNIQUE INDEX \"users_email_idx\" ON \"users\" USING btree (\"email\", \"id\");"
        );
        assert!(create_index("users", &Index::new("empty_idx", &[])).is_err());
    }

    #[test]
    fn test_foreign_key_body() {
        let mut fk = Constraint::foreign_key("posts_author_fk", &["author_id"], "users", &["id"]);
        if let Constraint::ForeignKey(ref mut inner) = fk {
            inner.delete_constraint = ForeignKeyAction::Cascade;
        }
        assert_eq!(
            add_constraint("posts", &fk).unwrap(),
            "ALTER TABLE \"posts\" ADD CONSTRAINT \"posts_author_fk\" FOREIGN KEY (\"author_id\") \
             REFERENCES \"users\" (\"id\") ON UPDATE NO ACTION ON DELETE CASCADE;"
        );

        let mismatched = Constraint::foreign_key("bad_fk", &["a", "b"], "users", &["id"]);
        assert!(add_constraint("posts", &mismatched).is_err());
    }

    #[test]
    fn test_invalid_key_constraints() {
        assert!(add_constraint("t", &Constraint::primary_key("t_pkey", &[])).is_err());
        assert!(add_constraint("t", &Constraint::check("t_check", "  ")).is_err());
        assert_eq!(
            add_constraint("t", &Constraint::check("t_check", "a > 0")).unwrap(),
            "ALTER TABLE \"t\" ADD CONSTRAINT \"t_check\" CHECK (a > 0);"
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            comment_on_table("users", Some("app's users")),
            "COMMENT ON TABLE \"users\" IS 'app''s users';"
        );
        assert_eq!(
            comment_on_column("users", "id", None),
            "COMMENT ON COLUMN \"users\".\"id\" IS NULL;"
        );
    }

    #[test]
    fn test_enum_statements() {
        let def = EnumDef {
            name: "mood".to_string(),
            values: vec!["happy".to_string(), "sad".to_string()],
            comment: None,
        };
        assert_eq!(create_enum(&def), "CREATE TYPE \"mood\" AS ENUM ('happy', 'sad');");
        assert_eq!(add_enum_value("mood", "ok"), "ALTER TYPE \"mood\" ADD VALUE 'ok';");
        assert_eq!(
            comment_on_type("mood", Some("how it went")),
            "COMMENT ON TYPE \"mood\" IS 'how it went';"
        );
    }
}
