use crate::config::DeparserConfig;
use crate::schema::Schema;

use super::sql;
use super::{DeparseOutput, Statements};

/// Render a schema as DDL.
///
/// Statements are ordered extensions, enum types, tables (each followed by
/// its comments), indexes, non-foreign-key constraints, and finally foreign
/// keys, so every referenced table exists before it is referenced.
pub fn deparse(schema: &Schema, config: &DeparserConfig) -> DeparseOutput {
    let mut out = Statements::default();

    if config.extensions {
        for name in schema.extensions.keys() {
            out.push(sql::create_extension(name));
        }
    }

    if config.enums {
        for def in schema.enums.values() {
            out.push(sql::create_enum(def));
            if let (true, Some(comment)) = (config.comments, def.comment.as_deref()) {
                out.push(sql::comment_on_type(&def.name, Some(comment)));
            }
        }
    }

    for table in schema.tables.values() {
        out.push_fragment(sql::create_table(table, config));
        if config.comments {
            for statement in sql::table_comments(table) {
                out.push(statement);
            }
        }
    }

    for table in schema.tables.values() {
        for index in table.indexes.values() {
            out.push_fragment(sql::create_index(&table.name, index));
        }
    }

    for table in schema.tables.values() {
        for constraint in table.constraints.values().filter(|c| !c.is_foreign_key()) {
            out.push_fragment(sql::add_constraint(&table.name, constraint));
        }
    }

    for table in schema.tables.values() {
        for constraint in table.constraints.values().filter(|c| c.is_foreign_key()) {
            out.push_fragment(sql::add_constraint(&table.name, constraint));
        }
    }

    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Constraint, EnumDef, Index, Table};

    fn blog() -> Schema {
        Schema::default()
            .with_table(
                Table::new("comments")
                    .with_column(Column::new("id", "bigint").not_null())
                    .with_column(Column::new("post_id", "bigint").not_null())
                    .with_constraint(Constraint::foreign_key(
                        "comments_post_fk",
                        &["post_id"],
                        "posts",
                        &["id"],
                    ))
                    .with_constraint(Constraint::primary_key("comments_pkey", &["id"])),
            )
            .with_table(
                Table::new("posts")
                    .with_comment("blog posts")
                    .with_column(Column::new("id", "bigint").not_null())
                    .with_column(Column::new("title", "text").with_comment("headline"))
                    .with_index(Index::new("posts_title_idx", &["title"]))
                    .with_constraint(Constraint::primary_key("posts_pkey", &["id"])),
            )
            .with_enum(EnumDef {
                name: "post_state".to_string(),
                values: vec!["draft".to_string(), "published".to_string()],
                comment: None,
            })
            .with_extension("pgcrypto")
    }

    fn position(ddl: &str, needle: &str) -> usize {
        ddl.find(needle)
            .unwrap_or_else(|| panic!("'{needle}' not found in:\n{ddl}"))
    }

    #[test]
    fn test_statement_order() {
        let output = deparse(&blog(), &DeparserConfig::default());
        assert!(output.is_ok());
        let ddl = &output.ddl;

        let extension = position(ddl, "CREATE EXTENSION IF NOT EXISTS \"pgcrypto\"");
        let enum_type = position(ddl, "CREATE TYPE \"post_state\"");
        let comments = position(ddl, "CREATE TABLE \"comments\"");
        let posts = position(ddl, "CREATE TABLE \"posts\"");
        let index = position(ddl, "CREATE INDEX \"posts_title_idx\"");
        let pkey = position(ddl, "ADD CONSTRAINT \"posts_pkey\" PRIMARY KEY");
        let fk = position(ddl, "ADD CONSTRAINT \"comments_post_fk\" FOREIGN KEY");

        assert!(extension < enum_type);
        assert!(enum_type < comments);
        assert!(comments < posts);
        assert!(posts < index);
        assert!(index < pkey);
        assert!(pkey < fk);
        assert_eq!(output.statement_count, 10);
    }

    #[test]
    fn test_comments_follow_their_table() {
        let ddl = deparse(&blog(), &DeparserConfig::default()).ddl;
        let posts = position(&ddl, "CREATE TABLE \"posts\"");
        let table_comment = position(&ddl, "COMMENT ON TABLE \"posts\" IS 'blog posts';");
        let column_comment = position(&ddl, "COMMENT ON COLUMN \"posts\".\"title\" IS 'headline';");
        let index = position(&ddl, "CREATE INDEX");
        assert!(posts < table_comment && table_comment < column_comment && column_comment < index);
    }

    #[test]
    fn test_config_switches() {
        let config = DeparserConfig {
            comments: false,
            extensions: false,
            enums: false,
            ..Default::default()
        };
        let ddl = deparse(&blog(), &config).ddl;
        assert!(!ddl.contains("COMMENT ON"));
        assert!(!ddl.contains("CREATE EXTENSION"));
        assert!(!ddl.contains("CREATE TYPE"));
        assert!(ddl.starts_with("CREATE TABLE \"comments\""));
    }

    #[test]
    fn test_self_referencing_foreign_key() {
        let schema = Schema::default().with_table(
            Table::new("employees")
                .with_column(Column::new("id", "bigint").not_null())
                .with_column(Column::new("manager_id", "bigint"))
                .with_constraint(Constraint::primary_key("employees_pkey", &["id"]))
                .with_constraint(Constraint::foreign_key(
                    "employees_manager_fk",
                    &["manager_id"],
                    "employees",
                    &["id"],
                )),
        );
        let output = deparse(&schema, &DeparserConfig::default());
        assert!(output.errors.is_empty());
        let create = position(&output.ddl, "CREATE TABLE \"employees\"");
        let fk = position(&output.ddl, "FOREIGN KEY (\"manager_id\") REFERENCES \"employees\"");
        assert!(create < fk);
    }

    #[test]
    fn test_partial_failure_keeps_other_fragments() {
        let schema = blog().with_table(
            Table::new("broken")
                .with_column(Column::new("id", "bigint"))
                .with_constraint(Constraint::unique("broken_key", &[])),
        );
        let output = deparse(&schema, &DeparserConfig::default());
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("broken_key"));
        assert!(output.ddl.contains("CREATE TABLE \"broken\""));
        assert!(output.ddl.contains("CREATE TABLE \"posts\""));
        assert!(output.clone().into_result().is_err());
    }

    #[test]
    fn test_empty_schema() {
        let output = deparse(&Schema::default(), &DeparserConfig::default());
        assert!(output.ddl.is_empty());
        assert!(output.is_ok());
    }

    #[test]
    fn test_tables_follow_declaration_order() {
        let schema = Schema::from_json_str(
            "schema.json",
            r#"{"tables": {
                "users": {"name": "users", "columns": {"id": {"name": "id", "type": "bigint"}}},
                "accounts": {"name": "accounts", "columns": {"id": {"name": "id", "type": "bigint"}}}
            }}"#,
        )
        .unwrap();
        let ddl = deparse(&schema, &DeparserConfig::default()).ddl;
        assert!(ddl.starts_with("CREATE TABLE \"users\""));
        assert!(position(&ddl, "CREATE TABLE \"users\"") < position(&ddl, "CREATE TABLE \"accounts\""));

        let round_trip: Schema =
            serde_json::from_str(&serde_json::to_string(&schema).unwrap()).unwrap();
        assert_eq!(
            round_trip.tables.keys().collect::<Vec<_>>(),
            vec!["users", "accounts"]
        );
    }

    #[test]
    fn test_enum_comment() {
        let schema = Schema::default().with_enum(EnumDef {
            name: "mood".to_string(),
            values: vec!["happy".to_string()],
            comment: Some("how it went".to_string()),
        });
        let output = deparse(&schema, &DeparserConfig::default());
        assert_eq!(
            output.ddl,
            "CREATE TYPE \"mood\" AS ENUM ('happy');\n\n\
             COMMENT ON TYPE \"mood\" IS 'how it went';"
        );
        assert_eq!(output.statement_count, 2);

        let config = DeparserConfig {
            comments: false,
            ..Default::default()
        };
        assert_eq!(deparse(&schema, &config).statement_count, 1);
    }
}
