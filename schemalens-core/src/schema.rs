//! Relational schema document model.
//!
//! A [`Schema`] is an immutable value snapshot: tables keyed by name, each
//! holding columns, indexes, and constraints keyed by name. The JSON shape
//! produced by serde is the wire format that patch paths address, e.g.
//! `/tables/users/columns/email/notNull`.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaLensError};

/// Complete snapshot of a relational schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// Tables keyed by table name.
    #[serde(default)]
    pub tables: IndexMap<String, Table>,
    /// Enum types keyed by enum name.
    #[serde(default)]
    pub enums: IndexMap<String, EnumDef>,
    /// Extensions keyed by extension name.
    #[serde(default)]
    pub extensions: IndexMap<String, Extension>,
}

/// Definition of a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    /// Name of the table. Must equal its key in [`Schema::tables`].
    pub name: String,
    /// Table comment, if any.
    #[serde(default)]
    pub comment: Option<String>,
    /// Columns keyed by column name.
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    /// Indexes keyed by index name.
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
    /// Constraints keyed by constraint name.
    #[serde(default)]
    pub constraints: IndexMap<String, Constraint>,
}

/// Definition of a table column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Name of the column.
    pub name: String,
    /// Raw SQL type name, e.g. `varchar` or `numeric(10,2)`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Raw default expression, if any.
    #[serde(default)]
    pub default: Option<String>,
    /// Raw column-level check expression, if any.
    #[serde(default)]
    pub check: Option<String>,
    /// Column comment, if any.
    #[serde(default)]
    pub comment: Option<String>,
    /// Whether the column rejects NULL values.
    #[serde(default)]
    pub not_null: bool,
}

/// Definition of an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Index {
    /// Name of the index.
    pub name: String,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Indexed column names, in index order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Access method (e.g. `btree`), possibly empty.
    #[serde(rename = "type", default)]
    pub index_type: String,
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    /// SQL spelling used in `ON UPDATE` / `ON DELETE` clauses.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

impl std::fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `PRIMARY KEY` constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyConstraint {
    pub name: String,
    pub column_names: Vec<String>,
}

/// `FOREIGN KEY` constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub column_names: Vec<String>,
    pub target_table_name: String,
    pub target_column_names: Vec<String>,
    #[serde(default)]
    pub update_constraint: ForeignKeyAction,
    #[serde(default)]
    pub delete_constraint: ForeignKeyAction,
}

/// `UNIQUE` constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UniqueConstraint {
    pub name: String,
    pub column_names: Vec<String>,
}

/// `CHECK` constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckConstraint {
    pub name: String,
    /// Raw check expression.
    pub detail: String,
}

/// Table-level constraint, discriminated by its `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Constraint {
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey(PrimaryKeyConstraint),
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey(ForeignKeyConstraint),
    #[serde(rename = "UNIQUE")]
    Unique(UniqueConstraint),
    #[serde(rename = "CHECK")]
    Check(CheckConstraint),
}

impl Constraint {
    /// Name of the constraint.
    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey(c) => &c.name,
            Constraint::ForeignKey(c) => &c.name,
            Constraint::Unique(c) => &c.name,
            Constraint::Check(c) => &c.name,
        }
    }

    /// Value of the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::PrimaryKey(_) => "PRIMARY KEY",
            Constraint::ForeignKey(_) => "FOREIGN KEY",
            Constraint::Unique(_) => "UNIQUE",
            Constraint::Check(_) => "CHECK",
        }
    }

    /// Constrained column names (empty for `CHECK`).
    pub fn column_names(&self) -> &[String] {
        match self {
            Constraint::PrimaryKey(c) => &c.column_names,
            Constraint::ForeignKey(c) => &c.column_names,
            Constraint::Unique(c) => &c.column_names,
            Constraint::Check(_) => &[],
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self, Constraint::ForeignKey(_))
    }
}

/// Definition of an enum type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumDef {
    /// Name of the enum type.
    pub name: String,
    /// Ordered list of enum labels.
    #[serde(default)]
    pub values: Vec<String>,
    /// Enum comment, if any.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Installed extension metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extension {
    /// Name of the extension.
    pub name: String,
}

impl Schema {
    /// Parse a schema document from JSON and check its invariants.
    pub fn from_json_str(source_name: &str, content: &str) -> Result<Self> {
        let schema: Schema =
            serde_json::from_str(content).map_err(|e| SchemaLensError::SchemaParseError {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        schema.validate()?;
        Ok(schema)
    }

    /// Add a table keyed by its own name.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Add an enum keyed by its own name.
    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.enums.insert(def.name.clone(), def);
        self
    }

    /// Add an extension keyed by its own name.
    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.insert(
            name.to_string(),
            Extension {
                name: name.to_string(),
            },
        );
        self
    }

    /// Check that every entity's name equals its key in the owning mapping.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        for (key, table) in &self.tables {
            if table.name != *key {
                violations.push(format!("table key '{}' holds table named '{}'", key, table.name));
            }
            for (ckey, column) in &table.columns {
                if column.name != *ckey {
                    violations.push(format!(
                        "column key '{}.{}' holds column named '{}'",
                        key, ckey, column.name
                    ));
                }
            }
            for (ikey, index) in &table.indexes {
                if index.name != *ikey {
                    violations.push(format!(
                        "index key '{}.{}' holds index named '{}'",
                        key, ikey, index.name
                    ));
                }
            }
            for (nkey, constraint) in &table.constraints {
                if constraint.name() != nkey {
                    violations.push(format!(
                        "constraint key '{}.{}' holds constraint named '{}'",
                        key,
                        nkey,
                        constraint.name()
                    ));
                }
            }
        }
        for (key, def) in &self.enums {
            if def.name != *key {
                violations.push(format!("enum key '{}' holds enum named '{}'", key, def.name));
            }
        }
        for (key, ext) in &self.extensions {
            if ext.name != *key {
                violations.push(format!(
                    "extension key '{}' holds extension named '{}'",
                    key, ext.name
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaLensError::InvalidSchema {
                count: violations.len(),
                details: violations.join("; "),
            })
        }
    }

    /// Total number of tables, columns, indexes, and constraints.
    pub fn object_count(&self) -> usize {
        self.tables
            .values()
            .map(|t| 1 + t.columns.len() + t.indexes.len() + t.constraints.len())
            .sum()
    }
}

impl Table {
    /// Create an empty table.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints
            .insert(constraint.name().to_string(), constraint);
        self
    }

    /// Whether `column` belongs to a `PRIMARY KEY` constraint of this table.
    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.constraints.values().any(|c| match c {
            Constraint::PrimaryKey(pk) => pk.column_names.iter().any(|n| n == column),
            _ => false,
        })
    }

    /// Whether `column` alone is covered by a `UNIQUE` constraint of this table.
    pub fn is_unique_column(&self, column: &str) -> bool {
        self.constraints.values().any(|c| match c {
            Constraint::Unique(u) => u.column_names.len() == 1 && u.column_names[0] == column,
            _ => false,
        })
    }
}

impl Column {
    /// Create a nullable column without default, check, or comment.
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            default: None,
            check: None,
            comment: None,
            not_null: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_check(mut self, check: &str) -> Self {
        self.check = Some(check.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

impl Index {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            unique: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            index_type: String::new(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn using(mut self, index_type: &str) -> Self {
        self.index_type = index_type.to_string();
        self
    }
}

impl Constraint {
    pub fn primary_key(name: &str, columns: &[&str]) -> Self {
        Constraint::PrimaryKey(PrimaryKeyConstraint {
            name: name.to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Constraint::Unique(UniqueConstraint {
            name: name.to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn check(name: &str, detail: &str) -> Self {
        Constraint::Check(CheckConstraint {
            name: name.to_string(),
            detail: detail.to_string(),
        })
    }

    pub fn foreign_key(
        name: &str,
        columns: &[&str],
        target_table: &str,
        target_columns: &[&str],
    ) -> Self {
        Constraint::ForeignKey(ForeignKeyConstraint {
            name: name.to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
            target_table_name: target_table.to_string(),
            target_column_names: target_columns.iter().map(|c| c.to_string()).collect(),
            update_constraint: ForeignKeyAction::NoAction,
            delete_constraint: ForeignKeyAction::NoAction,
        })
    }
}

/// Read and validate a schema document from a JSON file.
pub fn load(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    Schema::from_json_str(&path.display().to_string(), &content)
}
