//! Recognized patch paths and their typed descriptors.
//!
//! Every path the diff engine understands addresses a table, column, index,
//! or constraint, optionally narrowed to one attribute. A path is matched
//! once, at the boundary, into a [`PathDescriptor`]; downstream code works
//! with [`PathKind`] and [`EntityTarget`] instead of re-matching strings.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::operation::unescape_token;

/// Kind of entity or entity attribute a path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathKind {
    Table,
    TableName,
    TableComment,
    Column,
    ColumnName,
    ColumnComment,
    ColumnCheck,
    ColumnUnique,
    ColumnNotNull,
    ColumnPrimary,
    ColumnType,
    ColumnDefault,
    Index,
    IndexName,
    IndexUnique,
    IndexColumns,
    IndexType,
    Constraint,
    ConstraintName,
    ConstraintColumnName,
    ConstraintTargetTableName,
    ConstraintTargetColumnName,
    ConstraintUpdateConstraint,
    ConstraintDeleteConstraint,
    ConstraintDetail,
}

/// Entity level a [`PathKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLevel {
    Table,
    Column,
    Index,
    Constraint,
}

impl PathKind {
    /// Attribute kinds of a table, excluding the base kind.
    pub const TABLE_ATTRIBUTES: [PathKind; 2] = [PathKind::TableName, PathKind::TableComment];

    /// Attribute kinds of a column, excluding the base kind.
    pub const COLUMN_ATTRIBUTES: [PathKind; 8] = [
        PathKind::ColumnName,
        PathKind::ColumnComment,
        PathKind::ColumnCheck,
        PathKind::ColumnUnique,
        PathKind::ColumnNotNull,
        PathKind::ColumnPrimary,
        PathKind::ColumnType,
        PathKind::ColumnDefault,
    ];

    /// Attribute kinds of an index, excluding the base kind.
    pub const INDEX_ATTRIBUTES: [PathKind; 4] = [
        PathKind::IndexName,
        PathKind::IndexUnique,
        PathKind::IndexColumns,
        PathKind::IndexType,
    ];

    /// Attribute kinds of a constraint, excluding the base kind.
    pub const CONSTRAINT_ATTRIBUTES: [PathKind; 7] = [
        PathKind::ConstraintName,
        PathKind::ConstraintColumnName,
        PathKind::ConstraintTargetTableName,
        PathKind::ConstraintTargetColumnName,
        PathKind::ConstraintUpdateConstraint,
        PathKind::ConstraintDeleteConstraint,
        PathKind::ConstraintDetail,
    ];

    /// Every kind, grouped by level with the base kind first.
    pub const ALL: [PathKind; 25] = [
        PathKind::Table,
        PathKind::TableName,
        PathKind::TableComment,
        PathKind::Column,
        PathKind::ColumnName,
        PathKind::ColumnComment,
        PathKind::ColumnCheck,
        PathKind::ColumnUnique,
        PathKind::ColumnNotNull,
        PathKind::ColumnPrimary,
        PathKind::ColumnType,
        PathKind::ColumnDefault,
        PathKind::Index,
        PathKind::IndexName,
        PathKind::IndexUnique,
        PathKind::IndexColumns,
        PathKind::IndexType,
        PathKind::Constraint,
        PathKind::ConstraintName,
        PathKind::ConstraintColumnName,
        PathKind::ConstraintTargetTableName,
        PathKind::ConstraintTargetColumnName,
        PathKind::ConstraintUpdateConstraint,
        PathKind::ConstraintDeleteConstraint,
        PathKind::ConstraintDetail,
    ];

    pub fn level(&self) -> EntityLevel {
        match self {
            PathKind::Table | PathKind::TableName | PathKind::TableComment => EntityLevel::Table,
            PathKind::Column
            | PathKind::ColumnName
            | PathKind::ColumnComment
            | PathKind::ColumnCheck
            | PathKind::ColumnUnique
            | PathKind::ColumnNotNull
            | PathKind::ColumnPrimary
            | PathKind::ColumnType
            | PathKind::ColumnDefault => EntityLevel::Column,
            PathKind::Index
            | PathKind::IndexName
            | PathKind::IndexUnique
            | PathKind::IndexColumns
            | PathKind::IndexType => EntityLevel::Index,
            PathKind::Constraint
            | PathKind::ConstraintName
            | PathKind::ConstraintColumnName
            | PathKind::ConstraintTargetTableName
            | PathKind::ConstraintTargetColumnName
            | PathKind::ConstraintUpdateConstraint
            | PathKind::ConstraintDeleteConstraint
            | PathKind::ConstraintDetail => EntityLevel::Constraint,
        }
    }

    /// Whether this kind addresses a whole entity rather than one attribute.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            PathKind::Table | PathKind::Column | PathKind::Index | PathKind::Constraint
        )
    }

    /// Whether this kind addresses an array-valued attribute.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            PathKind::IndexColumns
                | PathKind::ConstraintColumnName
                | PathKind::ConstraintTargetColumnName
        )
    }
}

impl std::fmt::Display for PathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PathKind::Table => "table",
            PathKind::TableName => "table-name",
            PathKind::TableComment => "table-comment",
            PathKind::Column => "column",
            PathKind::ColumnName => "column-name",
            PathKind::ColumnComment => "column-comment",
            PathKind::ColumnCheck => "column-check",
            PathKind::ColumnUnique => "column-unique",
            PathKind::ColumnNotNull => "column-not-null",
            PathKind::ColumnPrimary => "column-primary",
            PathKind::ColumnType => "column-type",
            PathKind::ColumnDefault => "column-default",
            PathKind::Index => "index",
            PathKind::IndexName => "index-name",
            PathKind::IndexUnique => "index-unique",
            PathKind::IndexColumns => "index-columns",
            PathKind::IndexType => "index-type",
            PathKind::Constraint => "constraint",
            PathKind::ConstraintName => "constraint-name",
            PathKind::ConstraintColumnName => "constraint-column-name",
            PathKind::ConstraintTargetTableName => "constraint-target-table-name",
            PathKind::ConstraintTargetColumnName => "constraint-target-column-name",
            PathKind::ConstraintUpdateConstraint => "constraint-update-constraint",
            PathKind::ConstraintDeleteConstraint => "constraint-delete-constraint",
            PathKind::ConstraintDetail => "constraint-detail",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PathKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PathKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| format!("Unknown path kind '{}'", s))
    }
}

/// Identity of the entity a path or a classification query is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTarget {
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_id: Option<String>,
}

impl EntityTarget {
    pub fn table(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            column_id: None,
            index_id: None,
            constraint_id: None,
        }
    }

    pub fn column(table_id: &str, column_id: &str) -> Self {
        Self {
            column_id: Some(column_id.to_string()),
            ..Self::table(table_id)
        }
    }

    pub fn index(table_id: &str, index_id: &str) -> Self {
        Self {
            index_id: Some(index_id.to_string()),
            ..Self::table(table_id)
        }
    }

    pub fn constraint(table_id: &str, constraint_id: &str) -> Self {
        Self {
            constraint_id: Some(constraint_id.to_string()),
            ..Self::table(table_id)
        }
    }

    /// The owning table's target.
    pub fn table_only(&self) -> Self {
        Self::table(&self.table_id)
    }

    /// Entity level implied by which identifiers are set.
    pub fn level(&self) -> EntityLevel {
        if self.column_id.is_some() {
            EntityLevel::Column
        } else if self.index_id.is_some() {
            EntityLevel::Index
        } else if self.constraint_id.is_some() {
            EntityLevel::Constraint
        } else {
            EntityLevel::Table
        }
    }
}

impl std::fmt::Display for EntityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column_id, &self.index_id, &self.constraint_id) {
            (Some(c), _, _) => write!(f, "{}.{}", self.table_id, c),
            (_, Some(i), _) => write!(f, "{} index {}", self.table_id, i),
            (_, _, Some(c)) => write!(f, "{} constraint {}", self.table_id, c),
            _ => write!(f, "{}", self.table_id),
        }
    }
}

/// A recognized path: which kind of entity attribute, on which entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDescriptor {
    pub kind: PathKind,
    pub target: EntityTarget,
    /// Array position for element-level paths such as `/columns/1` (`-` yields `None`).
    pub element: Option<usize>,
}

static TABLE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/tables/([^/]+)(?:/(name|comment))?$").unwrap()
});

static COLUMN_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/tables/([^/]+)/columns/([^/]+)(?:/(name|comment|check|unique|notNull|primary|type|default))?$",
    )
    .unwrap()
});

static INDEX_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/tables/([^/]+)/indexes/([^/]+)(?:/(name|unique|columns|type)(?:/(0|[1-9]\d*|-))?)?$")
        .unwrap()
});

static CONSTRAINT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/tables/([^/]+)/constraints/([^/]+)(?:/(name|columnNames|targetTableName|targetColumnNames|updateConstraint|deleteConstraint|detail)(?:/(0|[1-9]\d*|-))?)?$",
    )
    .unwrap()
});

impl PathDescriptor {
    /// Match a patch path against the recognized patterns.
    ///
    /// Returns `None` for paths outside the table/column/index/constraint
    /// vocabulary (enums, extensions, unknown attributes).
    pub fn parse(path: &str) -> Option<Self> {
        if let Some(caps) = TABLE_PATH_RE.captures(path) {
            let kind = match caps.get(2).map(|m| m.as_str()) {
                None => PathKind::Table,
                Some("name") => PathKind::TableName,
                Some("comment") => PathKind::TableComment,
                Some(_) => return None,
            };
            return Some(Self {
                kind,
                target: EntityTarget::table(&unescape_token(&caps[1])),
                element: None,
            });
        }

        if let Some(caps) = COLUMN_PATH_RE.captures(path) {
            let kind = match caps.get(3).map(|m| m.as_str()) {
                None => PathKind::Column,
                Some("name") => PathKind::ColumnName,
                Some("comment") => PathKind::ColumnComment,
                Some("check") => PathKind::ColumnCheck,
                Some("unique") => PathKind::ColumnUnique,
                Some("notNull") => PathKind::ColumnNotNull,
                Some("primary") => PathKind::ColumnPrimary,
                Some("type") => PathKind::ColumnType,
                Some("default") => PathKind::ColumnDefault,
                Some(_) => return None,
            };
            return Some(Self {
                kind,
                target: EntityTarget::column(&unescape_token(&caps[1]), &unescape_token(&caps[2])),
                element: None,
            });
        }

        if let Some(caps) = INDEX_PATH_RE.captures(path) {
            let kind = match caps.get(3).map(|m| m.as_str()) {
                None => PathKind::Index,
                Some("name") => PathKind::IndexName,
                Some("unique") => PathKind::IndexUnique,
                Some("columns") => PathKind::IndexColumns,
                Some("type") => PathKind::IndexType,
                Some(_) => return None,
            };
            let element = caps.get(4).map(|m| m.as_str());
            return Self::with_element(
                kind,
                EntityTarget::index(&unescape_token(&caps[1]), &unescape_token(&caps[2])),
                element,
            );
        }

        if let Some(caps) = CONSTRAINT_PATH_RE.captures(path) {
            let kind = match caps.get(3).map(|m| m.as_str()) {
                None => PathKind::Constraint,
                Some("name") => PathKind::ConstraintName,
                Some("columnNames") => PathKind::ConstraintColumnName,
                Some("targetTableName") => PathKind::ConstraintTargetTableName,
                Some("targetColumnNames") => PathKind::ConstraintTargetColumnName,
                Some("updateConstraint") => PathKind::ConstraintUpdateConstraint,
                Some("deleteConstraint") => PathKind::ConstraintDeleteConstraint,
                Some("detail") => PathKind::ConstraintDetail,
                Some(_) => return None,
            };
            let element = caps.get(4).map(|m| m.as_str());
            return Self::with_element(
                kind,
                EntityTarget::constraint(&unescape_token(&caps[1]), &unescape_token(&caps[2])),
                element,
            );
        }

        None
    }

    fn with_element(kind: PathKind, target: EntityTarget, element: Option<&str>) -> Option<Self> {
        let element = match element {
            None => None,
            // Element suffixes are only meaningful under array attributes
            Some(_) if !kind.is_array() => return None,
            Some("-") => None,
            Some(digits) => Some(digits.parse().ok()?),
        };
        Some(Self {
            kind,
            target,
            element,
        })
    }
}

/// Whether a path falls inside the recognized vocabulary.
pub fn is_recognized(path: &str) -> bool {
    PathDescriptor::parse(path).is_some()
}
