//! Patch operations (JSON-Patch vocabulary) and JSON-pointer helpers.
//!
//! Operations address the schema document with slash-delimited pointers such
//! as `/tables/users/columns/email`. The string form is kept for
//! compatibility with stored patch history; see [`crate::path`] for the typed
//! descriptor a path is parsed into.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaLensError};

/// A single structural edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

/// Discriminant of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::Add => "add",
            OperationKind::Remove => "remove",
            OperationKind::Replace => "replace",
            OperationKind::Move => "move",
            OperationKind::Copy => "copy",
            OperationKind::Test => "test",
        };
        f.write_str(s)
    }
}

impl Operation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Operation::Add {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Operation::Remove { path: path.into() }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Operation::Replace {
            path: path.into(),
            value,
        }
    }

    /// Target path of the operation.
    pub fn path(&self) -> &str {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. }
            | Operation::Test { path, .. } => path,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add { .. } => OperationKind::Add,
            Operation::Remove { .. } => OperationKind::Remove,
            Operation::Replace { .. } => OperationKind::Replace,
            Operation::Move { .. } => OperationKind::Move,
            Operation::Copy { .. } => OperationKind::Copy,
            Operation::Test { .. } => OperationKind::Test,
        }
    }

    /// Payload for `add`, `replace`, and `test`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Operation::Add { value, .. }
            | Operation::Replace { value, .. }
            | Operation::Test { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Add { path, .. } => write!(f, "+ {}", path),
            Operation::Remove { path } => write!(f, "- {}", path),
            Operation::Replace { path, value } => write!(f, "~ {} = {}", path, value),
            Operation::Move { from, path } => write!(f, "> {} -> {}", from, path),
            Operation::Copy { from, path } => write!(f, "= {} -> {}", from, path),
            Operation::Test { path, value } => write!(f, "? {} == {}", path, value),
        }
    }
}

/// Escape a single reference token (`~` → `~0`, `/` → `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverse [`escape_token`].
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a pointer into unescaped reference tokens. The empty pointer refers
/// to the whole document and yields no tokens.
pub fn parse_pointer(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(SchemaLensError::InvalidPath {
            path: path.to_string(),
            reason: "pointer must start with '/'".to_string(),
        });
    };
    let tokens = rest.split('/').map(unescape_token).collect();
    Ok(tokens)
}

/// Read a patch (JSON array of operations) from a file.
pub fn load_patch(path: &Path) -> Result<Vec<Operation>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| SchemaLensError::SchemaParseError {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })
}
