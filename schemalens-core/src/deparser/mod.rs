//! DDL generation from schemas and patch operations.
//!
//! - [`deparse`] renders a whole schema as `CREATE` statements.
//! - [`deparse_operation`] renders one operation without schema context.
//! - [`deparse_migration`] renders the diff between two schemas.
//!
//! Fragment failures are collected into [`DeparseOutput::errors`]; every other
//! fragment is still produced.

mod migration;
mod schema;
pub mod sql;

use serde::Serialize;

use crate::error::{Result, SchemaLensError};

pub use migration::{deparse_migration, deparse_operation};
pub use schema::deparse;
pub use sql::{quote_ident, quote_literal};

/// Generated DDL plus the fragments that could not be generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeparseOutput {
    /// Statements joined by blank lines.
    pub ddl: String,
    /// Number of statements in `ddl`.
    pub statement_count: usize,
    /// One message per failed fragment.
    pub errors: Vec<String>,
}

impl DeparseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The DDL if every fragment succeeded, otherwise `DeparseFailed`.
    pub fn into_result(self) -> Result<String> {
        if self.errors.is_empty() {
            Ok(self.ddl)
        } else {
            Err(SchemaLensError::DeparseFailed {
                count: self.errors.len(),
                details: self.errors.join("; "),
            })
        }
    }
}

/// Accumulates statements and fragment errors in output order.
#[derive(Debug, Default)]
struct Statements {
    statements: Vec<String>,
    errors: Vec<String>,
}

impl Statements {
    fn push(&mut self, statement: String) {
        self.statements.push(statement);
    }

    fn push_fragment(&mut self, fragment: sql::Fragment) {
        match fragment {
            Ok(statement) => self.statements.push(statement),
            Err(message) => self.errors.push(message),
        }
    }

    fn extend(&mut self, other: Statements) {
        self.statements.extend(other.statements);
        self.errors.extend(other.errors);
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn finish(self) -> DeparseOutput {
        if !self.errors.is_empty() {
            log::warn!("{} DDL fragment(s) could not be generated", self.errors.len());
        }
        log::debug!("Generated {} DDL statement(s)", self.statements.len());
        DeparseOutput {
            ddl: self.statements.join("\n\n"),
            statement_count: self.statements.len(),
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let ok = DeparseOutput {
            ddl: "DROP TABLE \"t\";".to_string(),
            statement_count: 1,
            errors: Vec::new(),
        };
        assert_eq!(ok.into_result().unwrap(), "DROP TABLE \"t\";");

        let failed = DeparseOutput {
            ddl: String::new(),
            statement_count: 0,
            errors: vec!["a".to_string(), "b".to_string()],
        };
        match failed.into_result().unwrap_err() {
            SchemaLensError::DeparseFailed { count, details } => {
                assert_eq!(count, 2);
                assert_eq!(details, "a; b");
            }
            other => panic!("Expected DeparseFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_count_ignores_blank_lines_inside_statements() {
        let mut statements = Statements::default();
        statements.push("COMMENT ON TABLE \"t\" IS 'first\n\nsecond';".to_string());
        statements.error("skipped".to_string());

        let output = statements.finish();
        assert_eq!(output.statement_count, 1);
        assert_eq!(output.ddl.split("\n\n").count(), 2);
        assert!(!output.is_ok());
    }
}
