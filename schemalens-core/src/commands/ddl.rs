//! Render a whole schema as DDL.

use serde::Serialize;

use crate::config::SchemaLensConfig;
use crate::deparser::{deparse, DeparseOutput};
use crate::error::Result;
use crate::schema::Schema;

/// Report produced by the ddl and migration commands.
#[derive(Debug, Serialize)]
pub struct DdlReport {
    /// Generated statements joined by blank lines.
    pub ddl: String,
    /// Fragments that could not be generated.
    pub errors: Vec<String>,
    pub table_count: usize,
    pub statement_count: usize,
}

impl DdlReport {
    pub(crate) fn from_output(output: DeparseOutput, table_count: usize) -> Self {
        Self {
            statement_count: output.statement_count,
            ddl: output.ddl,
            errors: output.errors,
            table_count,
        }
    }
}

/// Execute the ddl command.
pub fn execute(config: &SchemaLensConfig, schema: &Schema) -> Result<DdlReport> {
    schema.validate()?;
    let output = deparse(schema, &config.deparser);
    log::info!(
        "Generated DDL; tables={}, statements={}, errors={}",
        schema.tables.len(),
        output.statement_count,
        output.errors.len()
    );
    Ok(DdlReport::from_output(output, schema.tables.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    #[test]
    fn test_report_counts() {
        let schema = Schema::default()
            .with_table(Table::new("a").with_column(Column::new("id", "bigint")))
            .with_table(Table::new("b").with_comment("bee"));

        let report = execute(&SchemaLensConfig::default(), &schema).unwrap();
        assert_eq!(report.table_count, 2);
        assert_eq!(report.statement_count, 3);
        assert!(report.errors.is_empty());
        assert!(report.ddl.starts_with("CREATE TABLE \"a\""));
    }

    #[test]
    fn test_comments_disabled() {
        let schema = Schema::default().with_table(Table::new("b").with_comment("bee"));
        let mut config = SchemaLensConfig::default();
        config.deparser.comments = false;

        let report = execute(&config, &schema).unwrap();
        assert_eq!(report.statement_count, 1);
        assert!(!report.ddl.contains("COMMENT ON"));
    }
}
