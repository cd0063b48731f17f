//! Render the DDL that migrates one schema to another.

use crate::config::SchemaLensConfig;
use crate::deparser::deparse_migration;
use crate::error::Result;
use crate::schema::Schema;

use super::ddl::DdlReport;

/// Execute the migration command.
pub fn execute(config: &SchemaLensConfig, before: &Schema, after: &Schema) -> Result<DdlReport> {
    before.validate()?;
    after.validate()?;
    let output = deparse_migration(before, after, &config.deparser)?;
    log::info!(
        "Generated migration; statements={}, errors={}",
        output.statement_count,
        output.errors.len()
    );
    Ok(DdlReport::from_output(output, after.tables.len()))
}
