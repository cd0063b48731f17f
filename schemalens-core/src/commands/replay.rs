//! Materialize a schema from its stored version history.

use serde::Serialize;

use crate::error::Result;
use crate::history::VersionHistory;
use crate::schema::Schema;

/// Report produced by the replay command.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub building_schema_id: String,
    pub schema: Schema,
    /// Version the schema was materialized at.
    pub version: u32,
    /// Number of patches folded onto the initial schema.
    pub versions_applied: usize,
}

/// Execute the replay command. `version` defaults to the latest one.
pub fn execute(history: &VersionHistory, version: Option<u32>) -> Result<ReplayReport> {
    let version = version.unwrap_or_else(|| history.latest_number());
    let schema = history.materialize_at(version)?;
    let versions_applied = history
        .versions
        .iter()
        .filter(|v| v.number <= version)
        .count();

    log::info!(
        "Replayed '{}' to version {}; patches={}",
        history.building_schema_id,
        version,
        versions_applied
    );

    Ok(ReplayReport {
        building_schema_id: history.building_schema_id.clone(),
        schema,
        version,
        versions_applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaLensError;
    use crate::schema::{Column, Table};

    fn history() -> VersionHistory {
        let mut history = VersionHistory::new("bs-1", Schema::default());
        history
            .record(&Schema::default().with_table(Table::new("users")))
            .unwrap();
        history
            .record(
                &Schema::default()
                    .with_table(Table::new("users").with_column(Column::new("id", "bigint"))),
            )
            .unwrap();
        history
    }

    #[test]
    fn test_replay_latest() {
        let report = execute(&history(), None).unwrap();
        assert_eq!(report.version, 2);
        assert_eq!(report.versions_applied, 2);
        assert!(report.schema.tables["users"].columns.contains_key("id"));
    }

    #[test]
    fn test_replay_earlier_version() {
        let report = execute(&history(), Some(1)).unwrap();
        assert_eq!(report.versions_applied, 1);
        assert!(report.schema.tables["users"].columns.is_empty());
    }

    #[test]
    fn test_replay_unknown_version() {
        assert!(matches!(
            execute(&history(), Some(7)),
            Err(SchemaLensError::UnknownTarget(_))
        ));
    }
}
