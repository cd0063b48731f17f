//! Versioned patch history of a schema.
//!
//! A history is an initial snapshot followed by numbered versions, each
//! holding the patch that turns the previous version into this one. The
//! current schema is materialized by folding every patch from version 1
//! forward.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::compute_document_operations;
use crate::error::{Result, SchemaLensError};
use crate::operation::Operation;
use crate::patch::apply_patch;
use crate::schema::Schema;

/// One stored version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersion {
    /// Version number; the first version is 1.
    pub number: u32,
    /// Operations transforming the previous version into this one.
    pub patch: Vec<Operation>,
    /// When the version was recorded.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// The full version history of one building schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    pub building_schema_id: String,
    /// Schema before version 1.
    #[serde(default)]
    pub initial: Schema,
    #[serde(default)]
    pub versions: Vec<SchemaVersion>,
}

impl VersionHistory {
    pub fn new(building_schema_id: &str, initial: Schema) -> Self {
        Self {
            building_schema_id: building_schema_id.to_string(),
            initial,
            versions: Vec::new(),
        }
    }

    /// Number of the latest version, or 0 when only the initial schema exists.
    pub fn latest_number(&self) -> u32 {
        self.versions.last().map(|v| v.number).unwrap_or(0)
    }

    /// Check that version numbers are strictly increasing.
    pub fn check_order(&self) -> Result<()> {
        let mut previous = 0;
        for version in &self.versions {
            if version.number <= previous {
                return Err(SchemaLensError::VersionOutOfOrder {
                    previous,
                    found: version.number,
                });
            }
            previous = version.number;
        }
        Ok(())
    }

    /// The schema at the latest version.
    pub fn materialize(&self) -> Result<Schema> {
        self.materialize_at(self.latest_number())
    }

    /// The schema after applying every version up to and including `number`.
    pub fn materialize_at(&self, number: u32) -> Result<Schema> {
        self.check_order()?;
        if number > self.latest_number() {
            return Err(SchemaLensError::UnknownTarget(format!(
                "version {} of '{}' (latest is {})",
                number,
                self.building_schema_id,
                self.latest_number()
            )));
        }

        let mut schema = self.initial.clone();
        for version in self.versions.iter().take_while(|v| v.number <= number) {
            schema = apply_patch(&schema, &version.patch).inspect_err(|_| {
                log::warn!(
                    "Failed to apply version {} of '{}'",
                    version.number,
                    self.building_schema_id
                )
            })?;
        }
        log::debug!(
            "Materialized '{}' at version {}",
            self.building_schema_id,
            number
        );
        Ok(schema)
    }

    /// Append a version. Its number must follow the latest one, and its
    /// patch must apply to the current schema.
    pub fn append(&mut self, version: SchemaVersion) -> Result<()> {
        let expected = self.latest_number() + 1;
        if version.number != expected {
            return Err(SchemaLensError::VersionConflict {
                expected,
                found: version.number,
            });
        }
        apply_patch(&self.materialize()?, &version.patch)?;
        self.versions.push(version);
        Ok(())
    }

    /// Record `target` as a new version. Returns the new version number, or
    /// `None` when `target` equals the current schema.
    ///
    /// The stored patch covers the whole document, so enum and extension
    /// edits replay too.
    pub fn record(&mut self, target: &Schema) -> Result<Option<u32>> {
        let current = self.materialize()?;
        let patch = compute_document_operations(&current, target)?;
        if patch.is_empty() {
            return Ok(None);
        }
        let number = self.latest_number() + 1;
        self.append(SchemaVersion {
            number,
            patch,
            created_at: Utc::now(),
        })?;
        Ok(Some(number))
    }

    /// Write the history as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Read a version history from a JSON file.
pub fn load(path: &Path) -> Result<VersionHistory> {
    let content = std::fs::read_to_string(path)?;
    let history: VersionHistory =
        serde_json::from_str(&content).map_err(|e| SchemaLensError::SchemaParseError {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
    history.initial.validate()?;
    Ok(history)
}
