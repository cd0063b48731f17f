//! Schema diffing, classification, and DDL generation for relational schemas.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use schemalens_core::config::{CliOverrides, SchemaLensConfig};
//! use schemalens_core::SchemaLens;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SchemaLensConfig::load(None, &CliOverrides::default())?;
//! let lens = SchemaLens::new(config);
//! let before = schemalens_core::schema::load(Path::new("before.json"))?;
//! let after = schemalens_core::schema::load(Path::new("after.json"))?;
//! let report = lens.diff(&before, &after)?;
//! println!("{} operation(s)", report.operations.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`schema`]: Schema model (tables, columns, indexes, constraints, enums, extensions)
//! - [`operation`]: JSON Patch operations and pointer escaping
//! - [`path`]: Path-kind recognition for patch paths
//! - [`diff`]: Minimal operation list between two schemas
//! - [`patch`]: Applying operations to a schema
//! - [`classify`]: Added / removed / modified / unchanged classification
//! - [`diff_item`]: Classified diff items carrying their values
//! - [`merge`]: Superset view of before and after
//! - [`deparser`]: DDL for schemas, single operations, and migrations
//! - [`history`]: Versioned patch history
//! - [`config`]: Configuration loading (TOML, env vars, CLI overrides)
//! - [`commands`]: Individual command implementations
//! - [`error`]: Error types

pub mod classify;
pub mod commands;
pub mod config;
pub mod deparser;
pub mod diff;
pub mod diff_item;
pub mod error;
pub mod history;
pub mod merge;
pub mod operation;
pub mod patch;
pub mod path;
pub mod schema;

use config::SchemaLensConfig;
use error::Result;
use history::VersionHistory;
use operation::Operation;
use path::{EntityTarget, PathKind};
use schema::Schema;

pub use classify::{change_status, ChangeStatus, OperationSet};
pub use commands::apply::ApplyReport;
pub use commands::ddl::DdlReport;
pub use commands::diff::{DiffReport, DiffSummary};
pub use commands::merge::MergeReport;
pub use commands::replay::ReplayReport;
pub use commands::status::StatusReport;
pub use config::CliOverrides;
pub use diff::compute_operations;
pub use diff_item::{build_schema_diff, SchemaDiffItem};
pub use error::SchemaLensError;
pub use patch::apply_patch;

/// Main entry point for the SchemaLens library.
///
/// Holds the resolved configuration; every method is a pure function of
/// its inputs and that configuration.
pub struct SchemaLens {
    pub config: SchemaLensConfig,
}

impl SchemaLens {
    pub fn new(config: SchemaLensConfig) -> Self {
        Self { config }
    }

    /// Diff two schemas: operations, classified items, summary, and migration DDL.
    pub fn diff(&self, before: &Schema, after: &Schema) -> Result<DiffReport> {
        commands::diff::execute(&self.config, before, after)
    }

    /// Render a schema as DDL.
    pub fn ddl(&self, schema: &Schema) -> Result<DdlReport> {
        commands::ddl::execute(&self.config, schema)
    }

    /// Render the DDL migrating `before` to `after`.
    pub fn migration(&self, before: &Schema, after: &Schema) -> Result<DdlReport> {
        commands::migration::execute(&self.config, before, after)
    }

    /// Build the merged before/after view.
    pub fn merge(&self, before: &Schema, after: &Schema) -> Result<MergeReport> {
        commands::merge::execute(before, after)
    }

    /// Apply a patch to a schema.
    pub fn apply(&self, schema: &Schema, operations: &[Operation]) -> Result<ApplyReport> {
        commands::apply::execute(schema, operations)
    }

    /// Classify one entity, or one attribute of it, between two schemas.
    pub fn status(
        &self,
        before: &Schema,
        after: &Schema,
        target: &EntityTarget,
        kind: Option<PathKind>,
    ) -> Result<StatusReport> {
        commands::status::execute(before, after, target, kind)
    }

    /// Materialize a schema from its version history.
    pub fn replay(&self, history: &VersionHistory, version: Option<u32>) -> Result<ReplayReport> {
        commands::replay::execute(history, version)
    }
}
