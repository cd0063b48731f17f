//! Error types for schemalens operations.

use thiserror::Error;

/// All error types that schemalens operations can produce.
#[derive(Error, Debug)]
pub enum SchemaLensError {
    /// Invalid or missing configuration (TOML parse errors, missing explicit file, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A filesystem I/O operation failed (reading schema, patch, or history files).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A document could not be deserialized into the expected shape.
    #[error("Failed to parse {source_name}: {reason}")]
    SchemaParseError { source_name: String, reason: String },

    /// The schema violates its naming invariants.
    #[error("Invalid schema: {count} violation(s): {details}")]
    InvalidSchema { count: usize, details: String },

    /// A patch path is not a well-formed JSON pointer.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A patch operation could not be applied to the document.
    #[error("Patch operation #{index} ({op} {path}) failed: {reason}")]
    PatchFailed {
        index: usize,
        op: String,
        path: String,
        reason: String,
    },

    /// Converting a schema to or from the generic document tree failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Neither side of a merge holds the table under consideration.
    #[error("Merge failed: table '{table}' is missing from both schemas")]
    MergeFailed { table: String },

    /// One or more DDL fragments could not be generated.
    #[error("Deparse failed with {count} error(s): {details}")]
    DeparseFailed { count: usize, details: String },

    /// An appended version number does not follow the latest stored version.
    #[error("Version conflict: expected version {expected}, found {found}")]
    VersionConflict { expected: u32, found: u32 },

    /// Stored versions are not strictly increasing.
    #[error("Version {found} is out of order after version {previous}")]
    VersionOutOfOrder { previous: u32, found: u32 },

    /// A requested entity or version does not exist.
    #[error("Unknown target: {0}")]
    UnknownTarget(String),
}

impl From<serde_json::Error> for SchemaLensError {
    fn from(e: serde_json::Error) -> Self {
        SchemaLensError::SerializationError(e.to_string())
    }
}

/// Convenience type alias for `Result<T, SchemaLensError>`.
pub type Result<T> = std::result::Result<T, SchemaLensError>;
