//! Configuration loading and resolution.
//!
//! Supports a TOML config file, environment variables, and CLI overrides
//! with a defined priority order (CLI > env > TOML > defaults).

use serde::Deserialize;

use crate::error::{Result, SchemaLensError};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "schemalens.toml";

/// Helper macro to apply an optional owned value directly to a target field.
///
/// Replaces: `if let Some(v) = $opt { $target = v; }`
macro_rules! apply_option {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = v;
        }
    };
}

/// Helper macro to clone a borrowed optional value directly to a target field.
///
/// Replaces: `if let Some(ref v) = $opt { $target = v.clone(); }`
macro_rules! apply_option_clone {
    ($opt:expr => $target:expr) => {
        if let Some(ref v) = $opt {
            $target = v.clone();
        }
    };
}

/// Top-level configuration for schemalens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaLensConfig {
    /// DDL generation settings.
    pub deparser: DeparserConfig,
    /// Diff report settings.
    pub diff: DiffConfig,
}

/// DDL generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DeparserConfig {
    /// Emit `COMMENT ON` statements for tables, columns, and enum types.
    pub comments: bool,
    /// Emit `CREATE EXTENSION` statements.
    pub extensions: bool,
    /// Emit `CREATE TYPE ... AS ENUM` statements.
    pub enums: bool,
    /// Append `CASCADE` to `DROP TABLE`.
    pub drop_cascade: bool,
    /// Use `CREATE TABLE IF NOT EXISTS`.
    pub if_not_exists: bool,
}

impl Default for DeparserConfig {
    fn default() -> Self {
        Self {
            comments: true,
            extensions: true,
            enums: true,
            drop_cascade: false,
            if_not_exists: false,
        }
    }
}

/// Diff report settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffConfig {
    /// Tables whose operations are left out of diff reports.
    pub ignore_tables: Vec<String>,
    /// Attach migration SQL to diff reports.
    pub include_sql: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignore_tables: Vec::new(),
            include_sql: true,
        }
    }
}

// ── TOML deserialization structs ──

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    deparser: Option<TomlDeparserConfig>,
    diff: Option<TomlDiffConfig>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlDeparserConfig {
    comments: Option<bool>,
    extensions: Option<bool>,
    enums: Option<bool>,
    drop_cascade: Option<bool>,
    if_not_exists: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlDiffConfig {
    ignore_tables: Option<Vec<String>>,
    include_sql: Option<bool>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override whether comments are emitted.
    pub comments: Option<bool>,
    /// Override whether `DROP TABLE` cascades.
    pub drop_cascade: Option<bool>,
    /// Override `CREATE TABLE IF NOT EXISTS`.
    pub if_not_exists: Option<bool>,
    /// Override the ignored table list.
    pub ignore_tables: Option<Vec<String>>,
    /// Override whether diff reports carry SQL.
    pub include_sql: Option<bool>,
}

impl SchemaLensConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = SchemaLensConfig::default();

        // Layer 3: TOML config file
        let toml_path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
        if let Ok(content) = std::fs::read_to_string(toml_path) {
            let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
                SchemaLensError::ConfigError(format!(
                    "Failed to parse config file '{}': {}",
                    toml_path, e
                ))
            })?;
            config.apply_toml(toml_config);
            log::debug!("Loaded config file; path={}", toml_path);
        } else if config_path.is_some() {
            // If explicitly specified, error if not found
            return Err(SchemaLensError::ConfigError(format!(
                "Config file '{}' not found",
                toml_path
            )));
        }

        // Layer 2: Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        // Layer 1: CLI overrides
        config.apply_cli(overrides);

        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(d) = toml.deparser {
            apply_option!(d.comments => self.deparser.comments);
            apply_option!(d.extensions => self.deparser.extensions);
            apply_option!(d.enums => self.deparser.enums);
            apply_option!(d.drop_cascade => self.deparser.drop_cascade);
            apply_option!(d.if_not_exists => self.deparser.if_not_exists);
        }

        if let Some(d) = toml.diff {
            apply_option!(d.ignore_tables => self.diff.ignore_tables);
            apply_option!(d.include_sql => self.diff.include_sql);
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |key: &str| lookup(key).and_then(|v| parse_bool(key, &v));

        apply_option!(flag("SCHEMALENS_DEPARSER_COMMENTS") => self.deparser.comments);
        apply_option!(flag("SCHEMALENS_DEPARSER_EXTENSIONS") => self.deparser.extensions);
        apply_option!(flag("SCHEMALENS_DEPARSER_ENUMS") => self.deparser.enums);
        apply_option!(flag("SCHEMALENS_DEPARSER_DROP_CASCADE") => self.deparser.drop_cascade);
        apply_option!(flag("SCHEMALENS_DEPARSER_IF_NOT_EXISTS") => self.deparser.if_not_exists);
        apply_option!(flag("SCHEMALENS_DIFF_INCLUDE_SQL") => self.diff.include_sql);

        if let Some(v) = lookup("SCHEMALENS_DIFF_IGNORE_TABLES") {
            self.diff.ignore_tables = v
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) {
        apply_option!(overrides.comments => self.deparser.comments);
        apply_option!(overrides.drop_cascade => self.deparser.drop_cascade);
        apply_option!(overrides.if_not_exists => self.deparser.if_not_exists);
        apply_option_clone!(overrides.ignore_tables => self.diff.ignore_tables);
        apply_option!(overrides.include_sql => self.diff.include_sql);
    }
}

/// Parse a boolean environment value; invalid values are logged and ignored.
fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!(
                "Ignoring invalid boolean value for {}; value={}, expected true or false",
                key,
                value
            );
            None
        }
    }
}
