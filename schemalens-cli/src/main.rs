//! CLI entry point for the schemalens schema diff tool.
//! Provides clap-based command routing for the diff, ddl, migration, merge,
//! apply, status, and replay subcommands, with exit codes mapped from the
//! error type.

mod output;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use schemalens_core::config::{CliOverrides, SchemaLensConfig};
use schemalens_core::error::SchemaLensError;
use schemalens_core::path::{EntityTarget, PathKind};
use schemalens_core::{history, operation, schema, SchemaLens};

/// Top-level CLI definition with global flags and subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "schemalens",
    about = "Diff relational schema snapshots and generate DDL",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Do not emit COMMENT ON statements
    #[arg(long, global = true)]
    no_comments: bool,

    /// Append CASCADE to DROP TABLE
    #[arg(long, global = true)]
    drop_cascade: bool,

    /// Use CREATE TABLE IF NOT EXISTS
    #[arg(long, global = true)]
    if_not_exists: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// All available schemalens subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compare two schema files
    Diff {
        #[arg(value_name = "BEFORE")]
        before: PathBuf,
        #[arg(value_name = "AFTER")]
        after: PathBuf,
        /// Tables to leave out of the comparison (comma-separated)
        #[arg(long, value_name = "TABLES", value_delimiter = ',')]
        ignore_tables: Option<Vec<String>>,
        /// Skip migration SQL generation
        #[arg(long)]
        no_sql: bool,
        /// Write the operation list to a patch file
        #[arg(long, value_name = "PATH")]
        patch_output: Option<PathBuf>,
        /// Exit code 1 if the schemas differ
        #[arg(long)]
        exit_code: bool,
    },

    /// Render a schema file as DDL
    Ddl {
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
        /// Write the DDL to a file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Render the DDL that migrates one schema file to another
    Migration {
        #[arg(value_name = "BEFORE")]
        before: PathBuf,
        #[arg(value_name = "AFTER")]
        after: PathBuf,
        /// Write the DDL to a file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Merge two schema files into a superset view
    Merge {
        #[arg(value_name = "BEFORE")]
        before: PathBuf,
        #[arg(value_name = "AFTER")]
        after: PathBuf,
    },

    /// Apply a patch file to a schema file
    Apply {
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(value_name = "PATCH")]
        patch: PathBuf,
        /// Write the patched schema to a file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Classify one table, column, index, or constraint between two schema files
    Status {
        #[arg(value_name = "BEFORE")]
        before: PathBuf,
        #[arg(value_name = "AFTER")]
        after: PathBuf,
        #[arg(long, value_name = "TABLE")]
        table: String,
        #[arg(long, value_name = "COLUMN", conflicts_with_all = ["index", "constraint"])]
        column: Option<String>,
        #[arg(long, value_name = "INDEX", conflicts_with = "constraint")]
        index: Option<String>,
        #[arg(long, value_name = "CONSTRAINT")]
        constraint: Option<String>,
        /// Attribute kind, e.g. column-type or index-columns
        #[arg(long, value_name = "KIND")]
        kind: Option<PathKind>,
    },

    /// Materialize a schema from a version history file
    Replay {
        #[arg(value_name = "HISTORY")]
        history: PathBuf,
        /// Stop at this version (default: latest)
        #[arg(long, value_name = "N")]
        version: Option<u32>,
        /// Write the schema to a file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &SchemaLensError) -> i32 {
    match error {
        SchemaLensError::ConfigError(_) => 2,
        SchemaLensError::IoError(_) => 3,
        SchemaLensError::SchemaParseError { .. } | SchemaLensError::InvalidSchema { .. } => 4,
        SchemaLensError::InvalidPath { .. } | SchemaLensError::PatchFailed { .. } => 5,
        SchemaLensError::DeparseFailed { .. } => 6,
        SchemaLensError::VersionConflict { .. } | SchemaLensError::VersionOutOfOrder { .. } => 7,
        SchemaLensError::UnknownTarget(_) => 8,
        _ => 1,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), SchemaLensError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<(), SchemaLensError> {
    std::fs::write(path, content)?;
    println!("{}", format!("Written to {}", path.display()).green());
    Ok(())
}

/// Build configuration and dispatch the chosen subcommand.
fn run(cli: Cli) -> Result<(), SchemaLensError> {
    let json_output = cli.json;

    let overrides = CliOverrides {
        comments: if cli.no_comments { Some(false) } else { None },
        drop_cascade: if cli.drop_cascade { Some(true) } else { None },
        if_not_exists: if cli.if_not_exists { Some(true) } else { None },
        ignore_tables: match &cli.command {
            Commands::Diff { ignore_tables, .. } => ignore_tables.clone(),
            _ => None,
        },
        include_sql: match &cli.command {
            Commands::Diff { no_sql: true, .. } => Some(false),
            _ => None,
        },
    };

    let config = SchemaLensConfig::load(cli.config.as_deref(), &overrides)?;
    let lens = SchemaLens::new(config);

    match cli.command {
        Commands::Diff {
            before,
            after,
            patch_output,
            exit_code,
            ..
        } => {
            let report = lens.diff(&schema::load(&before)?, &schema::load(&after)?)?;
            if json_output {
                print_json(&report)?;
            } else {
                output::print_diff_report(&report);
            }
            if let Some(path) = patch_output {
                let patch = serde_json::to_string_pretty(&report.operations)?;
                write_output(&path, &patch)?;
            }
            if exit_code && report.has_changes {
                process::exit(1);
            }
        }
        Commands::Ddl { schema: path, output: output_file } => {
            let report = lens.ddl(&schema::load(&path)?)?;
            if json_output {
                print_json(&report)?;
            } else if let Some(ref file) = output_file {
                write_output(file, &report.ddl)?;
            } else {
                output::print_ddl_report(&report);
            }
            output::fail_on_errors(&report.errors)?;
        }
        Commands::Migration {
            before,
            after,
            output: output_file,
        } => {
            let report = lens.migration(&schema::load(&before)?, &schema::load(&after)?)?;
            if json_output {
                print_json(&report)?;
            } else if let Some(ref file) = output_file {
                write_output(file, &report.ddl)?;
            } else {
                output::print_ddl_report(&report);
            }
            output::fail_on_errors(&report.errors)?;
        }
        Commands::Merge { before, after } => {
            let report = lens.merge(&schema::load(&before)?, &schema::load(&after)?)?;
            if json_output {
                print_json(&report)?;
            } else {
                output::print_merge_report(&report);
            }
        }
        Commands::Apply {
            schema: path,
            patch,
            output: output_file,
        } => {
            let operations = operation::load_patch(&patch)?;
            let report = lens.apply(&schema::load(&path)?, &operations)?;
            if let Some(ref file) = output_file {
                write_output(file, &serde_json::to_string_pretty(&report.schema)?)?;
            } else if json_output {
                print_json(&report)?;
            } else {
                output::print_apply_report(&report);
            }
        }
        Commands::Status {
            before,
            after,
            table,
            column,
            index,
            constraint,
            kind,
        } => {
            let target = match (column, index, constraint) {
                (Some(c), _, _) => EntityTarget::column(&table, &c),
                (_, Some(i), _) => EntityTarget::index(&table, &i),
                (_, _, Some(c)) => EntityTarget::constraint(&table, &c),
                _ => EntityTarget::table(&table),
            };
            let report = lens.status(&schema::load(&before)?, &schema::load(&after)?, &target, kind)?;
            if json_output {
                print_json(&report)?;
            } else {
                output::print_status_report(&report);
            }
        }
        Commands::Replay {
            history: path,
            version,
            output: output_file,
        } => {
            let history = history::load(&path)?;
            let report = lens.replay(&history, version)?;
            if let Some(ref file) = output_file {
                write_output(file, &serde_json::to_string_pretty(&report.schema)?)?;
            } else if json_output {
                print_json(&report)?;
            } else {
                output::print_replay_report(&report);
            }
        }
    }

    Ok(())
}

/// Actionable hint for an error, if there is one.
fn hint(error: &SchemaLensError) -> Option<&'static str> {
    match error {
        SchemaLensError::ConfigError(_) => {
            Some("Check your schemalens.toml or the SCHEMALENS_* environment variables.")
        }
        SchemaLensError::InvalidSchema { .. } => {
            Some("Every table, column, index, and constraint name must match its key.")
        }
        SchemaLensError::PatchFailed { .. } => {
            Some("The patch was likely computed against a different schema version.")
        }
        SchemaLensError::DeparseFailed { .. } => {
            Some("Statements that could be generated were still printed above.")
        }
        SchemaLensError::VersionOutOfOrder { .. } => {
            Some("Version numbers in a history file must be strictly increasing.")
        }
        SchemaLensError::VersionConflict { .. } => {
            Some("An appended version must be numbered one past the latest version.")
        }
        SchemaLensError::UnknownTarget(_) => {
            Some("Run 'schemalens diff' to list the entities that exist in either schema.")
        }
        _ => None,
    }
}

/// Print a formatted error message with actionable hints to stderr.
fn print_error(error: &SchemaLensError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);
    if let Some(hint) = hint(error) {
        eprintln!("{}", format!("Hint: {hint}").dimmed());
    }
}
