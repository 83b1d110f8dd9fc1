//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::interchange::ExportFormat;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// finrec - personal income and expense records with portable export/import
#[derive(Parser, Debug)]
#[command(name = "finrec", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.finrec/data/finrec.db)
    #[arg(long, global = true, env = "FINREC_DB")]
    pub db: Option<PathBuf>,

    /// Data home holding photos and scratch files (default: ~/.finrec)
    #[arg(long, global = true, env = "FINREC_HOME")]
    pub home: Option<PathBuf>,

    /// User whose records are read and written
    #[arg(long, global = true, env = "FINREC_USER")]
    pub user: Option<i64>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and storage directories
    Init {
        /// Recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Manage financial records
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Income, expense and balance overview
    Summary,

    /// Export records to a JSON, SQL, or ZIP file
    Export(ExportArgs),

    /// Import records from a ZIP, JSON, or SQL file
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Check whether a file is acceptable for import
    Validate {
        /// File to check
        file: PathBuf,
    },

    /// Delete export files older than the given age
    Cleanup {
        /// Maximum age in minutes
        #[arg(long, default_value_t = crate::config::DEFAULT_TEMP_MAX_AGE_MINUTES)]
        max_age: u64,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Record Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a record
    Add(RecordArgs),

    /// List records, newest first
    List(FilterArgs),

    /// Show one record
    Show {
        /// Record ID
        id: i64,
    },

    /// Replace a record's fields
    Update {
        /// Record ID
        id: i64,

        #[command(flatten)]
        record: RecordArgs,

        /// Remove the attached photo
        #[arg(long, conflicts_with = "photo")]
        remove_photo: bool,
    },

    /// Delete a record and its photo
    Delete {
        /// Record ID
        id: i64,
    },
}

/// Fields of a record as entered on the command line.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Record title
    pub title: String,

    /// Transaction type (income, expense)
    #[arg(long = "type", short = 't')]
    pub kind: String,

    /// Amount, e.g. 150000 or 1250.50
    #[arg(long, short = 'a')]
    pub amount: String,

    /// Report date (YYYY-MM-DD)
    #[arg(long, short = 'd')]
    pub date: String,

    /// Free-text description
    #[arg(long)]
    pub description: Option<String>,

    /// Category (operational, salary, utilities, marketing, sales, investment, other)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Image file to attach
    #[arg(long)]
    pub photo: Option<PathBuf>,
}

/// Record selection shared by `record list` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only this transaction type (income, expense)
    #[arg(long = "type", short = 't')]
    pub kind: Option<String>,

    /// Only this category
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Earliest report date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest report date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Data format (json, sql)
    #[arg(long, short = 'f', default_value = "json")]
    pub data_format: ExportFormat,

    /// Pack photos into a ZIP archive
    #[arg(long)]
    pub photos: bool,

    /// Copy the finished file into this directory
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,
}
