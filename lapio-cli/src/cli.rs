//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lapio_core::config::DocumentIdPolicy;

/// lapio -- structure log files with regex directives and bulk-index them.
///
/// Use `lapio <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "lapio", version, about, long_about = None)]
pub struct Cli {
    /// Path to the lapio.toml configuration file.
    #[arg(short, long, default_value = "lapio.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a log file into the configured index.
    Ingest(IngestArgs),

    /// Inspect and dry-run directive files.
    Directive(DirectiveArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- ingest ----

/// Ingest one log file. Flags override the configuration file.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Directive YAML file.
    #[arg(short = 'd', long)]
    pub directive: PathBuf,

    /// Log file to ingest.
    #[arg(short = 'l', long)]
    pub log: PathBuf,

    /// Target index (overrides backend.index).
    #[arg(short = 'i', long)]
    pub index: Option<String>,

    /// Number of concurrent bulk workers (overrides bulk.workers).
    #[arg(long)]
    pub workers: Option<usize>,

    /// File receiving unmatched lines (overrides ingest.error_file).
    #[arg(long)]
    pub error_file: Option<PathBuf>,

    /// Document id policy: content, content_and_position, backend.
    #[arg(long)]
    pub document_id: Option<DocumentIdPolicy>,
}

// ---- directive ----

#[derive(Args, Debug)]
pub struct DirectiveArgs {
    #[command(subcommand)]
    pub action: DirectiveAction,
}

#[derive(Subcommand, Debug)]
pub enum DirectiveAction {
    /// Load and compile a directive, reporting rules and warnings.
    Validate {
        /// Directive YAML file.
        path: PathBuf,
    },
    /// Show which rule matches a line and the document it produces.
    Test {
        /// Directive YAML file.
        path: PathBuf,
        /// Log line to classify.
        line: String,
    },
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (defaults + file + env overrides).
    Show {
        /// Show only a specific section (general, backend, bulk, ingest).
        #[arg(long)]
        section: Option<String>,
    },
}
