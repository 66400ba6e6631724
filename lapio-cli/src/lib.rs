//! lapio command-line interface
//!
//! The `lapio` binary is a thin wrapper around [`run`].

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

use lapio_core::config::{GeneralConfig, LapioConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Resolve the logging section: config file (if readable), env, then `--log-level`.
pub async fn resolve_logging(cli: &Cli) -> GeneralConfig {
    let mut general = LapioConfig::load_or_default(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    if let Some(ref level) = cli.log_level {
        general.log_level = level.clone();
    }
    general
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, &cli.config, &writer).await,
        Commands::Directive(args) => commands::directive::execute(args, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
