//! `lapio ingest` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lapio_core::config::LapioConfig;
use lapio_core::types::RunSummary;
use lapio_ingest::{CompiledDirective, ElasticsearchBackend, IngestPipelineBuilder, PipelineConfig};

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `ingest` command.
///
/// Ctrl-C stops reading; documents already handed to the dispatcher are
/// drained within `bulk.drain_timeout_secs`.
pub async fn execute(
    args: IngestArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = LapioConfig::load_or_default(config_path).await?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping ingest and draining in-flight documents");
            signal_token.cancel();
        }
    });

    let result = run(&config, &args.directive, &args.log, cancel).await;
    signal_task.abort();
    let summary = result?;

    let report = IngestReport::new(&config, &args, summary);
    writer.render(&report)?;

    if summary.has_errors() {
        return Err(CliError::RunErrors {
            errors: summary.error_count,
        });
    }
    Ok(())
}

/// CLI 플래그를 설정 위에 덮어씁니다.
pub fn apply_overrides(config: &mut LapioConfig, args: &IngestArgs) {
    if let Some(ref index) = args.index {
        config.backend.index = index.clone();
    }
    if let Some(workers) = args.workers {
        config.bulk.workers = workers;
    }
    if let Some(ref error_file) = args.error_file {
        config.ingest.error_file = error_file.display().to_string();
    }
    if let Some(policy) = args.document_id {
        config.ingest.document_id = policy;
    }
}

/// Load the directive, connect to the backend and run the pipeline once.
pub async fn run(
    config: &LapioConfig,
    directive_path: &Path,
    log_path: &Path,
    cancel: CancellationToken,
) -> Result<RunSummary, CliError> {
    let directive = CompiledDirective::load(directive_path).await?;
    info!(
        directive = directive.name(),
        rules = directive.rule_count(),
        "directive loaded"
    );

    let backend = Arc::new(ElasticsearchBackend::new(&config.backend)?);
    let mut pipeline = IngestPipelineBuilder::new(directive, backend)
        .config(PipelineConfig::from_core(config))
        .cancel_token(cancel)
        .build()?;

    Ok(pipeline.run(log_path).await?)
}

/// Ingest run summary.
#[derive(Serialize)]
pub struct IngestReport {
    pub log_file: String,
    pub index: String,
    pub rows: u64,
    pub indexed: u64,
    pub errors: u64,
    /// Present only when errors occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<String>,
}

impl IngestReport {
    pub fn new(config: &LapioConfig, args: &IngestArgs, summary: RunSummary) -> Self {
        Self {
            log_file: args.log.display().to_string(),
            index: config.backend.index.clone(),
            rows: summary.row_count,
            indexed: summary.indexed_entries,
            errors: summary.error_count,
            error_file: summary
                .has_errors()
                .then(|| config.ingest.error_file.clone()),
        }
    }
}

impl Render for IngestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Ingest: {} -> {}", self.log_file.bold(), self.index)?;
        writeln!(w, "  Entries total:   {}", self.rows)?;
        writeln!(w, "  Entries indexed: {}", self.indexed.to_string().green())?;
        if self.errors > 0 {
            writeln!(w, "  Errors:          {}", self.errors.to_string().red())?;
        } else {
            writeln!(w, "  Errors:          {}", self.errors)?;
        }
        if let Some(ref path) = self.error_file {
            writeln!(w, "  Unmatched lines written to {path}")?;
        }
        Ok(())
    }
}
