//! CLI-specific error types and exit code mapping

use lapio_core::error::LapioError;
use lapio_ingest::IngestError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The backend could not be reached at startup.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Ingest finished but some lines or documents were not indexed.
    #[error("ingest completed with {errors} error(s)")]
    RunErrors { errors: u64 },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from lapio-core.
    #[error("{0}")]
    Core(#[from] LapioError),

    /// Ingest pipeline error that is not config, backend or IO related.
    #[error("ingest error: {0}")]
    Ingest(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Backend unavailable              |
    /// | 4    | Ingest completed with errors     |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LapioError::Config(_)) => 2,
            Self::BackendUnavailable(_) => 3,
            Self::RunErrors { .. } => 4,
            Self::Io(_) | Self::Core(LapioError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Ingest(_) => 1,
        }
    }
}

impl From<IngestError> for CliError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::BackendUnavailable(reason) => Self::BackendUnavailable(reason),
            IngestError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Ingest(other.to_string()),
        }
    }
}
