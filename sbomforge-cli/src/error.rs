//! CLI-specific error types and exit code mapping

use sbomforge_core::error::{ConfigError, SbomError, WorkflowFailure};
use sbomforge_spdx::SpdxError;
use sbomforge_workflow::WorkflowError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Validation finished but integrity errors were found.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from sbomforge-core.
    #[error("{0}")]
    Core(#[from] SbomError),

    /// Wrapped workflow error.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                      |
    /// |------|----------------------------------------------|
    /// | 0    | Success                                      |
    /// | 1    | General / command error                      |
    /// | 2    | Configuration error                          |
    /// | 3    | Validation found integrity errors            |
    /// | 4    | Malformed manifest or signature check failed |
    /// | 10   | IO error                                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ValidationFailed(_) => 3,
            Self::Io(_) => 10,
            Self::Core(e) => core_exit_code(e),
            Self::Workflow(e) => workflow_exit_code(e),
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

fn core_exit_code(err: &SbomError) -> i32 {
    match err {
        SbomError::Config(_) => 2,
        _ if err.is_invalid_input() => 4,
        SbomError::Workflow(WorkflowFailure::SignatureInvalid { .. }) => 4,
        SbomError::Io(_) => 10,
        _ => 1,
    }
}

fn workflow_exit_code(err: &WorkflowError) -> i32 {
    match err {
        WorkflowError::Config { .. } => 2,
        WorkflowError::Spdx(SpdxError::InvalidInput { .. })
        | WorkflowError::SignatureInvalid { .. } => 4,
        WorkflowError::Io { .. } | WorkflowError::Spdx(SpdxError::Io { .. }) => 10,
        _ => 1,
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
