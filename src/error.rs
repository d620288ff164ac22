//! Error types for the snippet sandbox.
//!
//! Only conditions that leave no job to report into surface as
//! [`SandboxError`]. Everything that goes wrong inside a job (format,
//! compile, launch, run, timeout) is a [`SandboxOutcome`] value instead.
//!
//! [`SandboxOutcome`]: crate::sandbox::outcome::SandboxOutcome

use thiserror::Error;

/// Errors that escape the pipeline and reach the dispatcher.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The job's artifacts could not be materialized in the scratch directory.
    #[error("failed to materialize workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// No handler is registered under the requested command name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The result could not be handed to the delivery capability.
    #[error("failed to deliver reply: {0}")]
    Delivery(#[source] anyhow::Error),

    /// I/O error outside of any job stage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Check if this error came from workspace materialization.
    pub fn is_workspace(&self) -> bool {
        matches!(self, SandboxError::Workspace(_))
    }

    /// Check if this error represents an unknown command.
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, SandboxError::UnknownCommand(_))
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
