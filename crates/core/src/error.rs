use std::path::PathBuf;

use crate::status::JobStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-job failure taxonomy reported by a transform registry.
///
/// Every variant except [`TransformError::Cancelled`] ends the job as
/// [`JobStatus::Failed`]. Cancellation is an expected terminal state and
/// is carried here only so the registry can report where it stopped.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The source file is missing, unreadable, or empty.
    #[error("Input unreadable: {path}: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    /// The operation itself returned an error or panicked.
    #[error("Transform fault: {0}")]
    TransformFault(String),

    /// Writing or committing the output file failed.
    #[error("Output write failed: {path}: {reason}")]
    OutputWriteFailure { path: PathBuf, reason: String },

    /// A cancellation checkpoint observed the job's scope as cancelled.
    #[error("Cancelled by user")]
    Cancelled,
}

impl TransformError {
    /// The terminal job status this outcome maps to.
    pub fn terminal_status(&self) -> JobStatus {
        match self {
            TransformError::Cancelled => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }

    /// Whether this outcome is a cancellation rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransformError::Cancelled)
    }
}
