//! Job status state machine.
//!
//! A job moves `Pending -> Processing -> {Completed | Failed | Cancelled}`
//! and never leaves a terminal state. [`StatusCell`] holds the status of a
//! live job and enforces that ordering with a compare-and-swap, so any
//! number of readers can observe a job while its worker advances it.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a single image job.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending = 0,
    Processing = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl JobStatus {
    /// `Completed`, `Failed` and `Cancelled` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => next == JobStatus::Processing,
            JobStatus::Processing => next.is_terminal(),
            _ => false,
        }
    }

    /// Lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Bracketed display label shown next to a file in a results list.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "[pending]",
            JobStatus::Processing => "[processing]",
            JobStatus::Completed => "[completed]",
            JobStatus::Failed => "[failed]",
            JobStatus::Cancelled => "[cancelled]",
        }
    }

    fn from_u8(raw: u8) -> JobStatus {
        match raw {
            0 => JobStatus::Pending,
            1 => JobStatus::Processing,
            2 => JobStatus::Completed,
            3 => JobStatus::Failed,
            _ => JobStatus::Cancelled,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StatusCell
// ---------------------------------------------------------------------------

/// Atomic holder for a [`JobStatus`] that only accepts legal transitions.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// A new cell in the `Pending` state.
    pub fn new() -> Self {
        Self(AtomicU8::new(JobStatus::Pending as u8))
    }

    /// Current status.
    pub fn get(&self) -> JobStatus {
        JobStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`, returning the previous status.
    ///
    /// Fails with [`CoreError::InvalidTransition`] and leaves the cell
    /// untouched if the state machine forbids the move.
    pub fn advance(&self, next: JobStatus) -> Result<JobStatus, CoreError> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = JobStatus::from_u8(current);
            if !from.can_transition_to(next) {
                return Err(CoreError::InvalidTransition { from, to: next });
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
