//! Progress notification vocabulary shared by the scheduler and every
//! progress transport.
//!
//! [`ProgressStatus`] is the subset of [`JobStatus`] that is ever
//! announced to an observer, with stable integer codes for binary
//! transports. The `MSG_TYPE_*` constants name the same events for text
//! transports.

use serde::{Deserialize, Serialize};

use crate::status::JobStatus;

/// A job was picked up by a worker.
pub const MSG_TYPE_JOB_PROCESSING: &str = "job_processing";

/// A job committed its output.
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";

/// A job failed and left no output behind.
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// A job was cancelled (individually or with its run).
pub const MSG_TYPE_JOB_CANCELLED: &str = "job_cancelled";

/// Status announced in a progress event.
///
/// The discriminants are the wire codes and must not change.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing = 0,
    Completed = 1,
    Failed = 2,
    Cancelled = 3,
}

impl ProgressStatus {
    /// Integer wire code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode a wire code, returning `None` for unknown values.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ProgressStatus::Processing),
            1 => Some(ProgressStatus::Completed),
            2 => Some(ProgressStatus::Failed),
            3 => Some(ProgressStatus::Cancelled),
            _ => None,
        }
    }

    /// Message type name for text transports.
    pub fn message_type(self) -> &'static str {
        match self {
            ProgressStatus::Processing => MSG_TYPE_JOB_PROCESSING,
            ProgressStatus::Completed => MSG_TYPE_JOB_COMPLETED,
            ProgressStatus::Failed => MSG_TYPE_JOB_FAILED,
            ProgressStatus::Cancelled => MSG_TYPE_JOB_CANCELLED,
        }
    }

    /// Whether this is the final event a job will emit.
    pub fn is_terminal(self) -> bool {
        self != ProgressStatus::Processing
    }
}

impl From<ProgressStatus> for JobStatus {
    fn from(value: ProgressStatus) -> Self {
        match value {
            ProgressStatus::Processing => JobStatus::Processing,
            ProgressStatus::Completed => JobStatus::Completed,
            ProgressStatus::Failed => JobStatus::Failed,
            ProgressStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

impl TryFrom<JobStatus> for ProgressStatus {
    type Error = JobStatus;

    /// `Pending` is never announced and converts back as the error value.
    fn try_from(value: JobStatus) -> Result<Self, Self::Error> {
        match value {
            JobStatus::Pending => Err(value),
            JobStatus::Processing => Ok(ProgressStatus::Processing),
            JobStatus::Completed => Ok(ProgressStatus::Completed),
            JobStatus::Failed => Ok(ProgressStatus::Failed),
            JobStatus::Cancelled => Ok(ProgressStatus::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ProgressStatus::Processing.code(), 0);
        assert_eq!(ProgressStatus::Completed.code(), 1);
        assert_eq!(ProgressStatus::Failed.code(), 2);
        assert_eq!(ProgressStatus::Cancelled.code(), 3);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(ProgressStatus::from_code(-1), None);
        assert_eq!(ProgressStatus::from_code(4), None);
        assert_eq!(ProgressStatus::from_code(2), Some(ProgressStatus::Failed));
    }

    #[test]
    fn pending_is_never_announced() {
        assert_eq!(
            ProgressStatus::try_from(JobStatus::Pending),
            Err(JobStatus::Pending)
        );
        assert_eq!(
            ProgressStatus::try_from(JobStatus::Cancelled),
            Ok(ProgressStatus::Cancelled)
        );
    }

    #[test]
    fn only_processing_is_non_terminal() {
        assert!(!ProgressStatus::Processing.is_terminal());
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
        assert!(ProgressStatus::Cancelled.is_terminal());
    }

    #[test]
    fn message_types_are_distinct() {
        let types = [
            ProgressStatus::Processing.message_type(),
            ProgressStatus::Completed.message_type(),
            ProgressStatus::Failed.message_type(),
            ProgressStatus::Cancelled.message_type(),
        ];
        for (i, a) in types.iter().enumerate() {
            for b in &types[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
