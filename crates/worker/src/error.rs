use pixbatch_core::{CoreError, JobIndex};

/// Errors returned by batch-level operations.
///
/// Per-job faults never appear here: they end the job as `Failed` and are
/// reported in the run's summary instead.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A run is in progress, so the list cannot change and no other run can start.
    #[error("A batch run is already active")]
    RunActive,

    #[error("Cannot start a batch with no jobs")]
    EmptyBatch,

    #[error("Job {0} is not part of this run")]
    JobNotFound(JobIndex),

    #[error("List position {0} is out of range")]
    PositionOutOfRange(usize),

    #[error(transparent)]
    Core(#[from] CoreError),
}
