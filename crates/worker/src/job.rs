//! The unit of work of a batch run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use pixbatch_core::{CoreError, JobIndex, JobStatus, StatusCell};

/// One input file bound to its output path, status and cancellation scope.
///
/// Jobs are owned by their run and shared with worker tasks by reference;
/// the status cell, the cancellation token and the `announced` flag are the
/// only mutable parts.
#[derive(Debug)]
pub struct ImageJob {
    index: JobIndex,
    input_path: PathBuf,
    output_path: PathBuf,
    status: StatusCell,
    cancel: CancellationToken,
    announced: AtomicBool,
}

impl ImageJob {
    pub fn new(
        index: JobIndex,
        input_path: PathBuf,
        output_path: PathBuf,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            input_path,
            output_path,
            status: StatusCell::new(),
            cancel,
            announced: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> JobIndex {
        self.index
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn status(&self) -> JobStatus {
        self.status.get()
    }

    /// The scope this job's worker observes at its checkpoints.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation has been requested for this job or its run.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request cancellation of this job only.
    ///
    /// Returns `false` without doing anything if the job is already
    /// terminal.
    pub fn request_cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// `Pending -> Processing`.
    pub(crate) fn begin(&self) -> Result<(), CoreError> {
        self.status.advance(JobStatus::Processing).map(|_| ())
    }

    /// Record that the `Processing` event for this job has been emitted.
    pub(crate) fn mark_announced(&self) {
        self.announced.store(true, Ordering::Release);
    }

    pub(crate) fn is_announced(&self) -> bool {
        self.announced.load(Ordering::Acquire)
    }

    /// `Processing -> terminal`.
    pub(crate) fn finish(&self, status: JobStatus) -> Result<(), CoreError> {
        self.status.advance(status).map(|_| ())
    }
}
