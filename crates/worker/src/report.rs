//! End-of-run results.

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use pixbatch_core::{JobIndex, JobStatus, TransformKind};

use crate::job::ImageJob;

/// Final state of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub index: JobIndex,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status: JobStatus,
    /// Why the job failed. `None` for completed and cancelled jobs.
    pub error: Option<String>,
}

impl JobReport {
    pub(crate) fn of(job: &ImageJob, error: Option<String>) -> Self {
        Self {
            index: job.index(),
            input_path: job.input_path().to_path_buf(),
            output_path: job.output_path().to_path_buf(),
            status: job.status(),
            error,
        }
    }
}

/// Outcome of a whole run, jobs in index order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub kind: TransformKind,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub jobs: Vec<JobReport>,
}

impl BatchSummary {
    pub(crate) fn new(run_id: Uuid, kind: TransformKind, jobs: Vec<JobReport>) -> Self {
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        Self {
            run_id,
            kind,
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            cancelled: count(JobStatus::Cancelled),
            jobs,
        }
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    /// Whether every job completed.
    pub fn is_success(&self) -> bool {
        self.completed == self.jobs.len()
    }

    pub fn status(&self, index: JobIndex) -> Option<JobStatus> {
        self.jobs.get(index as usize).map(|j| j.status)
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs.iter().map(|j| j.status).collect()
    }

    /// Output paths of completed jobs, in index order.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .map(|j| j.output_path.clone())
            .collect()
    }
}
