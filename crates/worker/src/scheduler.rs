//! Bounded-parallel batch scheduler.
//!
//! [`Scheduler::start`] snapshots a [`JobList`] into one [`ImageJob`] per
//! input and spawns a dispatcher task. The dispatcher takes a semaphore
//! permit before spawning each job's worker, so at most `max_parallel` jobs
//! are ever in `Processing`. A scheduler runs one batch at a time. Every job reports exactly two progress events,
//! `Processing` followed by one terminal status, even when it was cancelled
//! before a worker picked it up.
//!
//! Faults stay inside their job: a registry error or panic ends that job as
//! `Failed` and the run carries on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OnceCell, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use pixbatch_core::config::BatchConfig;
use pixbatch_core::{
    naming, CoreError, JobIndex, JobStatus, ProgressStatus, TransformError, TransformKind,
};
use pixbatch_events::ProgressNotifier;

use crate::cancel::CancellationController;
use crate::error::BatchError;
use crate::job::ImageJob;
use crate::list::{JobList, RunGuard};
use crate::registry::TransformRegistry;
use crate::report::{BatchSummary, JobReport};

/// Starts batch runs against one registry, notifier and output directory.
///
/// At most one run per scheduler is active at a time, whichever list it was
/// built from.
pub struct Scheduler {
    registry: Arc<dyn TransformRegistry>,
    notifier: Arc<dyn ProgressNotifier>,
    output_dir: PathBuf,
    active: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn TransformRegistry>,
        notifier: Arc<dyn ProgressNotifier>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            notifier,
            output_dir: output_dir.into(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(
        config: &BatchConfig,
        registry: Arc<dyn TransformRegistry>,
        notifier: Arc<dyn ProgressNotifier>,
    ) -> Self {
        Self::new(registry, notifier, config.output_dir.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn is_run_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a run over every input in `list`.
    ///
    /// Fails with [`BatchError::RunActive`] while an earlier run of this
    /// scheduler, or any run over `list`, is still in flight. Both stay
    /// locked until the run finishes. `max_parallel` of zero is treated as
    /// one. Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        list: &JobList,
        kind: TransformKind,
        max_parallel: usize,
    ) -> Result<RunHandle, BatchError> {
        let scheduler_guard = RunGuard::claim(&self.active).ok_or(BatchError::RunActive)?;
        let (list_guard, inputs) = list.begin_run()?;
        let controller = CancellationController::new();

        let jobs = inputs
            .into_iter()
            .enumerate()
            .map(|(position, input)| -> Result<ImageJob, BatchError> {
                let index = JobIndex::try_from(position).map_err(|_| {
                    CoreError::Validation(format!("Batch exceeds {} jobs", JobIndex::MAX))
                })?;
                let output = naming::output_path(&self.output_dir, &input, kind)?;
                Ok(ImageJob::new(index, input, output, controller.job_scope()))
            })
            .collect::<Result<Vec<_>, BatchError>>()?;
        let jobs: Arc<[ImageJob]> = jobs.into();

        let width = max_parallel.clamp(1, Semaphore::MAX_PERMITS);
        let ctx = Arc::new(RunContext {
            run_id: Uuid::new_v4(),
            kind,
            registry: Arc::clone(&self.registry),
            notifier: Arc::clone(&self.notifier),
            output_dir: self.output_dir.clone(),
            output_dir_ready: OnceCell::new(),
        });

        tracing::info!(
            run_id = %ctx.run_id,
            kind = %kind,
            jobs = jobs.len(),
            max_parallel = width,
            output_dir = %ctx.output_dir.display(),
            "Batch run started",
        );

        let run_id = ctx.run_id;
        let guards = [scheduler_guard, list_guard];
        let task = tokio::spawn(dispatch(ctx, Arc::clone(&jobs), width, guards));

        Ok(RunHandle {
            run_id,
            kind,
            jobs,
            controller,
            task,
        })
    }
}

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

/// Control and observation handle for one run.
///
/// Dropping the handle detaches the run; it still finishes and unlocks its
/// list and scheduler.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    kind: TransformKind,
    jobs: Arc<[ImageJob]>,
    controller: CancellationController,
    task: JoinHandle<BatchSummary>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, index: JobIndex) -> Option<&ImageJob> {
        self.jobs.get(index as usize)
    }

    pub fn status(&self, index: JobIndex) -> Option<JobStatus> {
        self.job(index).map(ImageJob::status)
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs.iter().map(ImageJob::status).collect()
    }

    /// Cancel every job that has not reached a terminal state.
    pub fn cancel_all(&self) {
        tracing::info!(run_id = %self.run_id, "Batch cancellation requested");
        self.controller.cancel_all();
    }

    /// Cancel one job. Returns `Ok(false)` if it had already finished.
    pub fn cancel_job(&self, index: JobIndex) -> Result<bool, BatchError> {
        let job = self.job(index).ok_or(BatchError::JobNotFound(index))?;
        let requested = self.controller.cancel_job(job);
        if requested {
            tracing::info!(run_id = %self.run_id, index, "Job cancellation requested");
        }
        Ok(requested)
    }

    pub fn is_cancelled(&self) -> bool {
        self.controller.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for every job to reach a terminal state.
    pub async fn wait(self) -> BatchSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "Batch dispatcher aborted");
                let reports = self.jobs.iter().map(|job| JobReport::of(job, None)).collect();
                BatchSummary::new(self.run_id, self.kind, reports)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

struct RunContext {
    run_id: Uuid,
    kind: TransformKind,
    registry: Arc<dyn TransformRegistry>,
    notifier: Arc<dyn ProgressNotifier>,
    output_dir: PathBuf,
    output_dir_ready: OnceCell<()>,
}

impl RunContext {
    /// Create the output directory once per run, before the first write.
    async fn ensure_output_dir(&self) -> Result<(), TransformError> {
        self.output_dir_ready
            .get_or_try_init(|| async { tokio::fs::create_dir_all(&self.output_dir).await })
            .await
            .map(|_| ())
            .map_err(|e| TransformError::OutputWriteFailure {
                path: self.output_dir.clone(),
                reason: e.to_string(),
            })
    }
}

async fn dispatch(
    ctx: Arc<RunContext>,
    jobs: Arc<[ImageJob]>,
    width: usize,
    _guards: [RunGuard; 2],
) -> BatchSummary {
    let started = Instant::now();
    let slots = Arc::new(Semaphore::new(width));
    let mut workers = JoinSet::new();

    for position in 0..jobs.len() {
        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let ctx = Arc::clone(&ctx);
        let jobs = Arc::clone(&jobs);
        workers.spawn(async move {
            let report = process_job(&ctx, &jobs[position]).await;
            drop(permit);
            report
        });
    }

    let mut reports: Vec<Option<JobReport>> = vec![None; jobs.len()];
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(report) => {
                let slot = report.index as usize;
                reports[slot] = Some(report);
            }
            Err(e) => {
                tracing::error!(run_id = %ctx.run_id, error = %e, "Job worker aborted");
            }
        }
    }

    // A worker that died outside the registry call still owes its events.
    let mut settled = Vec::with_capacity(jobs.len());
    for (report, job) in reports.into_iter().zip(jobs.iter()) {
        let report = match report {
            Some(report) => report,
            None => recover(&ctx, job).await,
        };
        settled.push(report);
    }
    let reports = settled;

    let summary = BatchSummary::new(ctx.run_id, ctx.kind, reports);
    tracing::info!(
        run_id = %ctx.run_id,
        completed = summary.completed,
        failed = summary.failed,
        cancelled = summary.cancelled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch run finished",
    );
    summary
}

/// Drive one job from `Pending` to a terminal state.
async fn process_job(ctx: &RunContext, job: &ImageJob) -> JobReport {
    if let Err(e) = job.begin() {
        tracing::error!(run_id = %ctx.run_id, index = job.index(), error = %e, "Job could not start");
        return JobReport::of(job, Some(e.to_string()));
    }
    ctx.notifier.notify(job.index(), ProgressStatus::Processing);
    job.mark_announced();
    tracing::debug!(
        run_id = %ctx.run_id,
        index = job.index(),
        input = %job.input_path().display(),
        "Job processing",
    );

    let outcome = execute(ctx, job).await;

    let (status, error) = match outcome {
        Ok(()) => (JobStatus::Completed, None),
        Err(e) => (e.terminal_status(), (!e.is_cancelled()).then(|| e.to_string())),
    };
    if status != JobStatus::Completed {
        discard_output(ctx, job.output_path()).await;
    }
    settle(ctx, job, status, error)
}

/// Run the registry for one job inside its own task so a panic stays local.
async fn execute(ctx: &RunContext, job: &ImageJob) -> Result<(), TransformError> {
    if job.is_cancel_requested() {
        return Err(TransformError::Cancelled);
    }
    ctx.ensure_output_dir().await?;

    let registry = Arc::clone(&ctx.registry);
    let kind = ctx.kind;
    let input = job.input_path().to_path_buf();
    let output = job.output_path().to_path_buf();
    let cancel = job.cancel_token().clone();

    let task = tokio::spawn(async move { registry.run(kind, &input, &output, &cancel).await });
    match task.await {
        Ok(result) => result,
        Err(e) => Err(TransformError::TransformFault(format!(
            "Transform task aborted: {e}"
        ))),
    }
}

/// Record the terminal status and emit the terminal event.
fn settle(ctx: &RunContext, job: &ImageJob, status: JobStatus, error: Option<String>) -> JobReport {
    if let Err(e) = job.finish(status) {
        tracing::error!(run_id = %ctx.run_id, index = job.index(), error = %e, "Job status not updated");
    }
    match ProgressStatus::try_from(status) {
        Ok(event) => ctx.notifier.notify(job.index(), event),
        Err(status) => tracing::error!(
            run_id = %ctx.run_id,
            index = job.index(),
            %status,
            "Job settled without a terminal status",
        ),
    }

    match (&error, status) {
        (Some(reason), _) => tracing::warn!(
            run_id = %ctx.run_id,
            index = job.index(),
            input = %job.input_path().display(),
            error = %reason,
            "Job failed",
        ),
        (None, JobStatus::Cancelled) => {
            tracing::info!(run_id = %ctx.run_id, index = job.index(), "Job cancelled")
        }
        _ => tracing::debug!(
            run_id = %ctx.run_id,
            index = job.index(),
            output = %job.output_path().display(),
            "Job completed",
        ),
    }

    JobReport::of(job, error)
}

/// Close out a job whose worker task died before reporting.
///
/// The job still gets its `Processing` event first if the worker died
/// before emitting it.
async fn recover(ctx: &RunContext, job: &ImageJob) -> JobReport {
    if job.status().is_terminal() {
        return JobReport::of(job, None);
    }
    if job.status() == JobStatus::Pending {
        if let Err(e) = job.begin() {
            tracing::error!(run_id = %ctx.run_id, index = job.index(), error = %e, "Job could not start");
        }
    }
    if !job.is_announced() {
        ctx.notifier.notify(job.index(), ProgressStatus::Processing);
        job.mark_announced();
    }
    discard_output(ctx, job.output_path()).await;
    settle(ctx, job, JobStatus::Failed, Some("Job worker aborted".to_string()))
}

/// Remove whatever a failed or cancelled job may have left at its output path.
async fn discard_output(ctx: &RunContext, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(run_id = %ctx.run_id, path = %path.display(), "Removed output");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                run_id = %ctx.run_id,
                path = %path.display(),
                error = %e,
                "Failed to remove output",
            );
        }
    }
}
