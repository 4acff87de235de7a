#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use pixbatch_core::{JobIndex, ProgressStatus, TransformError, TransformKind};
use pixbatch_events::ProgressNotifier;
use pixbatch_worker::{JobList, Scheduler, TransformRegistry};

/// Install a test subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixbatch_worker=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// FakeRegistry
// ---------------------------------------------------------------------------

/// Registry whose behavior is picked by the input file stem prefix:
///
/// | Prefix  | Behavior                                                    |
/// |---------|-------------------------------------------------------------|
/// | `fail`  | writes junk to the output, then returns a fault             |
/// | `panic` | writes junk to the output, then panics                      |
/// | `hold`  | blocks until its scope is cancelled                         |
/// | `late`  | commits, signals `committed`, then waits for `release`      |
/// | `gated` | waits for `gate` (ignoring cancellation), then commits      |
/// | other   | sleeps `delay` (cancellable), then commits                  |
pub struct FakeRegistry {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    pub committed: Notify,
    pub release: Notify,
    pub gate: Notify,
}

impl FakeRegistry {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            committed: Notify::new(),
            release: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Number of times `run` was entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `run` calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransformRegistry for FakeRegistry {
    async fn run(
        &self,
        _kind: TransformKind,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if stem.starts_with("fail") {
            tokio::fs::write(output, b"junk").await.unwrap();
            return Err(TransformError::TransformFault("decoder rejected input".into()));
        }
        if stem.starts_with("panic") {
            tokio::fs::write(output, b"junk").await.unwrap();
            panic!("transform blew up on {stem}");
        }
        if stem.starts_with("hold") {
            cancel.cancelled().await;
            return Err(TransformError::Cancelled);
        }
        if stem.starts_with("late") {
            tokio::fs::write(output, b"processed").await.unwrap();
            self.committed.notify_one();
            self.release.notified().await;
            return Ok(());
        }

        if stem.starts_with("gated") {
            self.gate.notified().await;
            tokio::fs::write(output, b"processed").await.unwrap();
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(TransformError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }
        tokio::fs::write(output, b"processed").await.unwrap();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Notifier that logs every event and tracks how many jobs are in
/// `Processing` at once.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(JobIndex, ProgressStatus)>>,
    processing: AtomicUsize,
    peak: AtomicUsize,
}

impl ProgressNotifier for Recorder {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        if status == ProgressStatus::Processing {
            let now = self.processing.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        } else {
            self.processing.fetch_sub(1, Ordering::SeqCst);
        }
        self.events.lock().unwrap().push((index, status));
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<(JobIndex, ProgressStatus)> {
        self.events.lock().unwrap().clone()
    }

    /// Drain the log, e.g. between two runs.
    pub fn take(&self) -> Vec<(JobIndex, ProgressStatus)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn peak_processing(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait until `(index, status)` has been reported.
    pub async fn wait_for(&self, index: JobIndex, status: ProgressStatus) {
        let seen = async {
            while !self.events.lock().unwrap().contains(&(index, status)) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), seen)
            .await
            .unwrap_or_else(|_| panic!("job {index} never reported {status:?}"));
    }
}

/// Check every job in `0..job_count` reported exactly `Processing` then one
/// terminal status, and return those terminal statuses in index order.
pub fn terminal_statuses(
    events: &[(JobIndex, ProgressStatus)],
    job_count: usize,
) -> Vec<ProgressStatus> {
    (0..job_count as JobIndex)
        .map(|index| {
            let seen: Vec<ProgressStatus> = events
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, s)| *s)
                .collect();
            assert_eq!(seen.len(), 2, "job {index} reported {seen:?}");
            assert_eq!(seen[0], ProgressStatus::Processing, "job {index}");
            assert!(seen[1].is_terminal(), "job {index} reported {seen:?}");
            seen[1]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dir: TempDir,
    pub registry: Arc<FakeRegistry>,
    pub recorder: Arc<Recorder>,
    pub scheduler: Scheduler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(10))
    }

    pub fn with_delay(delay: Duration) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(FakeRegistry::new(delay));
        let recorder = Arc::new(Recorder::default());
        let scheduler = Scheduler::new(
            Arc::clone(&registry) as Arc<dyn TransformRegistry>,
            Arc::clone(&recorder) as Arc<dyn ProgressNotifier>,
            dir.path().join("Output"),
        );
        Self {
            dir,
            registry,
            recorder,
            scheduler,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("Output")
    }

    pub fn input(&self, name: &str) -> PathBuf {
        self.dir.path().join("in").join(name)
    }

    /// A list over `names`, resolved under the temp dir.
    pub fn list(&self, names: &[&str]) -> JobList {
        let mut list = JobList::new();
        list.extend(names.iter().map(|name| self.input(name))).unwrap();
        list
    }

    /// Where `name` lands for `kind`.
    pub fn output(&self, name: &str, kind: TransformKind) -> PathBuf {
        pixbatch_core::naming::output_path(&self.output_dir(), &self.input(name), kind).unwrap()
    }
}
