//! The ordered list of input files a batch is built from.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pixbatch_core::CoreError;

use crate::error::BatchError;

/// Ordered input paths plus the flag that locks them while a run is active.
///
/// Positions become job indices when a run starts, so the list refuses to
/// change while a run built from it is still in flight.
#[derive(Debug, Default)]
pub struct JobList {
    inputs: Vec<PathBuf>,
    active: Arc<AtomicBool>,
}

/// Held by a run for its whole lifetime. Dropping it unlocks the list.
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunGuard {
    /// Set `flag` and return a guard that clears it, or `None` if it was
    /// already set.
    pub(crate) fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            active: Arc::clone(flag),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

impl JobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn get(&self, position: usize) -> Option<&Path> {
        self.inputs.get(position).map(PathBuf::as_path)
    }

    pub fn is_run_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Append one input. Duplicates are allowed.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<(), BatchError> {
        self.ensure_idle()?;
        let path = path.into();
        validate(&path)?;
        self.inputs.push(path);
        Ok(())
    }

    /// Append several inputs. Either all of them are added or none.
    pub fn extend<I, P>(&mut self, paths: I) -> Result<(), BatchError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ensure_idle()?;
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        for path in &paths {
            validate(path)?;
        }
        self.inputs.extend(paths);
        Ok(())
    }

    pub fn remove(&mut self, position: usize) -> Result<PathBuf, BatchError> {
        self.ensure_idle()?;
        if position >= self.inputs.len() {
            return Err(BatchError::PositionOutOfRange(position));
        }
        Ok(self.inputs.remove(position))
    }

    pub fn clear(&mut self) -> Result<(), BatchError> {
        self.ensure_idle()?;
        self.inputs.clear();
        Ok(())
    }

    /// Lock the list for a run and hand out a snapshot of its inputs.
    ///
    /// Fails with [`BatchError::EmptyBatch`] before claiming the lock, so an
    /// empty list never looks busy.
    pub(crate) fn begin_run(&self) -> Result<(RunGuard, Vec<PathBuf>), BatchError> {
        if self.inputs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let guard = RunGuard::claim(&self.active).ok_or(BatchError::RunActive)?;
        Ok((guard, self.inputs.clone()))
    }

    fn ensure_idle(&self) -> Result<(), BatchError> {
        if self.is_run_active() {
            return Err(BatchError::RunActive);
        }
        Ok(())
    }
}

/// Output names are built from the file stem, so an input must have one.
fn validate(path: &Path) -> Result<(), CoreError> {
    if path.file_stem().is_none() {
        return Err(CoreError::Validation(format!(
            "'{}' does not name a file",
            path.display()
        )));
    }
    Ok(())
}
