//! Transform registry: maps a [`TransformKind`] to the code that performs it.
//!
//! The scheduler only knows the [`TransformRegistry`] trait. The bundled
//! [`OperationRegistry`] implements it over plain byte-to-byte operations
//! and owns the I/O around them: reading the source, running the operation
//! on the blocking pool, and committing the output through a staging file
//! so a failed or cancelled job never leaves a visible partial output.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use pixbatch_core::{TransformError, TransformKind};

/// Extension appended to the output file name while it is being written.
pub const STAGING_SUFFIX: &str = ".partial";

/// Executes one transform for one job.
///
/// Implementations must observe `cancel` at least before starting and
/// before committing output, and must not leave a file at `output` on any
/// error path. Returning `Ok` means the output is committed. `run` must not
/// return while work it started is still running, since the scheduler frees
/// the job's slot as soon as it does.
#[async_trait]
pub trait TransformRegistry: Send + Sync {
    async fn run(
        &self,
        kind: TransformKind,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TransformError>;
}

/// A pure image operation: encoded source bytes in, encoded output out.
pub type Operation = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync>;

/// A transform kind bound to the operation that performs it.
#[derive(Clone)]
pub struct TransformSpec {
    kind: TransformKind,
    operation: Operation,
}

impl TransformSpec {
    pub fn new<F>(kind: TransformKind, operation: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        Self {
            kind,
            operation: Arc::new(operation),
        }
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn suffix(&self) -> &'static str {
        self.kind.suffix()
    }

    pub fn apply(&self, source: &[u8]) -> Result<Vec<u8>, String> {
        (self.operation)(source)
    }
}

impl fmt::Debug for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSpec")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// File-backed registry over registered [`TransformSpec`]s.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    specs: HashMap<TransformKind, TransformSpec>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, spec: TransformSpec) -> Self {
        self.register(spec);
        self
    }

    /// Register a spec, returning the one it replaced, if any.
    pub fn register(&mut self, spec: TransformSpec) -> Option<TransformSpec> {
        self.specs.insert(spec.kind(), spec)
    }

    pub fn get(&self, kind: TransformKind) -> Option<&TransformSpec> {
        self.specs.get(&kind)
    }

    /// Registered kinds in presentation order.
    pub fn kinds(&self) -> Vec<TransformKind> {
        TransformKind::ALL
            .into_iter()
            .filter(|kind| self.specs.contains_key(kind))
            .collect()
    }
}

#[async_trait]
impl TransformRegistry for OperationRegistry {
    async fn run(
        &self,
        kind: TransformKind,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TransformError> {
        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let spec = self.get(kind).cloned().ok_or_else(|| {
            TransformError::TransformFault(format!("No operation registered for '{kind}'"))
        })?;

        let source = tokio::fs::read(input)
            .await
            .map_err(|e| TransformError::InputUnreadable {
                path: input.to_path_buf(),
                reason: e.to_string(),
            })?;
        if source.is_empty() {
            return Err(TransformError::InputUnreadable {
                path: input.to_path_buf(),
                reason: "file is empty".into(),
            });
        }

        // The blocking call cannot be interrupted. It is awaited even when
        // cancelled so the caller's slot stays held until it returns.
        let joined = tokio::task::spawn_blocking(move || spec.apply(&source)).await;
        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let encoded = match joined {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(reason)) => return Err(TransformError::TransformFault(reason)),
            Err(e) => {
                return Err(TransformError::TransformFault(format!(
                    "Operation aborted: {e}"
                )))
            }
        };

        commit(output, &encoded).await
    }
}

/// Write `bytes` next to `output` and rename into place.
async fn commit(output: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    let staging = staging_path(output);

    let written = async {
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, output).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %staging.display(),
                    error = %cleanup,
                    "Failed to remove staging file",
                );
            }
        }
        return Err(TransformError::OutputWriteFailure {
            path: output.to_path_buf(),
            reason: e.to_string(),
        });
    }
    Ok(())
}

/// `<dir>/<name>.partial` for `<dir>/<name>`.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(STAGING_SUFFIX);
    output.with_file_name(name)
}
