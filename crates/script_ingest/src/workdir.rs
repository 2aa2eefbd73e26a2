use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::error::ScriptInputError;

/// On-disk layout of one job's working area.
///
/// Holds `config.yml` (the initial configuration document), `setup.yml` (the
/// negotiated result), and one `output-<index>.csv` per run task. The
/// directory outlives this value: later phases may reopen it from a separate
/// process, so it is never removed automatically; only task artifacts are
/// cleaned up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkingArea {
    root: PathBuf,
}

impl WorkingArea {
    /// Creates a fresh private working directory for one job.
    pub fn create() -> Result<Self, ScriptInputError> {
        let dir = tempfile::Builder::new()
            .prefix("script-ingest-")
            .tempdir()
            .map_err(ScriptInputError::WorkingArea)?;
        Ok(Self { root: dir.keep() })
    }

    /// Reopens an existing working area, e.g. when resuming a negotiated
    /// session in another process.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the initial configuration document.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yml")
    }

    /// Path to the negotiated setup result.
    pub fn setup_path(&self) -> PathBuf {
        self.root.join("setup.yml")
    }

    /// Path to one task's output artifact.
    pub fn task_output_path(&self, task_index: usize) -> PathBuf {
        self.root.join(format!("output-{task_index}.csv"))
    }

    /// Removes every task output artifact. Idempotent and best-effort:
    /// missing files are fine and deletion failures are only logged.
    pub async fn cleanup(&self, task_count: usize) {
        for task_index in 0..task_count {
            let path = self.task_output_path(task_index);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove task output");
                }
            }
        }
    }
}
