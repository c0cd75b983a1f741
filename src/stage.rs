//! Resumable stage execution.
//!
//! A stage is skipped when its artifact already exists and overwrite is off.
//! File existence is the only completion signal, so every artifact is written
//! to a staging file and renamed into place once the producer succeeds. A
//! crash mid-write leaves a staging file behind, never a truncated artifact.

use crate::error::{Result, YoyakuError};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Whether a stage did work or reused an earlier artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Produced,
    Reused,
}

/// The artifact a stage left on disk.
#[derive(Debug, Clone)]
pub struct StageArtifact {
    pub stage: String,
    pub path: PathBuf,
    pub outcome: StageOutcome,
}

impl StageArtifact {
    pub fn was_reused(&self) -> bool {
        self.outcome == StageOutcome::Reused
    }
}

/// Idempotency wrapper shared by every stage of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageRunner {
    overwrite: bool,
}

impl StageRunner {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    /// True when `target` exists and overwrite is off. Logs the skip.
    pub fn should_skip(&self, stage: &str, target: &Path) -> bool {
        let skip = !self.overwrite && target.exists();
        if skip {
            info!(
                "{} output already exists at {}, skipping",
                stage,
                target.display()
            );
        }
        skip
    }

    /// Run `produce` unless `target` already exists and overwrite is off.
    ///
    /// `produce` receives a staging path next to `target` with the same
    /// extension and must write its whole output there. Errors from `produce`
    /// are returned unchanged after the staging file is removed.
    #[instrument(skip(self, produce), fields(target = %target.display()))]
    pub async fn run<F, Fut>(&self, stage: &str, target: &Path, produce: F) -> Result<StageArtifact>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.should_skip(stage, target) {
            return Ok(StageArtifact {
                stage: stage.to_string(),
                path: target.to_path_buf(),
                outcome: StageOutcome::Reused,
            });
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let staging = staging_path(target);
        remove_if_present(&staging);

        debug!("Running {} into {}", stage, staging.display());

        if let Err(e) = produce(staging.clone()).await {
            remove_if_present(&staging);
            return Err(e);
        }

        if !staging.exists() {
            return Err(YoyakuError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{stage} finished without writing {}", staging.display()),
            )));
        }

        std::fs::rename(&staging, target)?;
        info!("{} complete: {}", stage, target.display());

        Ok(StageArtifact {
            stage: stage.to_string(),
            path: target.to_path_buf(),
            outcome: StageOutcome::Produced,
        })
    }
}

/// Hidden sibling of `target` that keeps its extension, so tools which pick
/// a container format from the file name still work.
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    target.with_file_name(format!(".partial-{name}"))
}

/// Write `contents` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| YoyakuError::Io(e.error))?;
    Ok(())
}

fn remove_if_present(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
