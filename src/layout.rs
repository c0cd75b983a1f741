//! On-disk layout of a single pipeline run.
//!
//! ```text
//! <output_root>/<base>/
//!   <base>.mp4                      fetched media
//!   <base>.wav                      extracted audio
//!   <base>.txt                      transcript
//!   chunks/<base>_<i>.txt           decoded chunk text
//!   summaries/<base>_<i>_summary.txt
//!   <base>_summary.txt              final artifact
//! ```

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Paths for every artifact of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
    base: String,
}

impl RunLayout {
    /// Layout rooted at `<output_root>/<base>`.
    pub fn new(output_root: &Path, base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            root: output_root.join(&base),
            base,
        }
    }

    /// Layout for an artifact that already sits in its run directory.
    ///
    /// The run root is the artifact's parent and the base is its file stem, so
    /// `runs/1234/1234.txt` maps back to the run rooted at `runs/1234`.
    pub fn beside(artifact: &Path) -> Self {
        let base = base_name(artifact);
        let root = artifact
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { root, base }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.root.join("summaries")
    }

    /// Decoded text of chunk `index`.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.chunks_dir().join(format!("{}_{}.txt", self.base, index))
    }

    /// Per-chunk summary slot for chunk `index`.
    pub fn summary_path(&self, index: usize) -> PathBuf {
        self.summaries_dir()
            .join(format!("{}_{}_summary.txt", self.base, index))
    }

    /// The run's terminal artifact.
    pub fn final_summary_path(&self) -> PathBuf {
        self.root.join(format!("{}_summary.txt", self.base))
    }

    /// Fetched media with the given extension.
    pub fn media_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", self.base, extension))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.root.join(format!("{}.wav", self.base))
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.root.join(format!("{}.txt", self.base))
    }

    /// Delete the `chunks/` and `summaries/` directories.
    ///
    /// Best-effort: failures are logged and reported, never raised, because the
    /// run has already produced its final artifact by the time this is called.
    pub fn cleanup_intermediates(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for dir in [self.chunks_dir(), self.summaries_dir()] {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    info!("Removed {}", dir.display());
                    report.removed.push(dir);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove {}: {}", dir.display(), e);
                    report.failed.push(dir);
                }
            }
        }

        report
    }
}

/// Outcome of [`RunLayout::cleanup_intermediates`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// File name without directory or extension.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}
