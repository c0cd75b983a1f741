//! Media collaborators: fetching lecture video and extracting its audio.
//!
//! Both are thin wrappers around `ffmpeg`. They write to whatever path they
//! are handed, which is the stage runner's staging path during a pipeline run.

mod audio;
mod schoo;

pub use audio::{probe_duration, split_audio, FfmpegAudioExtractor};
pub use schoo::{parse_video_id, SchooFetcher};

use crate::error::{Result, YoyakuError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// What the user asked the pipeline to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// A Schoo class, identified by its numeric video id.
    Remote { video_id: String },
    /// A media file already on disk. The fetch stage is skipped.
    Local(PathBuf),
}

impl MediaInput {
    /// Classify `input` as an existing local file, a Schoo class URL or a
    /// bare numeric id.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let path = Path::new(trimmed);
        if path.is_file() {
            return Ok(Self::Local(path.to_path_buf()));
        }

        parse_video_id(trimmed)
            .map(|video_id| Self::Remote { video_id })
            .ok_or_else(|| {
                YoyakuError::InvalidInput(format!(
                    "'{input}' is neither an existing file nor a Schoo class URL or id"
                ))
            })
    }

    /// Base name used for every artifact of the run.
    pub fn base_name(&self) -> String {
        match self {
            Self::Remote { video_id } => video_id.clone(),
            Self::Local(path) => crate::layout::base_name(path),
        }
    }
}

/// Downloads lecture media for a video id.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Container extension of the fetched file, without the dot.
    fn extension(&self) -> &str {
        "mp4"
    }

    /// Write the media for `video_id` to `output`.
    async fn fetch(&self, video_id: &str, output: &Path) -> Result<()>;
}

/// Produces the audio track used for transcription.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the audio of `media` to `output`.
    async fn extract(&self, media: &Path, output: &Path) -> Result<()>;
}

/// Run an external tool to completion, capturing stderr for the error.
pub(crate) async fn run_tool<I, S>(program: &str, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!("Running {:?}", command.as_std());

    let output = match command.output().await {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(YoyakuError::ToolNotFound(program.to_string()));
        }
        Err(e) => return Err(YoyakuError::ToolFailed(format!("{program}: {e}"))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(YoyakuError::ToolFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}
