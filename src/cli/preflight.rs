//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, YoyakuError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The full pipeline needs ffmpeg, ffprobe and the API key.
    Run,
    /// Downloading and ripping only need ffmpeg.
    Media,
    /// Transcription needs ffprobe for splitting and the API key.
    Transcribe,
    /// Summarizing only talks to the API.
    Summarize,
    /// Writing chunk files is purely local.
    ChunksOnly,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the resolved API key when the operation needs one.
pub fn check(operation: Operation, settings: &Settings) -> Result<Option<String>> {
    let key = match operation {
        Operation::Run => {
            let key = settings.api_key()?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
            Some(key)
        }
        Operation::Media => {
            check_tool("ffmpeg")?;
            None
        }
        Operation::Transcribe => {
            let key = settings.api_key()?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
            Some(key)
        }
        Operation::Summarize => Some(settings.api_key()?),
        Operation::ChunksOnly => None,
    };
    Ok(key)
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(YoyakuError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(YoyakuError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(YoyakuError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
