//! Audio extraction and segmentation with ffmpeg.

use super::{run_tool, AudioExtractor};
use crate::config::AudioSettings;
use crate::error::{Result, YoyakuError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Rips the audio track of a media file into a single wav.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    settings: AudioSettings,
}

impl FfmpegAudioExtractor {
    pub fn new(settings: AudioSettings) -> Self {
        Self { settings }
    }

    fn args(&self, media: &Path, output: &Path) -> Vec<String> {
        vec![
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            media.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-acodec".to_string(),
            self.settings.codec.clone(),
            "-ac".to_string(),
            self.settings.channels.to_string(),
            "-ar".to_string(),
            self.settings.sample_rate.to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegAudioExtractor {
    fn default() -> Self {
        Self::new(AudioSettings::default())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    #[instrument(skip(self), fields(media = %media.display()))]
    async fn extract(&self, media: &Path, output: &Path) -> Result<()> {
        if !media.exists() {
            return Err(YoyakuError::AudioExtraction(format!(
                "media file not found: {}",
                media.display()
            )));
        }

        info!(
            "Ripping audio from {} ({} Hz, {} channel)",
            media.display(),
            self.settings.sample_rate,
            self.settings.channels
        );
        run_tool("ffmpeg", self.args(media, output)).await?;
        Ok(())
    }
}

/// Duration of a media file in seconds, via ffprobe's JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let stdout = run_tool(
        "ffprobe",
        [
            OsStr::new("-v"),
            OsStr::new("quiet"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            path.as_os_str(),
        ],
    )
    .await?;

    let parsed: serde_json::Value = serde_json::from_slice(&stdout)?;
    parse_duration(&parsed).ok_or_else(|| {
        YoyakuError::AudioExtraction(format!(
            "could not determine duration of {}",
            path.display()
        ))
    })
}

fn parse_duration(probe: &serde_json::Value) -> Option<f64> {
    probe["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Start offsets of `segment_seconds`-long slices covering `total` seconds.
fn segment_offsets(total: f64, segment_seconds: u32) -> Vec<f64> {
    let step = f64::from(segment_seconds.max(1));
    let mut offsets = Vec::new();
    let mut offset = 0.0;
    while offset < total {
        offsets.push(offset);
        offset += step;
    }
    offsets
}

/// Split `source` into wav slices of about `segment_seconds` each.
///
/// Returns `(path, offset_seconds)` pairs in order. Audio no longer than one
/// slice is returned as-is.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    segment_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total);

    if total <= f64::from(segment_seconds) {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let stem = crate::layout::base_name(source);
    let mut segments = Vec::new();

    for (idx, offset) in segment_offsets(total, segment_seconds).into_iter().enumerate() {
        let path = output_dir.join(format!("{}_{:04}.wav", stem, idx));
        let length = f64::from(segment_seconds).min(total - offset);

        run_tool(
            "ffmpeg",
            [
                "-nostdin".to_string(),
                "-loglevel".to_string(),
                "error".to_string(),
                "-y".to_string(),
                "-ss".to_string(),
                format!("{:.3}", offset),
                "-i".to_string(),
                source.to_string_lossy().into_owned(),
                "-t".to_string(),
                format!("{:.3}", length),
                "-c".to_string(),
                "copy".to_string(),
                path.to_string_lossy().into_owned(),
            ],
        )
        .await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((path, offset));
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}
