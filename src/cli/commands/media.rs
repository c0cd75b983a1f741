//! Download and rip commands.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::YoyakuError;
use crate::layout::{base_name, RunLayout};
use crate::media::{FfmpegAudioExtractor, MediaInput, SchooFetcher};
use crate::pipeline::{extract_audio, fetch_media};
use crate::stage::StageRunner;
use anyhow::Result;
use std::path::Path;

/// Download a lecture video into its run directory.
pub async fn run_download(input: &str, overwrite: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Media, &settings)?;

    let video_id = match MediaInput::parse(input)? {
        MediaInput::Remote { video_id } => video_id,
        MediaInput::Local(path) => {
            return Err(YoyakuError::InvalidInput(format!(
                "{} is already a local file",
                path.display()
            ))
            .into());
        }
    };

    let fetcher = SchooFetcher::new(&settings.source)?;
    let layout = RunLayout::new(&settings.output_dir(), video_id.as_str());

    let spinner = Output::spinner(&format!("Downloading {}", video_id));
    let result = fetch_media(&fetcher, &video_id, &layout, &StageRunner::new(overwrite)).await;
    spinner.finish_and_clear();

    Output::artifact(&result?);
    Ok(())
}

/// Rip the audio of a video file into its run directory.
pub async fn run_rip(media: &str, overwrite: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Media, &settings)?;

    let media = Path::new(media);
    let extractor = FfmpegAudioExtractor::new(settings.audio.clone());
    let layout = RunLayout::new(&settings.output_dir(), base_name(media));

    let spinner = Output::spinner(&format!("Ripping audio from {}", media.display()));
    let result = extract_audio(&extractor, media, &layout, &StageRunner::new(overwrite)).await;
    spinner.finish_and_clear();

    Output::artifact(&result?);
    Ok(())
}
