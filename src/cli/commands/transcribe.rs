//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::layout::{base_name, RunLayout};
use crate::pipeline::transcribe_audio;
use crate::stage::StageRunner;
use crate::transcription::WhisperTranscriber;
use anyhow::Result;
use std::path::Path;

/// Transcribe an audio file into `<base>.txt` in its run directory.
pub async fn run_transcribe(
    audio: &str,
    language: Option<String>,
    overwrite: bool,
    settings: Settings,
) -> Result<()> {
    let api_key = match preflight::check(Operation::Transcribe, &settings) {
        Ok(Some(key)) => key,
        Ok(None) => settings.api_key()?,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let audio = Path::new(audio);
    let transcriber = WhisperTranscriber::from_settings(&settings, &api_key)?;
    let layout = RunLayout::new(&settings.output_dir(), base_name(audio));

    Output::info(&format!(
        "Transcribing {} ({})",
        audio.display(),
        language.as_deref().unwrap_or(&settings.transcription.language)
    ));

    let artifact = transcribe_audio(
        &transcriber,
        audio,
        &layout,
        &StageRunner::new(overwrite),
        language.as_deref(),
    )
    .await?;

    Output::artifact(&artifact);
    Ok(())
}
