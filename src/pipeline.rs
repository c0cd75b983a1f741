//! End-to-end run: fetch, extract, transcribe, summarize.
//!
//! Every stage goes through a [`StageRunner`], so rerunning a failed or
//! interrupted run redoes only what is missing from the run directory.

use crate::completion::{CompletionService, RetrySnapshot};
use crate::config::Settings;
use crate::error::{Result, YoyakuError};
use crate::layout::RunLayout;
use crate::media::{AudioExtractor, FfmpegAudioExtractor, MediaFetcher, MediaInput, SchooFetcher};
use crate::stage::{StageArtifact, StageOutcome, StageRunner};
use crate::summarize::{FinalSummary, Summarizer};
use crate::transcription::{Transcriber, WhisperTranscriber};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Redo every stage even when its artifact exists.
    pub overwrite: bool,
    /// Remove chunk and per-chunk summary files after the final summary.
    pub cleanup: bool,
}

/// Artifacts produced or reused by a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub media: StageArtifact,
    pub audio: StageArtifact,
    pub transcript: StageArtifact,
    pub summary: FinalSummary,
    pub retries: RetrySnapshot,
}

/// The lecture-to-summary pipeline.
pub struct Pipeline {
    settings: Settings,
    fetcher: Arc<dyn MediaFetcher>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Summarizer,
}

impl Pipeline {
    /// Create a pipeline backed by ffmpeg and the OpenAI APIs.
    ///
    /// Fails before any work starts when no API key is configured.
    pub fn new(settings: Settings) -> Result<Self> {
        let api_key = settings.api_key()?;

        let fetcher = Arc::new(SchooFetcher::new(&settings.source)?);
        let extractor = Arc::new(FfmpegAudioExtractor::new(settings.audio.clone()));
        let transcriber = Arc::new(WhisperTranscriber::from_settings(&settings, &api_key)?);
        let summarizer = Summarizer::from_settings(&settings, &api_key)?;

        Ok(Self {
            settings,
            fetcher,
            extractor,
            transcriber,
            summarizer,
        })
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn MediaFetcher>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        let summarizer = Summarizer::with_service(&settings, completion)?;
        Ok(Self {
            settings,
            fetcher,
            extractor,
            transcriber,
            summarizer,
        })
    }

    /// Layout of the run named `base` under the configured output root.
    pub fn layout_for(&self, base: &str) -> RunLayout {
        RunLayout::new(&self.settings.output_dir(), base)
    }

    /// Run every stage for `input`.
    #[instrument(skip(self, input), fields(base = %input.base_name()))]
    pub async fn run(
        &self,
        input: &MediaInput,
        course_title: &str,
        options: RunOptions,
    ) -> Result<RunReport> {
        let runner = StageRunner::new(options.overwrite);
        let layout = self.layout_for(&input.base_name());
        info!("Run directory: {}", layout.root().display());

        let media = match input {
            MediaInput::Remote { video_id } => {
                fetch_media(self.fetcher.as_ref(), video_id, &layout, &runner).await?
            }
            MediaInput::Local(path) => StageArtifact {
                stage: "fetch".to_string(),
                path: path.clone(),
                outcome: StageOutcome::Reused,
            },
        };

        let audio = extract_audio(self.extractor.as_ref(), &media.path, &layout, &runner).await?;
        let transcript =
            transcribe_audio(self.transcriber.as_ref(), &audio.path, &layout, &runner, None)
                .await?;

        let summary = self
            .summarizer
            .summarize_file(&transcript.path, course_title, options.overwrite, options.cleanup)
            .await?;

        Ok(RunReport {
            media,
            audio,
            transcript,
            summary,
            retries: self.summarizer.client().stats(),
        })
    }
}

/// Download the media for `video_id` into the run directory.
pub async fn fetch_media(
    fetcher: &dyn MediaFetcher,
    video_id: &str,
    layout: &RunLayout,
    runner: &StageRunner,
) -> Result<StageArtifact> {
    let target = layout.media_path(fetcher.extension());
    runner
        .run("fetch", &target, |staging| async move {
            fetcher.fetch(video_id, &staging).await
        })
        .await
}

/// Extract the audio track of `media` into the run directory.
pub async fn extract_audio(
    extractor: &dyn AudioExtractor,
    media: &Path,
    layout: &RunLayout,
    runner: &StageRunner,
) -> Result<StageArtifact> {
    runner
        .run("extract", &layout.audio_path(), |staging| async move {
            extractor.extract(media, &staging).await
        })
        .await
}

/// Transcribe `audio` into the run's transcript file.
///
/// `language` overrides the transcriber's default hint.
pub async fn transcribe_audio(
    transcriber: &dyn Transcriber,
    audio: &Path,
    layout: &RunLayout,
    runner: &StageRunner,
    language: Option<&str>,
) -> Result<StageArtifact> {
    runner
        .run("transcribe", &layout.transcript_path(), |staging| async move {
            let transcript = match language {
                Some(lang) => transcriber.transcribe_with_language(audio, lang).await?,
                None => transcriber.transcribe(audio).await?,
            };
            info!(
                "Transcribed {} segments ({:.0}s)",
                transcript.segments.len(),
                transcript.duration_seconds()
            );
            tokio::fs::write(&staging, transcript.to_text()).await?;
            Ok::<(), YoyakuError>(())
        })
        .await
}
