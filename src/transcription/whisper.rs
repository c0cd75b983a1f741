//! OpenAI Whisper transcription implementation.

use super::{Transcriber, Transcript, TranscriptSegment};
use crate::config::Settings;
use crate::error::{Result, YoyakuError};
use crate::media::split_audio;
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: String,
    segment_seconds: u32,
    max_concurrent_segments: usize,
}

impl WhisperTranscriber {
    /// Create a transcriber from settings with an already-resolved API key.
    pub fn from_settings(settings: &Settings, api_key: &str) -> Result<Self> {
        let client = create_client(&settings.openai, api_key)?;
        let t = &settings.transcription;

        Ok(Self {
            client,
            model: t.model.clone(),
            language: t.language.clone(),
            segment_seconds: t.segment_seconds,
            max_concurrent_segments: t.max_concurrent_segments.max(1),
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .language(language)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| YoyakuError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| YoyakuError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<TranscriptSegment> = match response.segments {
            Some(segs) => segs
                .iter()
                .map(|s| {
                    TranscriptSegment::new(s.start as f64, s.end as f64, s.text.trim().to_string())
                })
                .collect(),
            // No segment breakdown, keep the whole text as one segment
            None => vec![TranscriptSegment::new(
                0.0,
                response.duration as f64,
                response.text.trim().to_string(),
            )],
        };

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }

    /// Transcribe an audio file, splitting it into upload-sized slices first.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_with_splitting(
        &self,
        audio_path: &Path,
        language: &str,
        media_id: &str,
    ) -> Result<Transcript> {
        let temp_dir = tempfile::tempdir()?;
        let slices = split_audio(audio_path, temp_dir.path(), self.segment_seconds).await?;

        if slices.len() == 1 {
            let segments = self.transcribe_single(audio_path, language).await?;
            return Ok(Transcript::new(media_id.to_string(), segments));
        }

        let slice_count = slices.len();
        info!("Processing {} audio slices with {}", slice_count, self.model);

        let pb = ProgressBar::new(slice_count as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }

        let mut results: Vec<(usize, f64, Vec<TranscriptSegment>)> = Vec::with_capacity(slice_count);

        let mut stream = stream::iter(slices.into_iter().enumerate())
            .map(|(idx, (slice_path, offset))| async move {
                let result = self.transcribe_single(&slice_path, language).await;
                (idx, offset, result)
            })
            .buffer_unordered(self.max_concurrent_segments);

        while let Some((idx, offset, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(segments) => results.push((idx, offset, segments)),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(YoyakuError::Transcription(format!(
                        "Slice {} at {:.0}s failed: {}",
                        idx, offset, e
                    )));
                }
            }
        }

        pb.finish_and_clear();

        Ok(Transcript::new(media_id.to_string(), merge_slices(results)))
    }
}

/// Order slice results by index and shift each slice's segments by its offset.
fn merge_slices(mut results: Vec<(usize, f64, Vec<TranscriptSegment>)>) -> Vec<TranscriptSegment> {
    results.sort_by_key(|(idx, _, _)| *idx);
    results
        .into_iter()
        .flat_map(|(_, offset, segments)| segments.into_iter().map(move |s| s.shifted(offset)))
        .collect()
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let language = self.language.clone();
        self.transcribe_with_language(audio_path, &language).await
    }

    async fn transcribe_with_language(&self, audio_path: &Path, language: &str) -> Result<Transcript> {
        let media_id = crate::layout::base_name(audio_path);
        self.transcribe_with_splitting(audio_path, language, &media_id)
            .await
    }
}
