//! Map-reduce summarization of a transcript.
//!
//! The transcript is tokenized and split into overlapping chunks. Each chunk
//! is summarized on its own, then the per-chunk summaries are stitched and
//! summarized once more into the run's final artifact. Every intermediate is
//! persisted so an interrupted run resumes at the first missing chunk.

mod map;
mod reduce;

pub use map::{ChunkSummarizer, SummarySource, SummaryUnit};
pub use reduce::MetaSummarizer;

use crate::chunking::{split, write_chunk_files, Chunk, ChunkingConfig};
use crate::completion::{CompletionConfig, CompletionService, OpenAiChat, RateLimitedClient};
use crate::config::{Prompts, Settings, SummarizationSettings};
use crate::error::Result;
use crate::layout::RunLayout;
use crate::stage::StageRunner;
use crate::tokenizer::Tokenizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Result of summarizing one transcript.
#[derive(Debug, Clone)]
pub struct FinalSummary {
    /// Where the summary was written. `None` when there was nothing to summarize.
    pub path: Option<PathBuf>,
    pub text: String,
    /// Number of chunks the transcript was split into. Zero when reused.
    pub chunks: usize,
    /// True when an earlier run's final artifact was returned as-is.
    pub reused: bool,
}

/// Tokenizes, chunks and summarizes transcripts.
pub struct Summarizer {
    tokenizer: Arc<Tokenizer>,
    chunking: ChunkingConfig,
    client: Arc<RateLimitedClient>,
    map: ChunkSummarizer,
    reduce: MetaSummarizer,
}

impl Summarizer {
    pub fn new(
        tokenizer: Arc<Tokenizer>,
        chunking: ChunkingConfig,
        client: Arc<RateLimitedClient>,
        prompts: Arc<Prompts>,
        config: CompletionConfig,
    ) -> Self {
        let map = ChunkSummarizer::new(
            client.clone(),
            tokenizer.clone(),
            prompts.clone(),
            config.clone(),
        );
        let reduce = MetaSummarizer::new(client.clone(), prompts, config);
        Self {
            tokenizer,
            chunking,
            client,
            map,
            reduce,
        }
    }

    /// Build from settings, talking to the configured OpenAI endpoint.
    pub fn from_settings(settings: &Settings, api_key: &str) -> Result<Self> {
        let chat = OpenAiChat::with_config(
            api_key,
            &settings.openai.base_url,
            Duration::from_secs(settings.openai.timeout_seconds),
        )?;
        Self::with_service(settings, Arc::new(chat))
    }

    /// Build from settings around any completion backend.
    pub fn with_service(settings: &Settings, service: Arc<dyn CompletionService>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let config = CompletionConfig::from_settings(&settings.summarization, &prompts);
        let chunking = ChunkingConfig::new(
            settings.summarization.chunk_size,
            settings.summarization.chunk_overlap,
        )?;
        let client = RateLimitedClient::new(service)
            .with_fallback_wait(settings.summarization.fallback_wait_seconds)
            .with_max_retries(settings.summarization.max_retries);

        Ok(Self::new(
            Arc::new(Tokenizer::new()?),
            chunking,
            Arc::new(client),
            Arc::new(prompts),
            config,
        ))
    }

    pub fn client(&self) -> &RateLimitedClient {
        &self.client
    }

    /// Tokenize `text` and split it into chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let tokens = self.tokenizer.encode(text);
        let chunks = split(&tokens, &self.chunking);
        info!(
            "{} tokens split into {} chunks of up to {} ({} overlap)",
            tokens.len(),
            chunks.len(),
            self.chunking.chunk_size(),
            self.chunking.overlap()
        );
        chunks
    }

    /// Summarize the transcript at `transcript` into `<base>_summary.txt`
    /// beside it.
    ///
    /// An existing final summary is returned untouched unless `overwrite` is
    /// set. With `cleanup`, the chunk and per-chunk summary directories are
    /// removed after a successful run.
    #[instrument(skip(self), fields(transcript = %transcript.display()))]
    pub async fn summarize_file(
        &self,
        transcript: &Path,
        course_title: &str,
        overwrite: bool,
        cleanup: bool,
    ) -> Result<FinalSummary> {
        let layout = RunLayout::beside(transcript);
        let final_path = layout.final_summary_path();

        let summary = if StageRunner::new(overwrite).should_skip("summarize", &final_path) {
            FinalSummary {
                text: std::fs::read_to_string(&final_path)?,
                path: Some(final_path),
                chunks: 0,
                reused: true,
            }
        } else {
            let text = std::fs::read_to_string(transcript)?;
            self.summarize_text(&text, course_title, &layout, overwrite)
                .await?
        };

        if cleanup {
            layout.cleanup_intermediates();
        }

        Ok(summary)
    }

    /// Run both passes over `text` using `layout` for every artifact.
    pub async fn summarize_text(
        &self,
        text: &str,
        course_title: &str,
        layout: &RunLayout,
        overwrite: bool,
    ) -> Result<FinalSummary> {
        let chunks = self.chunk_text(text);
        if chunks.is_empty() {
            info!("Transcript is empty, nothing to summarize");
            return Ok(FinalSummary {
                path: None,
                text: String::new(),
                chunks: 0,
                reused: false,
            });
        }

        write_chunk_files(&chunks, &self.tokenizer, layout, overwrite)?;

        let units = self
            .map
            .summarize_chunks(&chunks, course_title, layout, overwrite)
            .await?;

        let final_path = layout.final_summary_path();
        let summary = self.reduce.reduce(&units, course_title, &final_path).await?;

        Ok(match summary {
            Some(text) => FinalSummary {
                path: Some(final_path),
                text,
                chunks: chunks.len(),
                reused: false,
            },
            None => FinalSummary {
                path: None,
                text: String::new(),
                chunks: chunks.len(),
                reused: false,
            },
        })
    }
}

/// Write the chunk files for `transcript` without summarizing.
///
/// Needs no credentials. Returns the number of chunks.
pub fn write_transcript_chunks(
    transcript: &Path,
    settings: &SummarizationSettings,
    overwrite: bool,
) -> Result<usize> {
    let chunking = ChunkingConfig::new(settings.chunk_size, settings.chunk_overlap)?;
    let tokenizer = Tokenizer::new()?;

    let text = std::fs::read_to_string(transcript)?;
    let chunks = split(&tokenizer.encode(&text), &chunking);
    write_chunk_files(&chunks, &tokenizer, &RunLayout::beside(transcript), overwrite)?;
    Ok(chunks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counter {
        prompts: Mutex<Vec<String>>,
    }

    impl Counter {
        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for Counter {
        async fn complete(
            &self,
            prompt: &str,
            _config: &CompletionConfig,
        ) -> std::result::Result<String, CompletionError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            Ok(format!("response {}", prompts.len()))
        }
    }

    fn small_chunk_settings() -> Settings {
        let mut settings = Settings::default();
        settings.summarization.chunk_size = 8;
        settings.summarization.chunk_overlap = 2;
        settings
    }

    fn transcript(dir: &Path, body: &str) -> PathBuf {
        let layout = RunLayout::new(dir, "lecture");
        std::fs::create_dir_all(layout.root()).unwrap();
        let path = layout.transcript_path();
        std::fs::write(&path, body).unwrap();
        path
    }

    const LONG_TEXT: &str = "The lecture covers hash tables, probing strategies, load factors, \
        resizing policies, and how cache behaviour changes the constant factors in practice.";

    #[tokio::test]
    async fn test_full_run_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), LONG_TEXT);
        let service = Arc::new(Counter::default());
        let summarizer = Summarizer::with_service(&small_chunk_settings(), service.clone()).unwrap();

        let summary = summarizer
            .summarize_file(&path, "Data Structures", false, false)
            .await
            .unwrap();

        let layout = RunLayout::beside(&path);
        assert!(summary.chunks > 1);
        assert_eq!(service.calls(), summary.chunks + 1);
        assert_eq!(summary.path.as_deref(), Some(layout.final_summary_path().as_path()));
        assert_eq!(
            std::fs::read_to_string(layout.final_summary_path()).unwrap(),
            summary.text
        );
        for i in 0..summary.chunks {
            assert!(layout.chunk_path(i).exists());
            assert!(layout.summary_path(i).exists());
        }

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts.last().unwrap().contains("response 1\nresponse 2"));
    }

    #[tokio::test]
    async fn test_rerun_reuses_final_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), LONG_TEXT);
        let settings = small_chunk_settings();

        let first = Arc::new(Counter::default());
        let summary = Summarizer::with_service(&settings, first)
            .unwrap()
            .summarize_file(&path, "Data Structures", false, false)
            .await
            .unwrap();

        let second = Arc::new(Counter::default());
        let again = Summarizer::with_service(&settings, second.clone())
            .unwrap()
            .summarize_file(&path, "Data Structures", false, false)
            .await
            .unwrap();

        assert_eq!(second.calls(), 0);
        assert!(again.reused);
        assert_eq!(again.text, summary.text);
    }

    #[tokio::test]
    async fn test_single_chunk_makes_one_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), "Short talk about queues.");
        let service = Arc::new(Counter::default());
        let summarizer = Summarizer::with_service(&Settings::default(), service.clone()).unwrap();

        let summary = summarizer
            .summarize_file(&path, "Queues", false, false)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 1);
        assert_eq!(service.calls(), 1);
        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].ends_with("Short talk about queues."));
    }

    #[tokio::test]
    async fn test_empty_transcript_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), "");
        let service = Arc::new(Counter::default());
        let summarizer = Summarizer::with_service(&Settings::default(), service.clone()).unwrap();

        let summary = summarizer
            .summarize_file(&path, "Nothing", false, false)
            .await
            .unwrap();

        assert_eq!(service.calls(), 0);
        assert!(summary.path.is_none());
        assert!(summary.text.is_empty());
        assert!(!RunLayout::beside(&path).final_summary_path().exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_intermediates_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), LONG_TEXT);
        let service = Arc::new(Counter::default());
        let summarizer = Summarizer::with_service(&small_chunk_settings(), service).unwrap();

        summarizer
            .summarize_file(&path, "Data Structures", false, true)
            .await
            .unwrap();

        let layout = RunLayout::beside(&path);
        assert!(!layout.chunks_dir().exists());
        assert!(!layout.summaries_dir().exists());
        assert!(layout.final_summary_path().exists());
        assert!(path.exists());
    }

    #[test]
    fn test_write_chunks_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = transcript(dir.path(), LONG_TEXT);
        let count =
            write_transcript_chunks(&path, &small_chunk_settings().summarization, false).unwrap();

        let layout = RunLayout::beside(&path);
        assert!(count > 1);
        assert!(layout.chunk_path(count - 1).exists());
        assert!(!layout.summaries_dir().exists());
    }
}
