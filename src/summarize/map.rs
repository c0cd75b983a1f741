//! Per-chunk summarization (map pass).

use crate::chunking::Chunk;
use crate::completion::{CompletionConfig, RateLimitedClient};
use crate::config::Prompts;
use crate::error::Result;
use crate::layout::RunLayout;
use crate::stage::write_atomic;
use crate::tokenizer::Tokenizer;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where a summary unit's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    /// Requested from the completion service during this run.
    Remote,
    /// Read back from an earlier run's per-chunk file.
    Disk,
    /// The chunk's own text; a single chunk needs no per-chunk request.
    Passthrough,
}

/// The summary text for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUnit {
    pub index: usize,
    pub text: String,
    pub source: SummarySource,
}

/// Sends one request per chunk, strictly in order, persisting each result
/// before moving on.
pub struct ChunkSummarizer {
    client: Arc<RateLimitedClient>,
    tokenizer: Arc<Tokenizer>,
    prompts: Arc<Prompts>,
    config: CompletionConfig,
}

impl ChunkSummarizer {
    pub fn new(
        client: Arc<RateLimitedClient>,
        tokenizer: Arc<Tokenizer>,
        prompts: Arc<Prompts>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            client,
            tokenizer,
            prompts,
            config,
        }
    }

    /// Summarize every chunk, reusing per-chunk files unless `overwrite` is set.
    ///
    /// A lone chunk is returned as its decoded text without a request. The
    /// result is ordered by chunk index.
    #[instrument(skip(self, chunks, layout), fields(chunks = chunks.len(), base = %layout.base()))]
    pub async fn summarize_chunks(
        &self,
        chunks: &[Chunk],
        course_title: &str,
        layout: &RunLayout,
        overwrite: bool,
    ) -> Result<Vec<SummaryUnit>> {
        if let [only] = chunks {
            info!("Single chunk, passing its text straight to the final summary");
            return Ok(vec![SummaryUnit {
                index: only.index,
                text: self.tokenizer.decode(&only.tokens)?,
                source: SummarySource::Passthrough,
            }]);
        }

        std::fs::create_dir_all(layout.summaries_dir())?;

        let total = chunks.len();
        let mut units = Vec::with_capacity(total);

        for chunk in chunks {
            let path = layout.summary_path(chunk.index);

            if path.exists() && !overwrite {
                info!("Skipping chunk {}, summary already on disk", chunk.index);
                units.push(SummaryUnit {
                    index: chunk.index,
                    text: std::fs::read_to_string(&path)?,
                    source: SummarySource::Disk,
                });
                continue;
            }

            let position = chunk.index + 1;
            info!(
                "Sending chunk {} of {} ({}%)",
                position,
                total,
                (position * 100).div_ceil(total)
            );

            let text = self.tokenizer.decode(&chunk.tokens)?;
            let prompt = self
                .prompts
                .chunk_prompt(position, total, course_title, &text);
            let response = self.client.send(&prompt, &self.config).await?;

            write_atomic(&path, &response)?;
            debug!("Wrote {}", path.display());

            units.push(SummaryUnit {
                index: chunk.index,
                text: response,
                source: SummarySource::Remote,
            });
        }

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{split, ChunkingConfig};
    use crate::completion::{CompletionError, CompletionService};
    use crate::error::YoyakuError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records prompts and answers with a numbered reply.
    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
    }

    impl Recorder {
        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for Recorder {
        async fn complete(
            &self,
            prompt: &str,
            _config: &CompletionConfig,
        ) -> std::result::Result<String, CompletionError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            if self.fail_on_call == Some(prompts.len()) {
                return Err(CompletionError::Auth("revoked".to_string()));
            }
            Ok(format!("summary #{}", prompts.len()))
        }
    }

    fn summarizer(service: Arc<Recorder>, tokenizer: Arc<Tokenizer>) -> ChunkSummarizer {
        ChunkSummarizer::new(
            Arc::new(RateLimitedClient::new(service)),
            tokenizer,
            Arc::new(Prompts::default()),
            CompletionConfig::default(),
        )
    }

    fn three_chunks(tokenizer: &Tokenizer) -> Vec<Chunk> {
        let tokens = tokenizer.encode(
            "one two three four five six seven eight nine ten eleven twelve thirteen fourteen",
        );
        let chunks = split(&tokens, &ChunkingConfig::new(6, 1).unwrap());
        chunks.into_iter().take(3).collect()
    }

    #[tokio::test]
    async fn test_resumes_from_existing_chunk_summary() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "lecture");
        let tokenizer = Arc::new(Tokenizer::new().unwrap());
        let chunks = three_chunks(&tokenizer);
        assert_eq!(chunks.len(), 3);

        std::fs::create_dir_all(layout.summaries_dir()).unwrap();
        std::fs::write(layout.summary_path(1), "from an earlier run").unwrap();

        let service = Arc::new(Recorder::default());
        let units = summarizer(service.clone(), tokenizer.clone())
            .summarize_chunks(&chunks, "Algorithms", &layout, false)
            .await
            .unwrap();

        let prompts = service.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("snippet 1 of 3"));
        assert!(prompts[1].contains("snippet 3 of 3"));
        assert!(prompts[0].contains(&tokenizer.decode(&chunks[0].tokens).unwrap()));

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].source, SummarySource::Remote);
        assert_eq!(units[1].text, "from an earlier run");
        assert_eq!(units[1].source, SummarySource::Disk);
        assert_eq!(units[2].text, "summary #2");

        assert_eq!(std::fs::read_to_string(layout.summary_path(0)).unwrap(), "summary #1");
        assert_eq!(std::fs::read_to_string(layout.summary_path(2)).unwrap(), "summary #2");
    }

    #[tokio::test]
    async fn test_overwrite_requests_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "lecture");
        let tokenizer = Arc::new(Tokenizer::new().unwrap());
        let chunks = three_chunks(&tokenizer);

        std::fs::create_dir_all(layout.summaries_dir()).unwrap();
        std::fs::write(layout.summary_path(1), "stale").unwrap();

        let service = Arc::new(Recorder::default());
        let units = summarizer(service.clone(), tokenizer)
            .summarize_chunks(&chunks, "Algorithms", &layout, true)
            .await
            .unwrap();

        assert_eq!(service.prompts().len(), 3);
        assert!(units.iter().all(|u| u.source == SummarySource::Remote));
        assert_eq!(std::fs::read_to_string(layout.summary_path(1)).unwrap(), "summary #2");
    }

    #[tokio::test]
    async fn test_single_chunk_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "short");
        let tokenizer = Arc::new(Tokenizer::new().unwrap());
        let text = "A short lecture that fits in one request.";
        let chunks = split(&tokenizer.encode(text), &ChunkingConfig::new(2000, 100).unwrap());

        let service = Arc::new(Recorder::default());
        let units = summarizer(service.clone(), tokenizer)
            .summarize_chunks(&chunks, "Short", &layout, false)
            .await
            .unwrap();

        assert!(service.prompts().is_empty());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, text);
        assert_eq!(units[0].source, SummarySource::Passthrough);
        assert!(!layout.summaries_dir().exists());
    }

    #[tokio::test]
    async fn test_no_chunks_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "empty");
        let tokenizer = Arc::new(Tokenizer::new().unwrap());

        let service = Arc::new(Recorder::default());
        let units = summarizer(service.clone(), tokenizer)
            .summarize_chunks(&[], "Empty", &layout, false)
            .await
            .unwrap();

        assert!(units.is_empty());
        assert!(service.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_completed_chunks_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path(), "lecture");
        let tokenizer = Arc::new(Tokenizer::new().unwrap());
        let chunks = three_chunks(&tokenizer);

        let service = Arc::new(Recorder {
            fail_on_call: Some(2),
            ..Default::default()
        });
        let err = summarizer(service, tokenizer.clone())
            .summarize_chunks(&chunks, "Algorithms", &layout, false)
            .await
            .unwrap_err();

        assert!(matches!(err, YoyakuError::Completion(CompletionError::Auth(_))));
        assert!(layout.summary_path(0).exists());
        assert!(!layout.summary_path(1).exists());

        // The rerun picks up where the failed one stopped
        let service = Arc::new(Recorder::default());
        let units = summarizer(service.clone(), tokenizer)
            .summarize_chunks(&chunks, "Algorithms", &layout, false)
            .await
            .unwrap();
        assert_eq!(service.prompts().len(), 2);
        assert_eq!(units[0].source, SummarySource::Disk);
    }
}
