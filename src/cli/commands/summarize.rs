//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::layout::RunLayout;
use crate::summarize::{write_transcript_chunks, Summarizer};
use anyhow::Result;
use std::path::Path;

/// Summarize a transcript, or only write its chunk files.
pub async fn run_summarize(
    transcript: &str,
    title: &str,
    chunks_only: bool,
    overwrite: bool,
    cleanup: bool,
    settings: Settings,
) -> Result<()> {
    let transcript = Path::new(transcript);
    if !transcript.is_file() {
        anyhow::bail!("Transcript not found: {}", transcript.display());
    }

    if chunks_only {
        preflight::check(Operation::ChunksOnly, &settings)?;
        let count = write_transcript_chunks(transcript, &settings.summarization, overwrite)?;
        Output::success(&format!(
            "Wrote {} chunks to {}",
            count,
            RunLayout::beside(transcript).chunks_dir().display()
        ));
        return Ok(());
    }

    let api_key = match preflight::check(Operation::Summarize, &settings) {
        Ok(Some(key)) => key,
        Ok(None) => settings.api_key()?,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let summarizer = Summarizer::from_settings(&settings, &api_key)?;
    let summary = summarizer
        .summarize_file(transcript, title, overwrite, cleanup)
        .await?;

    match summary.path {
        Some(path) => {
            println!("{}\n", summary.text);
            if summary.reused {
                Output::info(&format!(
                    "Summary already existed at {}. Use --overwrite to redo it.",
                    path.display()
                ));
            } else {
                Output::success(&format!(
                    "Summarized {} chunks into {}",
                    summary.chunks,
                    path.display()
                ));
            }
        }
        None => Output::warning("The transcript was empty, no summary was written."),
    }

    let stats = summarizer.client().stats();
    if stats.retries > 0 {
        Output::kv(
            "Rate limited",
            &format!("{} times, waited {}s", stats.retries, stats.seconds_waited),
        );
    }

    Ok(())
}
