//! Yoyaku - lecture video to bullet-point summary
//!
//! A resumable pipeline that turns a long recorded lecture into a short
//! written summary.
//!
//! # Overview
//!
//! A run downloads the lecture video, rips a 16 kHz mono audio track,
//! transcribes it, then summarizes the transcript map-reduce style: the
//! transcript is split into overlapping token windows, each window is
//! summarized, and the summaries are summarized once more into bullet points.
//! Every stage writes a file into the run directory and is skipped when that
//! file already exists, so a failed run picks up where it stopped.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `media` - Video download and audio extraction (ffmpeg)
//! - `transcription` - Speech-to-text (Whisper)
//! - `tokenizer` - Byte-pair token counting and decoding
//! - `chunking` - Overlapping token windows
//! - `completion` - Chat completions with rate-limit backoff
//! - `summarize` - Per-chunk summaries and the summary of summaries
//! - `stage` - Skip-if-exists stage execution and atomic writes
//! - `layout` - File names of one run
//! - `pipeline` - Stage coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use yoyaku::config::Settings;
//! use yoyaku::media::MediaInput;
//! use yoyaku::pipeline::{Pipeline, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let input = MediaInput::parse("https://schoo.jp/class/1234/room")?;
//!     let report = pipeline.run(&input, "Intro to Statistics", RunOptions::default()).await?;
//!     println!("{}", report.summary.text);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod layout;
pub mod media;
pub mod openai;
pub mod pipeline;
pub mod stage;
pub mod summarize;
pub mod tokenizer;
pub mod transcription;

pub use error::{Result, YoyakuError};
