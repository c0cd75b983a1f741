//! CLI module for Yoyaku.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Yoyaku - lecture video to bullet-point summary
///
/// Downloads a recorded lecture, rips its audio, transcribes it and summarizes
/// the transcript. Every stage writes its result next to the others and is
/// skipped on the next run when that file already exists.
#[derive(Parser, Debug)]
#[command(name = "yoyaku")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every stage: download, rip audio, transcribe, summarize
    Run {
        /// Schoo class URL or video id, or a local video file
        input: String,

        /// Course title used in the summary prompts
        title: String,

        /// Redo stages whose output already exists
        #[arg(short, long)]
        overwrite: bool,

        /// Remove chunk and per-chunk summary files afterwards
        #[arg(short, long)]
        cleanup: bool,
    },

    /// Download a lecture video
    Download {
        /// Schoo class URL or video id
        input: String,

        #[arg(short, long)]
        overwrite: bool,
    },

    /// Rip the audio of a video into a 16 kHz mono wav
    Rip {
        /// Video file
        media: String,

        #[arg(short, long)]
        overwrite: bool,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file
        audio: String,

        /// Language hint (defaults to transcription.language)
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long)]
        overwrite: bool,
    },

    /// Summarize a transcript
    Summarize {
        /// Transcript file
        transcript: String,

        /// Course title used in the summary prompts
        title: String,

        /// Only write the chunk files, without contacting the API
        #[arg(long)]
        chunks_only: bool,

        #[arg(short, long)]
        overwrite: bool,

        #[arg(short, long)]
        cleanup: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init,
}
