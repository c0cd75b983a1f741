//! Error types for Yoyaku.

use crate::completion::CompletionError;
use thiserror::Error;

/// Library-level error type for Yoyaku operations.
#[derive(Error, Debug)]
pub enum YoyakuError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Media fetch failed: {0}")]
    MediaFetch(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Completion request failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Result type alias for Yoyaku operations.
pub type Result<T> = std::result::Result<T, YoyakuError>;
