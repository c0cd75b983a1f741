//! Configuration settings for Yoyaku.

use crate::error::{Result, YoyakuError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when `openai.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub source: SourceSettings,
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub summarization: SummarizationSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root directory under which one directory per run is created.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Remote service credentials and transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Base URL of the API, without a trailing endpoint.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// Where remote lecture video is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Season segment of the playlist URL.
    pub season: String,
    /// Base URL that playlist links are built from.
    pub video_base_url: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            season: "2001".to_string(),
            video_base_url: "https://video.schoo.jp/full/".to_string(),
        }
    }
}

/// Audio extraction profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// ffmpeg audio codec.
    pub codec: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Language hint passed to the model.
    pub language: String,
    /// Length of the audio slices sent per request, in seconds.
    pub segment_seconds: u32,
    /// Maximum slices transcribed concurrently.
    pub max_concurrent_segments: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: "ja".to_string(),
            // 16 kHz mono s16le is ~1.9 MB/min, keep slices under the 25 MB upload cap
            segment_seconds: 600,
            max_concurrent_segments: 2,
        }
    }
}

/// Chunking and completion settings for the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationSettings {
    /// Tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Chat model identifier.
    pub model: String,
    pub temperature: f32,
    /// Maximum tokens in one response.
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Wait used when a capacity error carries no usable hint.
    pub fallback_wait_seconds: u64,
    /// Cap on capacity retries per request. Unset retries forever.
    pub max_retries: Option<u32>,
}

impl Default for SummarizationSettings {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 100,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            max_tokens: 2000,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            fallback_wait_seconds: 60,
            max_retries: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory holding a `summary.toml` that overrides the default prompts.
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| YoyakuError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yoyaku")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output root.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Resolve the API key once, from the config file or the environment.
    pub fn api_key(&self) -> Result<String> {
        let key = self
            .openai
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());

        key.ok_or_else(|| {
            YoyakuError::Config(format!(
                "{API_KEY_ENV} not set. Set it with: export {API_KEY_ENV}='sk-...' or openai.api_key in the config file"
            ))
        })
    }
}
