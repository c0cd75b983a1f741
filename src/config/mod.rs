//! Configuration module for Yoyaku.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    AudioSettings, GeneralSettings, OpenAISettings, PromptSettings, Settings, SourceSettings,
    SummarizationSettings, TranscriptionSettings, API_KEY_ENV,
};
