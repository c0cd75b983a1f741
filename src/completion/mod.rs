//! Requests to the remote completion service.
//!
//! [`CompletionService`] makes exactly one attempt and reports the outcome;
//! [`RateLimitedClient`] layers the capacity backoff on top. Capacity errors
//! are the only retryable kind and are carried as [`RateLimitSignal`] so the
//! retry loop can match on them instead of inspecting messages.

mod openai;
mod rate_limit;

pub use openai::OpenAiChat;
pub use rate_limit::{
    parse_retry_after, try_parse_retry_after, RateLimitedClient, RetrySnapshot,
    DEFAULT_WAIT_SECS,
};

use crate::config::{Prompts, SummarizationSettings};
use async_trait::async_trait;
use thiserror::Error;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub model: String,
    /// System message preceding the prompt.
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl CompletionConfig {
    pub fn from_settings(settings: &SummarizationSettings, prompts: &Prompts) -> Self {
        Self {
            model: settings.model.clone(),
            system_prompt: prompts.summary.system.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            top_p: settings.top_p,
            frequency_penalty: settings.frequency_penalty,
            presence_penalty: settings.presence_penalty,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self::from_settings(&SummarizationSettings::default(), &Prompts::default())
    }
}

/// Capacity-exceeded signal from the service.
///
/// Lives only for one retry decision. `hint` is the raw retry-after value,
/// e.g. `"12s"`, `"2m"` or `"1h"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateLimitSignal {
    pub hint: Option<String>,
}

impl RateLimitSignal {
    pub fn new(hint: Option<String>) -> Self {
        Self { hint }
    }

    /// Seconds to wait before retrying, or `fallback` when the hint is absent or unreadable.
    pub fn wait_seconds(&self, fallback: u64) -> u64 {
        self.hint
            .as_deref()
            .and_then(try_parse_retry_after)
            .unwrap_or(fallback)
    }
}

/// Outcome of a failed completion attempt.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Retryable: the service is over capacity.
    #[error("capacity exceeded (retry hint: {})", .0.hint.as_deref().unwrap_or("none"))]
    CapacityExceeded(RateLimitSignal),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Content-policy rejection.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Billing quota used up. Shares the 429 status with capacity errors but never clears.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("gave up after {attempts} capacity-limited attempts")]
    RetriesExhausted { attempts: u32 },
}

impl CompletionError {
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded(_))
    }

    /// Short code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::Auth(_) => "auth",
            Self::Rejected(_) => "rejected",
            Self::InvalidRequest(_) => "invalid_request",
            Self::QuotaExhausted(_) => "quota_exhausted",
            Self::Service { .. } => "service_error",
            Self::Http(_) => "http_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

/// One attempt against a completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        config: &CompletionConfig,
    ) -> std::result::Result<String, CompletionError>;
}
