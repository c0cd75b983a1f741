//! OpenAI chat completions over plain HTTP.
//!
//! The rate-limit headers are needed to pick a backoff, so requests go through
//! `reqwest` directly rather than an SDK that hides the response metadata.

use super::{CompletionConfig, CompletionError, CompletionService, RateLimitSignal};
use crate::error::{Result, YoyakuError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Headers consulted for a retry-after hint, in order.
const RESET_HEADERS: [&str; 2] = ["x-ratelimit-reset-requests", "x-ratelimit-reset-tokens"];

/// Error codes that mark a content-policy rejection.
const POLICY_CODES: [&str; 2] = ["content_filter", "content_policy_violation"];

/// Chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiChat {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn with_config(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| YoyakuError::Config("API key contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = crate::openai::http_client_builder(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success response onto the error taxonomy.
fn classify(status: StatusCode, headers: &HeaderMap, body: &str) -> CompletionError {
    let (message, code) = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            envelope.error.code,
        ),
        Err(_) => (format!("HTTP {}: {}", status.as_u16(), truncate(body, 200)), None),
    };
    let code = code.as_deref();

    match status.as_u16() {
        429 if code == Some("insufficient_quota") => CompletionError::QuotaExhausted(message),
        429 => {
            let hint = RESET_HEADERS
                .iter()
                .find_map(|name| headers.get(*name))
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            CompletionError::CapacityExceeded(RateLimitSignal::new(hint))
        }
        401 | 403 => CompletionError::Auth(message),
        400 if code.is_some_and(|c| POLICY_CODES.contains(&c)) => CompletionError::Rejected(message),
        400..=499 => CompletionError::InvalidRequest(message),
        status => CompletionError::Service { status, message },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl CompletionService for OpenAiChat {
    #[instrument(skip(self, prompt, config), fields(model = %config.model))]
    async fn complete(
        &self,
        prompt: &str,
        config: &CompletionConfig,
    ) -> std::result::Result<String, CompletionError> {
        let request = ChatApiRequest {
            model: &config.model,
            messages: [
                ApiMessage {
                    role: "system",
                    content: &config.system_prompt,
                },
                ApiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
        };

        let response = self.client.post(self.chat_url()).json(&request).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify(status, &headers, &body);
            debug!("Completion request failed: {}", err);
            return Err(err);
        }

        let parsed: ChatApiResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".to_string()))?;

        Ok(content.trim().to_string())
    }
}
