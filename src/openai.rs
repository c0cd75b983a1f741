//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAISettings;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// HTTP client builder with the request timeout applied.
pub fn http_client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder().timeout(timeout)
}

/// Create an SDK client for the audio endpoints.
///
/// Uses the credentials resolved once per run instead of reading the
/// environment again.
pub fn create_client(settings: &OpenAISettings, api_key: &str) -> Result<Client<OpenAIConfig>> {
    let http_client = http_client_builder(Duration::from_secs(settings.timeout_seconds)).build()?;

    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(settings.base_url.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http_client))
}
