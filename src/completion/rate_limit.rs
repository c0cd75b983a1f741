//! Capacity-aware retry around a [`CompletionService`].

use super::{CompletionConfig, CompletionError, CompletionService};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Wait used when a capacity error carries no readable hint.
pub const DEFAULT_WAIT_SECS: u64 = 60;

/// Parse a retry-after hint such as `"12s"`, `"2m"` or `"1h"` into whole seconds.
///
/// Every character other than digits and `.` is stripped to recover the
/// magnitude, which is rounded up. The final character picks the unit.
/// Returns `None` when either part is missing or unreadable.
pub fn try_parse_retry_after(hint: &str) -> Option<u64> {
    let hint = hint.trim();
    let unit = hint.chars().last()?.to_ascii_lowercase();

    let magnitude: String = hint
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value = magnitude.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let seconds = value.ceil() as u64;

    match unit {
        's' => Some(seconds),
        'm' => seconds.checked_mul(60),
        'h' => seconds.checked_mul(3600),
        _ => None,
    }
}

/// [`try_parse_retry_after`] with the [`DEFAULT_WAIT_SECS`] fallback.
pub fn parse_retry_after(hint: &str) -> u64 {
    try_parse_retry_after(hint).unwrap_or_else(|| {
        debug!(
            "Could not read rate limit hint {:?}, waiting {}s",
            hint, DEFAULT_WAIT_SECS
        );
        DEFAULT_WAIT_SECS
    })
}

#[derive(Debug, Default)]
struct RetryStats {
    attempts: AtomicU64,
    retries: AtomicU64,
    seconds_waited: AtomicU64,
}

/// Counters observed across the client's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetrySnapshot {
    /// Requests actually sent to the service.
    pub attempts: u64,
    /// Capacity errors that led to a retry.
    pub retries: u64,
    pub seconds_waited: u64,
}

/// Sends one request at a time, backing off on capacity errors.
///
/// Retries are unbounded unless a cap is configured. Every other error is
/// returned to the caller on the first occurrence.
pub struct RateLimitedClient {
    service: Arc<dyn CompletionService>,
    fallback_wait_secs: u64,
    max_retries: Option<u32>,
    // Held for the whole send, backoff included, so requests never overlap.
    in_flight: Mutex<()>,
    stats: RetryStats,
}

impl RateLimitedClient {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            fallback_wait_secs: DEFAULT_WAIT_SECS,
            max_retries: None,
            in_flight: Mutex::new(()),
            stats: RetryStats::default(),
        }
    }

    pub fn with_fallback_wait(mut self, seconds: u64) -> Self {
        self.fallback_wait_secs = seconds;
        self
    }

    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn stats(&self) -> RetrySnapshot {
        RetrySnapshot {
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            retries: self.stats.retries.load(Ordering::Relaxed),
            seconds_waited: self.stats.seconds_waited.load(Ordering::Relaxed),
        }
    }

    /// Send `prompt`, retrying through capacity errors.
    ///
    /// A blank prompt returns an empty string without contacting the service.
    #[instrument(skip(self, prompt, config), fields(model = %config.model, prompt_len = prompt.len()))]
    pub async fn send(
        &self,
        prompt: &str,
        config: &CompletionConfig,
    ) -> Result<String, CompletionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            warn!("Prompt was empty, not sending a request");
            return Ok(String::new());
        }

        let _guard = self.in_flight.lock().await;
        let mut retries: u32 = 0;

        loop {
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            let signal = match self.service.complete(prompt, config).await {
                Ok(text) => return Ok(text),
                Err(CompletionError::CapacityExceeded(signal)) => signal,
                Err(e) => {
                    warn!("Request failed ({}): {}", e.code(), e);
                    return Err(e);
                }
            };

            if self.max_retries.is_some_and(|max| retries >= max) {
                return Err(CompletionError::RetriesExhausted {
                    attempts: retries + 1,
                });
            }

            let wait = signal.wait_seconds(self.fallback_wait_secs);
            info!(
                "Rate limited (hint: {}), waiting {}s before retrying",
                signal.hint.as_deref().unwrap_or("none"),
                wait
            );
            self.wait(wait).await;

            retries += 1;
            self.stats.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn wait(&self, seconds: u64) {
        for remaining in (1..=seconds).rev() {
            debug!("Waiting {} seconds before re-sending", remaining);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.stats.seconds_waited.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::RateLimitSignal;
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replays scripted outcomes and counts calls.
    struct Scripted {
        outcomes: StdMutex<VecDeque<Result<String, CompletionError>>>,
        calls: AtomicU64,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: StdMutex::new(outcomes.into()),
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(
            &self,
            _prompt: &str,
            _config: &CompletionConfig,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("done".to_string()))
        }
    }

    fn capacity(hint: Option<&str>) -> Result<String, CompletionError> {
        Err(CompletionError::CapacityExceeded(RateLimitSignal::new(
            hint.map(str::to_string),
        )))
    }

    #[test]
    fn test_parse_retry_after_units() {
        assert_eq!(parse_retry_after("12s"), 12);
        assert_eq!(parse_retry_after("2m"), 120);
        assert_eq!(parse_retry_after("1h"), 3600);
        assert_eq!(parse_retry_after("0.4s"), 1);
        assert_eq!(parse_retry_after("1.5M"), 120);
    }

    #[test]
    fn test_parse_retry_after_fallback() {
        assert_eq!(parse_retry_after("bogus"), 60);
        assert_eq!(parse_retry_after(""), 60);
        assert_eq!(parse_retry_after("s"), 60);
        assert_eq!(parse_retry_after("30"), 60);
        assert_eq!(parse_retry_after("1.2.3s"), 60);
        assert_eq!(try_parse_retry_after("bogus"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_through_capacity_errors() {
        let service = Scripted::new(vec![capacity(Some("3s")), capacity(None)]);
        let client = RateLimitedClient::new(service.clone()).with_fallback_wait(5);

        let started = tokio::time::Instant::now();
        let text = client.send("summarize this", &CompletionConfig::default()).await.unwrap();

        assert_eq!(text, "done");
        assert_eq!(service.calls(), 3);
        assert_eq!(
            client.stats(),
            RetrySnapshot {
                attempts: 3,
                retries: 2,
                seconds_waited: 8
            }
        );
        assert!(started.elapsed() >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let service = Scripted::new(vec![Err(CompletionError::Auth("invalid key".into()))]);
        let client = RateLimitedClient::new(service.clone());

        let err = client.send("prompt", &CompletionConfig::default()).await.unwrap_err();

        assert!(matches!(err, CompletionError::Auth(_)));
        assert_eq!(service.calls(), 1);
        assert_eq!(client.stats().retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_after_backoff_propagates() {
        let service = Scripted::new(vec![
            capacity(Some("1s")),
            Err(CompletionError::Rejected("content policy".into())),
        ]);
        let client = RateLimitedClient::new(service.clone());

        let err = client.send("prompt", &CompletionConfig::default()).await.unwrap_err();

        assert!(matches!(err, CompletionError::Rejected(_)));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_never_sent() {
        let service = Scripted::new(vec![]);
        let client = RateLimitedClient::new(service.clone());

        let text = client.send("  \n\t ", &CompletionConfig::default()).await.unwrap();

        assert!(text.is_empty());
        assert_eq!(service.calls(), 0);
        assert_eq!(client.stats().attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cap_is_honoured() {
        let service = Scripted::new(vec![
            capacity(Some("1s")),
            capacity(Some("1s")),
            capacity(Some("1s")),
        ]);
        let client = RateLimitedClient::new(service.clone()).with_max_retries(Some(2));

        let err = client.send("prompt", &CompletionConfig::default()).await.unwrap_err();

        assert!(matches!(err, CompletionError::RetriesExhausted { attempts: 3 }));
        assert_eq!(service.calls(), 3);
        assert_eq!(client.stats().seconds_waited, 2);
    }
}
