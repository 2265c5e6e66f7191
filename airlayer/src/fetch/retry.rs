//! Retrying fetch wrapper with exponential backoff and jitter.

use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{looks_like_json, FetchError, HttpFetch};

/// Tuning for the retry wrapper.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts, including the initial one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles each retry.
    pub initial_backoff: Duration,
    /// Hard cap on the backoff delay.
    pub max_backoff: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_millis(1200),
            max_jitter: Duration::from_millis(120),
        }
    }
}

impl RetryConfig {
    /// Backoff delay before the retry following `attempt` (1-based),
    /// without jitter.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        (self.initial_backoff * factor).min(self.max_backoff)
    }
}

/// Retrying wrapper around an [`HttpFetch`] client.
///
/// Up to `max_attempts` tries with exponential backoff and jitter. A 2xx
/// response with a non-JSON body is treated as a transient failure and
/// retried like a network error. Cancellation is checked before each
/// attempt, fails fast, and is never retried.
pub struct RetryingFetch<H> {
    http: H,
    config: RetryConfig,
}

impl<H: HttpFetch> RetryingFetch<H> {
    pub fn new(http: H) -> Self {
        Self::with_config(http, RetryConfig::default())
    }

    pub fn with_config(http: H, config: RetryConfig) -> Self {
        Self { http, config }
    }

    /// Fetches `url`, returning the JSON body bytes.
    ///
    /// Exhausting all attempts surfaces the last error.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Bytes, FetchError> {
        let mut last_error = FetchError::Transient("no attempts made".into());

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            match self.http.get(url).await {
                Ok(response) => {
                    if looks_like_json(response.content_type.as_deref(), &response.body) {
                        return Ok(response.body);
                    }
                    // Mislabeled error body (often XML served as 200).
                    last_error = FetchError::NotJson {
                        content_type: response
                            .content_type
                            .unwrap_or_else(|| "unknown".to_string()),
                    };
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => last_error = e,
            }

            if attempt < self.config.max_attempts {
                let delay = self.config.backoff_for(attempt) + self.jitter();
                debug!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "fetch attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }

    fn jitter(&self) -> Duration {
        let max = self.config.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max))
    }
}
