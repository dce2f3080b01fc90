//! Sequential retry with linear backoff.
//!
//! The delay before attempt `n + 1` is `backoff_step * n`; with the default
//! 500 ms step and 3 attempts the waits are 500 ms then 1 s. No sleep
//! follows the final attempt.
//!
//! [`call_with_retry`] degrades to an empty string when every attempt fails,
//! so a batch of pages keeps going. [`try_with_retry`] reports the failure
//! instead.

use crate::error::RetryExhausted;
use crate::llm::client::LlmClient;
use crate::llm::provider::CompletionRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, not retries after the first. `0` makes no call.
    pub retry_times: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_times: 3,
            backoff_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(retry_times: u32, backoff_step: Duration) -> Self {
        Self {
            retry_times,
            backoff_step,
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Call `client.completion` up to `policy.retry_times` times.
pub async fn try_with_retry(
    client: &LlmClient,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<String, RetryExhausted> {
    let total = policy.retry_times;
    let mut last_error = None;

    for attempt in 1..=total {
        match client.completion(request).await {
            Ok(text) => {
                if attempt > 1 {
                    debug!("LLM call succeeded on attempt {}/{}", attempt, total);
                }
                return Ok(text);
            }
            Err(e) => {
                warn!("LLM call failed (attempt {}/{}): {}", attempt, total, e);
                last_error = Some(e);
                if attempt < total {
                    sleep(policy.delay_after(attempt)).await;
                }
            }
        }
    }

    Err(RetryExhausted {
        attempts: total,
        last_error,
    })
}

/// Like [`try_with_retry`], but returns `""` once attempts run out.
pub async fn call_with_retry(
    client: &LlmClient,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> String {
    match try_with_retry(client, request, policy).await {
        Ok(text) => text,
        Err(e) => {
            error!("{}; returning empty result", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::llm::MockProvider;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn client(mock: &Arc<MockProvider>) -> LlmClient {
        LlmClient::new(mock.clone())
    }

    fn default_policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Paused-clock elapsed time, allowing for timer granularity.
    fn within(waited: Duration, expected_ms: u64) -> bool {
        waited >= Duration::from_millis(expected_ms)
            && waited < Duration::from_millis(expected_ms + 100)
    }

    #[test]
    fn linear_delays() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_after(1), Duration::from_millis(500));
        assert_eq!(p.delay_after(2), Duration::from_millis(1000));
        assert_eq!(p.delay_after(3), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_try_without_sleeping() {
        let mock = Arc::new(MockProvider::new().with_response("x"));
        let started = Instant::now();
        let out =
            call_with_retry(&client(&mock), &CompletionRequest::new("q"), &default_policy()).await;
        assert_eq!(out, "x");
        assert_eq!(mock.call_count(), 1);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_failure() {
        let mock = Arc::new(MockProvider::new().with_failure(500, "oops").with_response("x"));
        let started = Instant::now();
        let out = try_with_retry(&client(&mock), &CompletionRequest::new("q"), &default_policy())
            .await
            .unwrap();
        assert_eq!(out, "x");
        assert_eq!(mock.call_count(), 2);
        let waited = started.elapsed();
        assert!(within(waited, 500), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_and_degrades_to_empty() {
        let mock = Arc::new(
            MockProvider::new()
                .with_failure(500, "a")
                .with_failure(502, "b")
                .with_failure(503, "c"),
        );
        let started = Instant::now();
        let out =
            call_with_retry(&client(&mock), &CompletionRequest::new("q"), &default_policy()).await;
        assert_eq!(out, "");
        assert_eq!(mock.call_count(), 3);
        // 0.5 s + 1.0 s, nothing after the last attempt
        let waited = started.elapsed();
        assert!(within(waited, 1500), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_last_attempt() {
        let mock = Arc::new(
            MockProvider::new()
                .with_failure(500, "a")
                .with_failure(503, "b")
                .with_response("ok"),
        );
        let started = Instant::now();
        let out =
            call_with_retry(&client(&mock), &CompletionRequest::new("q"), &default_policy()).await;
        assert_eq!(out, "ok");
        assert_eq!(mock.call_count(), 3);
        let waited = started.elapsed();
        assert!(within(waited, 1500), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_error_keeps_last_failure() {
        let mock = Arc::new(
            MockProvider::new()
                .with_failure(500, "a")
                .with_failure(429, "slow down"),
        );
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let err = try_with_retry(&client(&mock), &CompletionRequest::new("q"), &policy)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert!(matches!(
            err.last_error,
            Some(BackendError::Status { status: 429, .. })
        ));
    }

    #[tokio::test]
    async fn zero_attempts_makes_no_call() {
        let mock = Arc::new(MockProvider::new());
        let policy = RetryPolicy::new(0, Duration::from_millis(500));
        let err = try_with_retry(&client(&mock), &CompletionRequest::new("q"), &policy)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 0);
        assert!(err.last_error.is_none());
        let out = call_with_retry(&client(&mock), &CompletionRequest::new("q"), &policy).await;
        assert_eq!(out, "");
        assert_eq!(mock.call_count(), 0);
    }
}
