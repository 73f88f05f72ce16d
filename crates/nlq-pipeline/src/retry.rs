//! Retry with exponential backoff
//!
//! Retries are reserved for transient failures: the error's display text
//! (full chain, via the alternate formatter) is matched against a
//! configurable marker list, so a malformed request fails fast while a
//! rate-limited one backs off and tries again.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Substrings that mark an error as transient.
const DEFAULT_RETRIABLE_MARKERS: &[&str] = &[
    "rate limit",
    "429",
    "timeout",
    "timed out",
    "connection",
    "503",
    "unavailable",
    "overloaded",
    "reset",
];

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total invocation budget, including the first attempt.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// Randomize each delay by ±50% (never above the capped value).
    pub jitter: bool,
    pub retriable_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
            retriable_markers: DEFAULT_RETRIABLE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether the error text names a transient condition.
    pub fn is_retriable(&self, error_text: &str) -> bool {
        let lowered = error_text.to_lowercase();
        self.retriable_markers.iter().any(|m| lowered.contains(m))
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// Always within `[0, min(base · expⁿ, max_delay)]`, jitter included.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.exponential_base.powi(retry as i32);
        let capped = self
            .base_delay
            .mul_f64(exp)
            .min(self.max_delay);
        if !self.jitter {
            return capped;
        }
        let factor = rand::thread_rng().gen_range(0.5..=1.5);
        capped.mul_f64(factor).min(capped)
    }
}

/// Run `op`, retrying transient failures per `policy`.
///
/// Returns the final result and the number of invocations actually made
/// (1 when the first attempt succeeds).
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> (Result<T, E>, u32)
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return (Ok(value), attempts),
            Err(e) => {
                let text = format!("{:#}", e);
                if attempts >= policy.max_attempts.max(1) || !policy.is_retriable(&text) {
                    return (Err(e), attempts);
                }
                let delay = policy.delay_for(attempts - 1);
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %text,
                    "transient failure, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: false,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let (result, attempts) =
            retry_with_backoff(&fast_policy(), || async { Ok::<_, anyhow::Error>(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_error_exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = retry_with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(anyhow::anyhow!("rate limit exceeded")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = retry_with_backoff(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(anyhow::anyhow!("invalid request body")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = retry_with_backoff(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow::anyhow!("connection reset by peer"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_marker_matching_sees_error_chain() {
        let policy = fast_policy();
        let chained = anyhow::anyhow!("status 429").context("LLM call failed");
        assert!(policy.is_retriable(&format!("{:#}", chained)));
    }

    #[test]
    fn test_delay_never_exceeds_cap() {
        let policy = RetryPolicy::default();
        for retry in 0..10 {
            let capped = policy
                .base_delay
                .mul_f64(policy.exponential_base.powi(retry))
                .min(policy.max_delay);
            for _ in 0..20 {
                assert!(policy.delay_for(retry as u32) <= capped);
            }
        }
    }

    #[test]
    fn test_delay_grows_exponentially_without_jitter() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
    }
}
