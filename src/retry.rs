//! # retry — bounded, jittered backoff around network collaborators
//!
//! Only the coordinator uses this. The engine never retries anything.
//!
//! Delay before attempt `n + 1` is `base_delay * 2^(n - 1)`, capped at
//! `max_delay`, then drawn uniformly from the upper half of that value so that
//! several bots started by the same cron tick do not retry in lockstep.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::BotError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (≥ 1)
    pub max_attempts: u32,
    pub base_delay:   Duration,
    pub max_delay:    Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay:   Duration::from_millis(500),
            max_delay:    Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Un-jittered backoff after `attempt` failed attempts (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff with jitter in `[backoff / 2, backoff]`.
    pub fn jittered(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff(attempt).as_millis() as u64;
        let millis = rand::thread_rng().gen_range(ceiling / 2..=ceiling);
        Duration::from_millis(millis)
    }
}

/// Run `op` until it succeeds, fails with a non-collaborator error, or the
/// policy runs out of attempts. The last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    policy:    &RetryPolicy,
    operation: &str,
    mut op:    F,
) -> Result<T, BotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BotError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.collaborator().is_some() && attempt < policy.max_attempts => {
                let delay = policy.jittered(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms     = delay.as_millis() as u64,
                    error        = %err,
                    "⚠️ Collaborator call failed — retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn make_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay:  Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay:   Duration::from_millis(100),
            max_delay:    Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_in_upper_half() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay:   Duration::from_millis(400),
            max_delay:    Duration::from_secs(10),
        };
        for _ in 0..100 {
            let delay = policy.jittered(1);
            assert!(delay >= Duration::from_millis(200) && delay <= Duration::from_millis(400));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&make_policy(3), "fetch", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(BotError::market_data("timeout"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&make_policy(2), "send", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BotError::notifier("HTTP 502")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&make_policy(5), "fetch", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BotError::InsufficientData { needed: 2, got: 0 }) }
        })
        .await;
        assert!(matches!(result, Err(BotError::InsufficientData { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
