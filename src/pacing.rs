//! Request pacing shared by the enumerator and the detail batcher.
//!
//! The Data API does not publish a per-second limit, so consecutive requests
//! are simply spaced out. Transport failures can optionally be retried; API
//! error payloads never are.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AnalysisResult;

pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// How the wait grows between attempts of the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential { max: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Pause inserted after every page or batch.
    pub delay: Duration,
    pub backoff: Backoff,
    /// Total tries per request; 1 disables retries.
    pub max_attempts: u32,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_REQUEST_DELAY,
            backoff: Backoff::Fixed,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PacingPolicy {
    /// Policy without any waiting, used by tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(max)
            }
        }
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Runs `op`, retrying transient failures until `max_attempts` is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> AnalysisResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AnalysisResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let wait = self.retry_delay(attempt);
                    warn!(%label, attempt, ?wait, error = %err, "retrying request");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(%label, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_policy_matches_fixed_spacing() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.retry_delay(3), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = PacingPolicy {
            delay: Duration::from_millis(100),
            backoff: Backoff::Exponential {
                max: Duration::from_millis(500),
            },
            max_attempts: 5,
        };
        assert_eq!(policy.retry_delay(1), Duration::from_millis(100));
        assert_eq!(policy.retry_delay(2), Duration::from_millis(200));
        assert_eq!(policy.retry_delay(3), Duration::from_millis(400));
        assert_eq!(policy.retry_delay(4), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn run_retries_network_failures_only_up_to_limit() {
        let policy = PacingPolicy {
            max_attempts: 3,
            ..PacingPolicy::immediate()
        };
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AnalysisResult<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AnalysisError::NetworkFailure("reset".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_does_not_retry_api_errors() {
        let policy = PacingPolicy {
            max_attempts: 3,
            ..PacingPolicy::immediate()
        };
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AnalysisResult<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AnalysisError::ApiError("forbidden".into()))
            })
            .await;
        assert_eq!(result, Err(AnalysisError::ApiError("forbidden".into())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_returns_first_success() {
        let policy = PacingPolicy {
            max_attempts: 4,
            ..PacingPolicy::immediate()
        };
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(AnalysisError::NetworkFailure("timeout".into()))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_waits_for_configured_delay() {
        let policy = PacingPolicy::default();
        let start = tokio::time::Instant::now();
        policy.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
