//! Backoff wrapper around a [`ModelClient`].
//!
//! Retries transient model failures (rate limits, unavailable backends,
//! timeouts) with configurable exponential backoff. Never retries
//! configuration or judge-parsing errors. This sits outside the strategies:
//! wrap the client once, hand the wrapper to the benchmark.

use super::model::{ModelClient, ModelFuture, ModelRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How many times, and how patiently, to retry a model call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first failure. `0` disables retrying.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
    /// Shorten waits by a fixed per-attempt factor.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default delays with `retries` extra attempts.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// Wait before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let grown = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = grown.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Deterministic jitter keyed on the attempt number; no rand dependency.
            let factor = match attempt % 4 {
                0 => 0.75,
                1 => 0.90,
                2 => 0.60,
                _ => 0.85,
            };
            Duration::from_secs_f64(capped * factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// A [`ModelClient`] that retries transient failures of an inner client.
pub struct RetryingModel {
    inner: Arc<dyn ModelClient>,
    config: RetryConfig,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn ModelClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

impl ModelClient for RetryingModel {
    fn invoke(&self, request: ModelRequest) -> ModelFuture<'_> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                match self.inner.invoke(request.clone()).await {
                    Ok(text) => return Ok(text),
                    Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                        let delay = self.config.delay_for_attempt(attempt);
                        warn!(
                            "{}: {e}; retry {}/{} in {:?}",
                            self.inner.name(),
                            attempt + 1,
                            self.config.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error for the first `failures` calls.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        rate_limited: bool,
    }

    impl ModelClient for Flaky {
        fn invoke(&self, _request: ModelRequest) -> ModelFuture<'_> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.failures {
                    if self.rate_limited {
                        Err(ContextError::RateLimited("HTTP 429".into()))
                    } else {
                        Err(ContextError::Configuration("bad request".into()))
                    }
                } else {
                    Ok("ok".into())
                }
            })
        }
    }

    fn fast(retries: u32) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryConfig::with_retries(retries)
        }
    }

    #[test]
    fn retrying_is_off_by_default() {
        assert_eq!(RetryConfig::default().max_retries, 0);
    }

    #[test]
    fn waits_double_without_jitter() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(5)
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
    }

    #[test]
    fn waits_never_exceed_max_delay() {
        let config = RetryConfig {
            jitter: false,
            max_delay: Duration::from_secs(2),
            ..RetryConfig::with_retries(10)
        };
        assert!(config.delay_for_attempt(10) <= Duration::from_secs(2));
    }

    #[test]
    fn jitter_only_shortens_waits() {
        let jittered = RetryConfig::with_retries(3);
        let plain = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(3)
        };
        assert!(jittered.delay_for_attempt(2) <= plain.delay_for_attempt(2));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let flaky = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
            rate_limited: true,
        });
        let model = RetryingModel::new(flaky.clone(), fast(3));
        let out = model.invoke(ModelRequest::new("p", 10)).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let flaky = Arc::new(Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
            rate_limited: true,
        });
        let model = RetryingModel::new(flaky.clone(), fast(2));
        let err = model.invoke(ModelRequest::new("p", 10)).await.unwrap_err();
        assert!(matches!(err, ContextError::RateLimited(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_not_retried() {
        let flaky = Arc::new(Flaky {
            failures: 1,
            calls: AtomicU32::new(0),
            rate_limited: false,
        });
        let model = RetryingModel::new(flaky.clone(), fast(5));
        assert!(model.invoke(ModelRequest::new("p", 10)).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
