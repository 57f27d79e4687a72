//! Retrying translator: absorbs transient remote failures for one paragraph.
//!
//! ## Backoff
//!
//! Random exponential backoff. After the n-th failed attempt the wait is
//! drawn uniformly from `[min_delay, ceiling(n)]` where
//! `ceiling(n) = clamp(multiplier · 2^(n-1), min_delay, max_delay)`.
//! With the defaults (1 s multiplier, 1 s min, 60 s max) the ceilings are
//! 1 s, 2 s, 4 s, 8 s, 16 s, then 32 s and 60 s for longer budgets. The
//! jitter spreads concurrent workers that all hit the same rate limit.

use super::client::TranslationClient;
use crate::error::{ClientError, TranslationFailed};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Decides whether an error is worth another attempt.
pub type RetryPredicate = fn(&ClientError) -> bool;

/// Retry every error. The default.
pub fn retry_any(_: &ClientError) -> bool {
    true
}

/// Retry everything except rejected credentials.
pub fn retry_transient(err: &ClientError) -> bool {
    !matches!(err, ClientError::Auth(_))
}

/// Retry budget and backoff envelope.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total invocations of the client, including the first. Default: 6.
    pub max_attempts: u32,
    /// Lower bound of every wait. Default: 1 s.
    pub min_delay: Duration,
    /// Upper bound of every wait. Default: 60 s.
    pub max_delay: Duration,
    /// Base of the exponential ceiling. Default: 1 s.
    pub multiplier: Duration,
    /// Which errors are retried. Default: [`retry_any`].
    pub retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: Duration::from_secs(1),
            retryable: retry_any,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay,
            max_delay,
            multiplier: min_delay,
            ..Self::default()
        }
    }

    pub fn with_retryable(mut self, predicate: RetryPredicate) -> Self {
        self.retryable = predicate;
        self
    }

    /// Upper end of the wait after the `attempt`-th failure (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let exp = self.multiplier.checked_mul(factor).unwrap_or(self.max_delay);
        exp.max(self.min_delay).min(self.max_delay)
    }

    /// Random wait after the `attempt`-th failure.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let low = self.min_delay.min(self.max_delay).as_millis() as u64;
        let high = self.backoff_ceiling(attempt).as_millis() as u64;
        if high <= low {
            return Duration::from_millis(low);
        }
        Duration::from_millis(rng.gen_range(low..=high))
    }

    fn should_retry(&self, attempt: u32, err: &ClientError) -> bool {
        attempt < self.max_attempts && (self.retryable)(err)
    }
}

/// A successful translation and what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Remote invocations made; 0 for blank input.
    pub attempts: u32,
}

/// Wraps a [`TranslationClient`] with the retry policy and a per-call timeout.
#[derive(Clone)]
pub struct RetryingTranslator {
    client: Arc<dyn TranslationClient>,
    policy: RetryPolicy,
    call_timeout: Option<Duration>,
}

impl RetryingTranslator {
    pub fn new(client: Arc<dyn TranslationClient>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            call_timeout: None,
        }
    }

    /// Bound each remote call. `None` lets a call run as long as it likes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Translate the paragraph at `position`.
    ///
    /// Blank input returns `""` without touching the client. Otherwise the
    /// client is invoked up to `max_attempts` times; the last error comes
    /// back as [`TranslationFailed`].
    pub async fn translate(
        &self,
        position: usize,
        text: &str,
    ) -> Result<Translation, TranslationFailed> {
        if text.trim().is_empty() {
            return Ok(Translation {
                text: String::new(),
                attempts: 0,
            });
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.call_once(text).await {
                Ok(translated) => {
                    debug!(position, attempt, "paragraph translated");
                    return Ok(Translation {
                        text: translated,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            if !self.policy.should_retry(attempt, &err) {
                return Err(TranslationFailed {
                    position,
                    text: text.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }

            let mut delay = self.policy.backoff_delay(attempt, &mut rand::thread_rng());
            if let ClientError::RateLimited {
                retry_after_secs: Some(secs),
            } = err
            {
                delay = delay.max(Duration::from_secs(secs)).min(self.policy.max_delay);
            }

            warn!(
                position,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                client = self.client.name(),
                "Translate error: {err}, retrying..."
            );
            sleep(delay).await;
        }
    }

    async fn call_once(&self, text: &str) -> Result<String, ClientError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.translate(text))
                .await
                .unwrap_or(Err(ClientError::Timeout {
                    ms: limit.as_millis() as u64,
                })),
            None => self.client.translate(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then echoes the input uppercased.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: ClientError,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error: ClientError::Network("connection reset".into()),
            }
        }
    }

    #[async_trait]
    impl TranslationClient for Flaky {
        async fn translate(&self, text: &str) -> Result<String, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    struct Hangs;

    #[async_trait]
    impl TranslationClient for Hangs {
        async fn translate(&self, _text: &str) -> Result<String, ClientError> {
            std::future::pending().await
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(6, Duration::from_millis(1), Duration::from_millis(5))
    }

    #[test]
    fn default_policy_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 6);
        assert_eq!(p.min_delay, Duration::from_secs(1));
        assert_eq!(p.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn ceiling_grows_and_caps() {
        let p = RetryPolicy::default();
        let secs: Vec<u64> = (1..=8).map(|n| p.backoff_ceiling(n).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(p.backoff_ceiling(200), Duration::from_secs(60));
    }

    #[test]
    fn ceiling_is_monotone_non_decreasing() {
        let p = RetryPolicy::default();
        for n in 1..64 {
            assert!(p.backoff_ceiling(n) <= p.backoff_ceiling(n + 1), "n = {n}");
        }
    }

    #[test]
    fn delay_stays_inside_envelope() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=10 {
            for _ in 0..200 {
                let d = p.backoff_delay(attempt, &mut rng);
                assert!(d >= p.min_delay, "{d:?} below min");
                assert!(d <= p.backoff_ceiling(attempt), "{d:?} above ceiling");
                assert!(d <= Duration::from_secs(60));
            }
        }
    }

    #[test]
    fn mean_delay_increases_with_attempts() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mean = |attempt: u32, rng: &mut StdRng| -> f64 {
            (0..500)
                .map(|_| p.backoff_delay(attempt, rng).as_secs_f64())
                .sum::<f64>()
                / 500.0
        };
        let means: Vec<f64> = (1..=7).map(|a| mean(a, &mut rng)).collect();
        for w in means.windows(2) {
            assert!(w[0] <= w[1], "means not increasing: {means:?}");
        }
    }

    #[test]
    fn transient_predicate_skips_auth() {
        assert!(retry_transient(&ClientError::Timeout { ms: 1_000 }));
        assert!(!retry_transient(&ClientError::Auth("bad key".into())));
        assert!(retry_any(&ClientError::Auth("bad key".into())));
    }

    #[tokio::test]
    async fn blank_input_makes_no_call() {
        let client = Arc::new(Flaky::new(0));
        let t = RetryingTranslator::new(client.clone(), fast_policy());
        for blank in ["", "   ", "\t \n"] {
            let out = t.translate(0, blank).await.unwrap();
            assert_eq!(out.text, "");
            assert_eq!(out.attempts, 0);
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn succeeds_after_k_failures() {
        for k in 0..6 {
            let client = Arc::new(Flaky::new(k));
            let t = RetryingTranslator::new(client.clone(), fast_policy());
            let out = t.translate(0, "abc").await.unwrap();
            assert_eq!(out.text, "ABC");
            assert_eq!(out.attempts, k + 1);
            assert_eq!(client.calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn gives_up_after_six_attempts() {
        let client = Arc::new(Flaky::new(u32::MAX));
        let t = RetryingTranslator::new(client.clone(), fast_policy());
        let err = t.translate(4, "abc").await.unwrap_err();
        assert_eq!(client.calls.load(Ordering::SeqCst), 6);
        assert_eq!(err.attempts, 6);
        assert_eq!(err.position, 4);
        assert_eq!(err.text, "abc");
        assert_eq!(err.source, ClientError::Network("connection reset".into()));
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let client = Arc::new(Flaky {
            error: ClientError::Auth("bad key".into()),
            ..Flaky::new(u32::MAX)
        });
        let policy = fast_policy().with_retryable(retry_transient);
        let t = RetryingTranslator::new(client.clone(), policy);
        let err = t.translate(0, "abc").await.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn default_backoff_waits_within_cap() {
        let client = Arc::new(Flaky::new(u32::MAX));
        let t = RetryingTranslator::new(client.clone(), RetryPolicy::default());
        let start = tokio::time::Instant::now();
        let err = t.translate(0, "abc").await.unwrap_err();
        let waited = start.elapsed();
        assert_eq!(err.attempts, 6);
        // Five waits, each in [1 s, ceiling(n)] => total in [5 s, 31 s].
        assert!(waited >= Duration::from_secs(5), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(31) + Duration::from_millis(50), "waited {waited:?}");
    }

    fn rate_limited_once(retry_after_secs: u64) -> Arc<Flaky> {
        Arc::new(Flaky {
            error: ClientError::RateLimited {
                retry_after_secs: Some(retry_after_secs),
            },
            ..Flaky::new(1)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_a_lower_bound_on_the_wait() {
        let policy = RetryPolicy::new(6, Duration::from_millis(1), Duration::from_secs(60));
        let t = RetryingTranslator::new(rate_limited_once(7), policy);
        let start = tokio::time::Instant::now();
        let out = t.translate(0, "abc").await.unwrap();
        let waited = start.elapsed();
        assert_eq!(out.attempts, 2);
        assert!(waited >= Duration::from_secs(7), "waited {waited:?}");
        assert!(waited < Duration::from_secs(8), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_is_capped_at_max_delay() {
        let policy = RetryPolicy::new(6, Duration::from_millis(1), Duration::from_secs(60));
        let t = RetryingTranslator::new(rate_limited_once(600), policy);
        let start = tokio::time::Instant::now();
        let out = t.translate(0, "abc").await.unwrap();
        let waited = start.elapsed();
        assert_eq!(out.attempts, 2);
        assert!(waited >= Duration::from_secs(60), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(60) + Duration::from_millis(50), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_and_counts_as_attempt() {
        let t = RetryingTranslator::new(Arc::new(Hangs), fast_policy())
            .with_timeout(Some(Duration::from_secs(30)));
        let err = t.translate(0, "abc").await.unwrap_err();
        assert_eq!(err.attempts, 6);
        assert_eq!(err.source, ClientError::Timeout { ms: 30_000 });
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_reports_milliseconds() {
        let t = RetryingTranslator::new(Arc::new(Hangs), fast_policy())
            .with_timeout(Some(Duration::from_millis(250)));
        let err = t.translate(0, "abc").await.unwrap_err();
        assert_eq!(err.source, ClientError::Timeout { ms: 250 });
        assert_eq!(err.source.to_string(), "call timed out after 250ms");
    }
}
