//! LLM access with exponential backoff.
//!
//! - [`AskAsync`]: send a prompt, get a completion
//! - [`TemplateAsk`]: `awful_aj` chat call bound to one template
//! - [`RetryAsk`]: decorator that retries any [`AskAsync`] using a [`Backoff`]
//!
//! [`Backoff`] is shared with the TTS client, which retries the same way.

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retry schedule: `min(base * 2^(attempt-1), max) + jitter(0..=250ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_retries: usize,
    pub base_delay: StdDuration,
    pub max_delay: StdDuration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: StdDuration::from_secs(1),
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn base_delay_for(&self, attempt: usize) -> StdDuration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    pub fn delay_for(&self, attempt: usize) -> StdDuration {
        let jitter_ms: u64 = rng().random_range(0..=250);
        self.base_delay_for(attempt) + StdDuration::from_millis(jitter_ms)
    }

    /// Run `op` until it succeeds or retries are exhausted.
    pub async fn retry<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Box<dyn Error>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Box<dyn Error>>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(
                            %label,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        %label,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Adds [`Backoff`] retries to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    inner: T,
    backoff: Backoff,
}

impl<T: AskAsync> RetryAsk<T> {
    pub fn new(inner: T, backoff: Backoff) -> Self {
        Self { inner, backoff }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        self.backoff.retry("ask", || self.inner.ask(text)).await
    }
}

/// One `awful_aj` chat completion with a fixed template.
#[derive(Debug)]
pub struct TemplateAsk<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for TemplateAsk<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
        }
        res
    }
}

/// A [`TemplateAsk`] wrapped in the default [`Backoff`].
pub fn with_backoff<'a>(
    config: &'a AwfulJadeConfig,
    template: &'a ChatTemplate,
) -> RetryAsk<TemplateAsk<'a>> {
    RetryAsk::new(TemplateAsk { config, template }, Backoff::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky {
        failures_left: Cell<usize>,
        calls: Cell<usize>,
    }

    impl Flaky {
        fn failing(n: usize) -> Self {
            Self {
                failures_left: Cell::new(n),
                calls: Cell::new(0),
            }
        }
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("transient".into());
            }
            Ok(format!("echo: {text}"))
        }
    }

    fn fast(max_retries: usize) -> Backoff {
        Backoff {
            max_retries,
            base_delay: StdDuration::from_millis(1),
            max_delay: StdDuration::from_millis(2),
        }
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let b = Backoff::default();
        assert_eq!(b.base_delay_for(1), StdDuration::from_secs(1));
        assert_eq!(b.base_delay_for(2), StdDuration::from_secs(2));
        assert_eq!(b.base_delay_for(5), StdDuration::from_secs(16));
        assert_eq!(b.base_delay_for(6), StdDuration::from_secs(30));
        assert_eq!(b.base_delay_for(60), StdDuration::from_secs(30));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let b = Backoff::default();
        for _ in 0..50 {
            let d = b.delay_for(1);
            assert!(d >= StdDuration::from_secs(1));
            assert!(d <= StdDuration::from_millis(1_250));
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_errors() {
        let api = RetryAsk::new(Flaky::failing(2), fast(5));
        let out = api.ask("hi").await.unwrap();
        assert_eq!(out, "echo: hi");
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max() {
        let api = RetryAsk::new(Flaky::failing(10), fast(2));
        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.get(), 3);
    }
}
