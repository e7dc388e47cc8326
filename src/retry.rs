//! Bounded retries for calls to external collaborators.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed(Duration),
    /// The n-th failure waits `n * step`.
    Linear(Duration),
}

/// Retry policy: total attempts (including the first) and backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn linear(attempts: u32, step: Duration) -> Self {
        Self {
            attempts,
            backoff: Backoff::Linear(step),
        }
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay after the given number of failed attempts (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Linear(step) => step * failures,
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the last error when every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut failures = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failures += 1;
                    if failures >= attempts {
                        tracing::error!("{} failed after {} attempts: {}", label, failures, e);
                        return Err(e);
                    }
                    let delay = self.delay_after(failures);
                    tracing::warn!(
                        "{} attempt {} failed: {}; retrying in {:?}",
                        label,
                        failures,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
