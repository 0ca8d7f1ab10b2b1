use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Delay schedule: `unit * base^attempt + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: u32,
    pub unit: Duration,
    pub offset: Duration,
}

impl Backoff {
    /// 1s, 2s, 4s, ...
    pub const fn doubling() -> Self {
        Self {
            base: 2,
            unit: Duration::from_secs(1),
            offset: Duration::ZERO,
        }
    }

    /// 2s, 3s, 5s, ...
    pub const fn doubling_plus_one() -> Self {
        Self {
            base: 2,
            unit: Duration::from_secs(1),
            offset: Duration::from_secs(1),
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.base.checked_pow(attempt).unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor).saturating_add(self.offset)
    }
}

/// One scheduled retry, handed to observers before the wait begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// Zero-based index of the attempt that just failed.
    pub attempt: u32,
    /// Attempts still available after this wait.
    pub remaining: u32,
    pub wait: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    Fatal(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Schedule used for translation chunks.
    pub fn translation(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::doubling())
    }

    /// Schedule used for the synthesis generation call.
    pub fn synthesis(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::doubling_plus_one())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run<T, E, F, Fut>(
        &self,
        op: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_observed(op, is_retryable, |_| {}).await
    }

    /// Like [`run`](Self::run), reporting every scheduled wait to `observe`.
    pub async fn run_observed<T, E, F, Fut>(
        &self,
        mut op: F,
        is_retryable: impl Fn(&E) -> bool,
        mut observe: impl FnMut(&RetryAttempt),
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
                Err(e) => e,
            };

            let remaining = self.max_attempts - attempt - 1;
            if remaining == 0 {
                return Err(RetryError::Exhausted {
                    attempts: self.max_attempts,
                    last: err,
                });
            }

            let step = RetryAttempt {
                attempt,
                remaining,
                wait: self.backoff.delay(attempt),
            };
            warn!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                wait_secs = step.wait.as_secs_f64(),
                error = %err,
                "transient failure, backing off"
            );
            observe(&step);
            tokio::time::sleep(step.wait).await;
            attempt += 1;
        }
    }
}
