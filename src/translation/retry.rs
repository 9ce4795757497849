/*!
 * Bounded retry as a small state machine.
 *
 * `RetryPolicy::step` decides what happens after an attempt:
 * `Success`, `Retry { next_attempt, delay }` or `Fail`. Waiting goes through
 * the [`Delay`] trait so tests can record delays instead of sleeping.
 */

use async_trait::async_trait;
use log::warn;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;

use crate::errors::TranslationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Attempt `n` is followed by a wait of `n` units
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_millis(1000),
        }
    }
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    Success,
    Retry { next_attempt: u32, delay: Duration },
    Fail,
}

impl RetryPolicy {
    /// Next step after `attempt` (1-based) ended with `outcome`
    pub fn step<T>(&self, attempt: u32, outcome: &Result<T, TranslationError>) -> RetryStep {
        match outcome {
            Ok(_) => RetryStep::Success,
            Err(e) if e.is_retryable() && attempt < self.max_attempts => RetryStep::Retry {
                next_attempt: attempt + 1,
                delay: self.backoff_unit * attempt,
            },
            Err(_) => RetryStep::Fail,
        }
    }
}

/// Something that can wait
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real waiting on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns at once
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}

/// Run `operation` under `policy`; the closure receives the 1-based attempt
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    delay: &dyn Delay,
    mut operation: F,
) -> Result<T, TranslationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TranslationError>>,
{
    let mut attempt = 1;

    loop {
        let outcome = operation(attempt).await;

        match policy.step(attempt, &outcome) {
            RetryStep::Success | RetryStep::Fail => return outcome,
            RetryStep::Retry { next_attempt, delay: wait } => {
                if let Err(e) = &outcome {
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, policy.max_attempts, e, wait
                    );
                }
                delay.wait(wait).await;
                attempt = next_attempt;
            }
        }
    }
}
