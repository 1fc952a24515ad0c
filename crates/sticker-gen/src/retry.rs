//! Fixed-delay retry executor
//!
//! Every outbound provider call (including prediction polling) runs
//! through a `RetryPolicy`. The delay is constant between attempts so
//! behavior stays reproducible under test.

use std::fmt::Display;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_MS: u64 = 300;

/// Attempt budget and inter-attempt delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A policy that runs the operation exactly once
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Invoke `op` up to `attempts` times, returning the first success or
    /// the last error.
    pub fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
    {
        self.run_while(op, |_| true)
    }

    /// Like [`RetryPolicy::run`], but stops as soon as `retryable` rejects
    /// an error. The rejected error is returned as-is.
    pub fn run_while<T, E, F, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= attempts || !retryable(&err) {
                        return Err(err);
                    }
                    tracing::debug!(attempt, attempts, error = %err, "attempt failed, retrying");
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
