//! Bounded retry with exponential backoff.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_tries: u32,
    /// Delay after the first failed attempt.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            initial_delay_ms: 2000,
            backoff: 2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self {
            max_tries: 1,
            initial_delay_ms: 0,
            backoff: 1,
        }
    }

    pub fn new(max_tries: u32, initial_delay: Duration, backoff: u32) -> Self {
        Self {
            max_tries,
            initial_delay_ms: initial_delay.as_millis() as u64,
            backoff,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_tries.max(1)
    }

    /// Delays slept between consecutive attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut next = Duration::from_millis(self.initial_delay_ms);
        (1..self.attempts()).map(move |_| {
            let current = next;
            next = next.saturating_mul(self.backoff);
            current
        })
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// The error of the final attempt is returned unchanged.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut delays = policy.delays();
    let mut attempt = 1u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => match delays.next() {
                Some(delay) => {
                    warn!(
                        operation,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "{}, retrying",
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                None => {
                    error!(operation, attempts = attempt, "{}", e);
                    return Err(e);
                }
            },
        }
    }
}
