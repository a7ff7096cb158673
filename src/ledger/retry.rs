//! Bounded fixed-interval polling.

use log::debug;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Sleep `interval`, then probe; repeat up to `max_attempts` times.
///
/// Returns the first `Some` produced by `probe`, or `None` once the attempts
/// are exhausted. Dropping the future cancels the remaining attempts.
pub async fn poll<T, F, Fut>(policy: RetryPolicy, mut probe: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        if let Some(value) = probe(attempt).await {
            return Some(value);
        }
        debug!("poll attempt {}/{} came back empty", attempt, policy.max_attempts);
    }
    None
}
