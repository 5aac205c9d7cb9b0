//! Request pacing
//!
//! Every external fetch goes through a [`Throttle`]. [`RateLimiter`] enforces
//! a fixed minimum spacing between granted slots; [`AdaptiveRateLimiter`]
//! adds a per-window burst quota and multiplicative backoff on failures.
//!
//! Waiters queue on a `tokio::sync::Mutex`, which hands out the lock in
//! request order, so concurrent callers are served first-come-first-served.

mod adaptive;

pub use adaptive::{AdaptiveRateLimiter, AdaptiveStats};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Pacing contract consumed by the discovery engine
#[allow(async_fn_in_trait)]
pub trait Throttle {
    /// Resolve once the caller may start its operation
    async fn wait_for_slot(&self);

    /// Report that the paced operation succeeded
    async fn record_success(&self) {}

    /// Report that the paced operation failed
    async fn record_failure(&self) {}
}

impl<T: Throttle> Throttle for Arc<T> {
    async fn wait_for_slot(&self) {
        (**self).wait_for_slot().await
    }

    async fn record_success(&self) {
        (**self).record_success().await
    }

    async fn record_failure(&self) {
        (**self).record_failure().await
    }
}

/// Fixed-interval rate limiter
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `min_interval` has passed since the previous grant.
    /// Returns the instant the slot was granted.
    pub async fn wait_for_slot(&self) -> Instant {
        let mut last = self.last_grant.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    "Rate limiter waiting {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let granted = Instant::now();
        *last = Some(granted);
        granted
    }

    /// Wait for a slot, then run `operation`
    pub async fn execute<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait_for_slot().await;
        operation().await
    }
}

impl Throttle for RateLimiter {
    async fn wait_for_slot(&self) {
        RateLimiter::wait_for_slot(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_slot_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.wait_for_slot().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sequential_spacing() {
        let interval = Duration::from_millis(40);
        let limiter = RateLimiter::new(interval);

        let mut grants = Vec::new();
        for _ in 0..4 {
            grants.push(limiter.wait_for_slot().await);
        }

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_keep_spacing() {
        let interval = Duration::from_millis(30);
        let limiter = Arc::new(RateLimiter::new(interval));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { RateLimiter::wait_for_slot(&limiter).await })
            })
            .collect();

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[tokio::test]
    async fn test_execute_runs_operation() {
        let limiter = RateLimiter::new(Duration::from_millis(5));
        let value = limiter.execute(|| async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }
}
