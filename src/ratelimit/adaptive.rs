//! Burst-aware rate limiter with failure backoff

use super::Throttle;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Failures needed before the interval starts doubling
const FAILURE_THRESHOLD: u32 = 3;
/// Once this many successes are on record, failures no longer back off
const SUCCESS_FLOOR: u32 = 10;

/// Snapshot of the limiter's health counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveStats {
    pub interval: Duration,
    pub successes: u32,
    pub failures: u32,
    pub degraded: bool,
    pub grants_in_window: usize,
}

struct AdaptiveState {
    last_grant: Option<Instant>,
    window_grants: VecDeque<Instant>,
    interval: Duration,
    successes: u32,
    failures: u32,
    degraded: bool,
}

impl AdaptiveState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.window_grants.front() {
            if oldest + window <= now {
                self.window_grants.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rate limiter with a per-window burst quota and multiplicative backoff
pub struct AdaptiveRateLimiter {
    base_interval: Duration,
    max_interval: Duration,
    burst_window: Duration,
    burst_quota: usize,
    state: Mutex<AdaptiveState>,
}

impl AdaptiveRateLimiter {
    /// Create a limiter granting at most `burst_quota` slots per `burst_window`,
    /// spaced at least `min_interval` apart. Backoff never pushes the interval
    /// beyond `max_interval`.
    pub fn new(
        min_interval: Duration,
        burst_window: Duration,
        burst_quota: usize,
        max_interval: Duration,
    ) -> Self {
        Self {
            base_interval: min_interval,
            max_interval: max_interval.max(min_interval),
            burst_window,
            burst_quota: burst_quota.max(1),
            state: Mutex::new(AdaptiveState {
                last_grant: None,
                window_grants: VecDeque::new(),
                interval: min_interval,
                successes: 0,
                failures: 0,
                degraded: false,
            }),
        }
    }

    /// Build from the `[rate_limit]` config section
    pub fn from_config(config: &crate::config::RateLimitConfig) -> Self {
        Self::new(
            config.min_interval(),
            config.burst_window(),
            config.burst_quota,
            config.max_interval(),
        )
    }

    /// Wait for both the spacing interval and the burst quota.
    /// Returns the instant the slot was granted.
    pub async fn wait_for_slot(&self) -> Instant {
        let mut state = self.state.lock().await;

        loop {
            let now = Instant::now();
            state.prune(now, self.burst_window);

            let mut ready_at = now;
            if let Some(previous) = state.last_grant {
                ready_at = ready_at.max(previous + state.interval);
            }
            if state.window_grants.len() >= self.burst_quota {
                if let Some(&oldest) = state.window_grants.front() {
                    tracing::debug!(
                        "Burst quota of {} exhausted, waiting for window to roll over",
                        self.burst_quota
                    );
                    ready_at = ready_at.max(oldest + self.burst_window);
                }
            }

            if ready_at <= now {
                break;
            }
            tokio::time::sleep_until(ready_at).await;
        }

        let granted = Instant::now();
        state.last_grant = Some(granted);
        state.window_grants.push_back(granted);
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

    /// Count a success; clears the degraded flag but keeps the current interval
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.successes = state.successes.saturating_add(1);
        if state.degraded {
            state.degraded = false;
            tracing::info!(
                "Upstream recovered, interval stays at {:?} until reset",
                state.interval
            );
        }
    }

    /// Count a failure; doubles the interval once failures dominate
    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.failures = state.failures.saturating_add(1);

        if state.failures >= FAILURE_THRESHOLD && state.successes < SUCCESS_FLOOR {
            let doubled = state.interval.saturating_mul(2).min(self.max_interval);
            tracing::warn!(
                "Backing off after {} failures ({} successes): {:?} -> {:?}",
                state.failures,
                state.successes,
                state.interval,
                doubled
            );
            state.interval = doubled;
            state.degraded = true;
        }
    }

    /// Restore the base interval and clear all counters
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.interval = self.base_interval;
        state.successes = 0;
        state.failures = 0;
        state.degraded = false;
    }

    pub async fn stats(&self) -> AdaptiveStats {
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.burst_window);
        AdaptiveStats {
            interval: state.interval,
            successes: state.successes,
            failures: state.failures,
            degraded: state.degraded,
            grants_in_window: state.window_grants.len(),
        }
    }
}

impl Throttle for AdaptiveRateLimiter {
    async fn wait_for_slot(&self) {
        AdaptiveRateLimiter::wait_for_slot(self).await;
    }

    async fn record_success(&self) {
        AdaptiveRateLimiter::record_success(self).await
    }

    async fn record_failure(&self) {
        AdaptiveRateLimiter::record_failure(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(interval_ms: u64, window_ms: u64, quota: usize) -> AdaptiveRateLimiter {
        AdaptiveRateLimiter::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(window_ms),
            quota,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_burst_quota_blocks_until_window_rolls() {
        let window = Duration::from_millis(120);
        let limiter = limiter(0, 120, 2);

        let first = limiter.wait_for_slot().await;
        let second = limiter.wait_for_slot().await;
        let third = limiter.wait_for_slot().await;

        assert!(second - first < window);
        assert!(third - first >= window);
    }

    #[tokio::test]
    async fn test_interval_still_enforced() {
        let limiter = limiter(25, 10_000, 100);
        let first = limiter.wait_for_slot().await;
        let second = limiter.wait_for_slot().await;
        assert!(second - first >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_backoff_after_three_failures() {
        let limiter = limiter(10, 1000, 10);

        limiter.record_failure().await;
        limiter.record_failure().await;
        assert_eq!(limiter.stats().await.interval, Duration::from_millis(10));
        assert!(!limiter.stats().await.degraded);

        limiter.record_failure().await;
        let stats = limiter.stats().await;
        assert_eq!(stats.interval, Duration::from_millis(20));
        assert!(stats.degraded);

        limiter.record_failure().await;
        assert_eq!(limiter.stats().await.interval, Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_success_clears_degraded_but_keeps_interval() {
        let limiter = limiter(10, 1000, 10);
        for _ in 0..3 {
            limiter.record_failure().await;
        }
        limiter.record_success().await;

        let stats = limiter.stats().await;
        assert!(!stats.degraded);
        assert_eq!(stats.interval, Duration::from_millis(20));

        limiter.reset().await;
        let stats = limiter.stats().await;
        assert_eq!(stats.interval, Duration::from_millis(10));
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn test_no_backoff_with_enough_successes() {
        let limiter = limiter(10, 1000, 10);
        for _ in 0..10 {
            limiter.record_success().await;
        }
        for _ in 0..5 {
            limiter.record_failure().await;
        }
        let stats = limiter.stats().await;
        assert_eq!(stats.interval, Duration::from_millis(10));
        assert!(!stats.degraded);
    }

    #[tokio::test]
    async fn test_backoff_is_capped() {
        let limiter = AdaptiveRateLimiter::new(
            Duration::from_millis(100),
            Duration::from_secs(1),
            10,
            Duration::from_millis(300),
        );
        for _ in 0..6 {
            limiter.record_failure().await;
        }
        assert_eq!(limiter.stats().await.interval, Duration::from_millis(300));
    }
}
