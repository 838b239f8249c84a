//! Per-action request throttling
//!
//! The vendor limits requests per action (20/s by default). Every call waits
//! on `check(action)` before it is sent.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 20;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            min_interval: interval_for(requests_per_second),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until `action` may be called again
    pub async fn check(&self, action: &str) {
        let wait_until = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(action).copied().unwrap_or(now).max(now);
            slots.insert(action.to_string(), slot + self.min_interval);
            slot
        };

        if wait_until > Instant::now() {
            log::debug!("rate limit: delaying {} until its next slot", action);
            tokio::time::sleep_until(wait_until).await;
        }
    }
}

fn interval_for(requests_per_second: u32) -> Duration {
    if requests_per_second == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / requests_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_spaces_calls_to_same_action() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check("DescribeInstances").await;
        }

        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_are_independent() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();

        limiter.check("DescribeVpcs").await;
        limiter.check("DescribeSubnets").await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
