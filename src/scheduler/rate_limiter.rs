//! REST request pacing.
//!
//! Sliding window over the timestamps of the last `max_requests` calls: a
//! caller that would exceed the budget sleeps until the oldest call leaves the
//! window. Nothing is queued on the limiter's side, so the backlog never grows
//! beyond the callers that are actually waiting.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Budget of `max_requests` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: RateLimitConfig {
                max_requests: config.max_requests.max(1),
                window: config.window,
            },
            issued: Mutex::new(VecDeque::with_capacity(config.max_requests.max(1))),
        }
    }

    #[inline]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Take a slot now if one is free, otherwise report how long to wait
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut issued = self.issued.lock();

        while let Some(&oldest) = issued.front() {
            if now.duration_since(oldest) >= self.config.window {
                issued.pop_front();
            } else {
                break;
            }
        }

        if issued.len() < self.config.max_requests {
            issued.push_back(now);
            return Ok(());
        }

        // Budget exhausted: wait out the remainder of the oldest call's window
        let oldest = issued.front().copied().unwrap_or(now);
        Err((oldest + self.config.window).saturating_duration_since(now))
    }

    /// Wait until a slot is free and take it
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => {
                    return;
                }
                Err(wait) => {
                    debug!(?wait, "REST budget exhausted, delaying request");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
