//! Rate limiting of outbound API calls, keyed by action name

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Token bucket refilled continuously at `rate` tokens per second
#[derive(Debug)]
struct TokenBucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    fn new(limit: u32, now: Instant) -> Self {
        let rate = f64::from(limit.max(1));
        Self {
            rate,
            burst: rate,
            tokens: rate,
            last: now,
        }
    }

    /// Take one token, returning how long the caller must wait for it.
    ///
    /// Tokens may go negative: a reservation is held even while the caller sleeps.
    fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last = now;
        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.rate)
        }
    }
}

/// Process-wide limiter shared by every client of a provider
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Wait until a call to `action` fits the budget
    pub async fn check(&self, action: &str) {
        let wait = self.reserve(action, Instant::now());
        if !wait.is_zero() {
            log::debug!("rate limit reached for {}, waiting {:?}", action, wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn reserve(&self, action: &str, now: Instant) -> Duration {
        let limit = self.config.limit_for(action);
        // The map guard is released before the caller sleeps.
        let mut bucket = self
            .buckets
            .entry(action.to_string())
            .or_insert_with(|| TokenBucket::new(limit, now));
        bucket.reserve(now)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
