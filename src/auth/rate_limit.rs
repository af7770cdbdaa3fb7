//! Per-IP rate limiting.
//!
//! Provides a sliding window rate limiter that caps the number of admitted
//! requests a single client IP can make within a trailing time window. The
//! request history lives in the [`ReplayCache`], so several gate instances
//! sharing one backend share one budget.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ReplayCache;
use crate::clock::Clock;
use crate::error::GuardResult;

/// Namespace for rate-limit histories in the cache.
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate-limit:";

/// A sliding window rate limiter that tracks admitted requests per IP.
///
/// Histories are pruned on every read and write, and written back with a
/// TTL equal to the window so idle IPs age out of the cache on their own.
pub struct RateLimiter {
    cache: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
    /// Maximum requests allowed per window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `max_requests` - Maximum requests allowed per window
    /// * `window` - Duration of the sliding window
    pub fn new(
        cache: Arc<dyn ReplayCache>,
        clock: Arc<dyn Clock>,
        max_requests: usize,
        window: Duration,
    ) -> Self {
        Self {
            cache,
            clock,
            max_requests,
            window,
        }
    }

    fn key(ip: &str) -> String {
        format!("{}{}", RATE_LIMIT_KEY_PREFIX, ip)
    }

    fn cutoff(&self, now: u64) -> u64 {
        now.saturating_sub(self.window.as_millis() as u64)
    }

    /// Whether `ip` has already used up its budget for the current window.
    pub async fn is_rate_limited(&self, ip: &str) -> GuardResult<bool> {
        let key = Self::key(ip);
        let Some(history) = self.cache.get_rate_limit_data(&key).await? else {
            return Ok(false);
        };

        let cutoff = self.cutoff(self.clock.now_ms());
        let recent = history.iter().filter(|&&t| t > cutoff).count();
        Ok(recent >= self.max_requests)
    }

    /// Record an admitted request from `ip` at the current time.
    pub async fn record_request(&self, ip: &str) -> GuardResult<()> {
        let key = Self::key(ip);
        let now = self.clock.now_ms();
        let cutoff = self.cutoff(now);

        let stored = self.cache.get_rate_limit_data(&key).await?;
        let mut history = stored.unwrap_or_default();
        history.push(now);
        history.retain(|&t| t > cutoff);

        let ttl = self.window;
        self.cache.set_rate_limit_data(&key, history, ttl).await
    }
}
