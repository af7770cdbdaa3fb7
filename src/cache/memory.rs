//! In-process cache backend with TTL-based expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::GuardResult;

use super::ReplayCache;

#[derive(Debug, Clone)]
enum CacheValue {
    Marker,
    Timestamps(Vec<u64>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    /// Epoch milliseconds after which the entry is dead.
    expires_at: u64,
}

impl CacheEntry {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

/// Thread-safe in-memory cache.
///
/// Expired entries are invisible to every read and are physically removed by
/// [`cleanup`](MemoryCache::cleanup), either on demand or from the task
/// started with [`start_cleanup_task`](MemoryCache::start_cleanup_task).
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Create a cache reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache reading the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Recover from mutex poisoning
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expiry(&self, now: u64, ttl: Duration) -> u64 {
        now.saturating_add(ttl.as_millis() as u64)
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries.
    pub fn cleanup(&self) {
        let now = self.clock.now_ms();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(
                removed,
                remaining = entries.len(),
                "Swept expired cache entries"
            );
        }
    }

    /// Start a background cleanup task.
    ///
    /// This spawns a tokio task that periodically removes expired entries.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                cache.cleanup();
            }
        });
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayCache for MemoryCache {
    async fn has(&self, key: &str) -> GuardResult<bool> {
        let now = self.clock.now_ms();
        let entries = self.lock();
        Ok(entries.get(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn add(&self, key: &str, ttl: Duration) -> GuardResult<()> {
        let now = self.clock.now_ms();
        let entry = CacheEntry {
            value: CacheValue::Marker,
            expires_at: self.expiry(now, ttl),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn add_if_absent(&self, key: &str, ttl: Duration) -> GuardResult<bool> {
        let now = self.clock.now_ms();
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        let entry = CacheEntry {
            value: CacheValue::Marker,
            expires_at: self.expiry(now, ttl),
        };
        entries.insert(key.to_string(), entry);
        Ok(true)
    }

    async fn get_rate_limit_data(&self, key: &str) -> GuardResult<Option<Vec<u64>>> {
        let now = self.clock.now_ms();
        let entries = self.lock();
        Ok(match entries.get(key) {
            Some(CacheEntry {
                value: CacheValue::Timestamps(values),
                expires_at,
            }) if *expires_at > now => Some(values.clone()),
            _ => None,
        })
    }

    async fn set_rate_limit_data(
        &self,
        key: &str,
        values: Vec<u64>,
        ttl: Duration,
    ) -> GuardResult<()> {
        let now = self.clock.now_ms();
        let entry = CacheEntry {
            value: CacheValue::Timestamps(values),
            expires_at: self.expiry(now, ttl),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }
}
