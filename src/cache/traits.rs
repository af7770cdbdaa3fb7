//! Cache collaborator contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GuardResult;

/// TTL-bound key/value store shared by replay detection and rate limiting.
///
/// Guarantees every backend must provide:
///
/// - an entry written with TTL `t` is not observable once `t` has elapsed
///   (expiry may lag slightly, never lead);
/// - operations on distinct keys never interfere;
/// - [`add_if_absent`](ReplayCache::add_if_absent) is atomic: of two
///   concurrent calls for the same absent key exactly one returns `true`.
///
/// Backend failures are returned as errors and never swallowed; the guard
/// fails closed on them. A single-process deployment can use
/// [`MemoryCache`](super::MemoryCache); several guard instances behind a load
/// balancer need a shared backend for the guarantees to hold cluster-wide.
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Whether a live entry exists for `key`.
    async fn has(&self, key: &str) -> GuardResult<bool>;

    /// Insert or refresh a presence marker for `key`.
    async fn add(&self, key: &str, ttl: Duration) -> GuardResult<()>;

    /// Insert a presence marker only if no live entry exists.
    ///
    /// Returns `true` if this call inserted the entry.
    async fn add_if_absent(&self, key: &str, ttl: Duration) -> GuardResult<bool>;

    /// Stored timestamp history for `key`, if any.
    async fn get_rate_limit_data(&self, key: &str) -> GuardResult<Option<Vec<u64>>>;

    /// Replace the timestamp history for `key`.
    async fn set_rate_limit_data(
        &self,
        key: &str,
        values: Vec<u64>,
        ttl: Duration,
    ) -> GuardResult<()>;
}
