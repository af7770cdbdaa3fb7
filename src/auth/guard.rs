//! Request admission gate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

use crate::cache::ReplayCache;
use crate::clock::{Clock, SystemClock};
use crate::config::SecurityConfig;
use crate::error::{AuthErrorKind, GuardError, GuardResult, ValidationErrorKind};
use crate::protocol::{GuardedRequest, SIGNATURE_HEADER, TIMESTAMP_HEADER, TOKEN_HEADER};

use super::client_ip::resolve_client_ip;
use super::signature::{constant_time_eq, RequestSigner};
use super::RateLimiter;

/// Namespace for consumed signatures in the cache.
pub const REPLAY_KEY_PREFIX: &str = "anti-spam:";

const IP_LOCK_STRIPES: usize = 64;

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// IP the request was counted against.
    pub client_ip: String,
    /// Absolute difference between sender and receiver clocks.
    pub skew_ms: u64,
}

struct SharedSecret {
    token: String,
    signer: RequestSigner,
}

/// Striped per-IP locks.
///
/// Serializes the rate-limit read-modify-write for one IP so concurrent
/// requests cannot overshoot the budget. Unrelated IPs only contend when
/// they hash to the same stripe.
struct IpLocks {
    stripes: Vec<Mutex<()>>,
}

impl IpLocks {
    fn new(count: usize) -> Self {
        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    async fn lock(&self, ip: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        ip.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[index].lock().await
    }
}

/// Admits or rejects inbound requests.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. shared secret configured
/// 2. token matches
/// 3. timestamp and signature present
/// 4. timestamp is a finite number
/// 5. timestamp within the clock-skew window
/// 6. client IP under its rate limit
/// 7. signature matches
/// 8. signature not already consumed
///
/// Only admitted requests write to the cache: the replay record and one
/// rate-limit entry. Cache failures propagate and the request is rejected.
pub struct RequestGuard {
    secret: Option<SharedSecret>,
    window_ms: u64,
    replay_ttl: Duration,
    cache: Arc<dyn ReplayCache>,
    rate_limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    ip_locks: IpLocks,
}

impl RequestGuard {
    /// Create a guard reading the system clock.
    pub fn new(config: &SecurityConfig, cache: Arc<dyn ReplayCache>) -> Self {
        Self::with_clock(config, cache, Arc::new(SystemClock))
    }

    /// Create a guard reading the given clock.
    pub fn with_clock(
        config: &SecurityConfig,
        cache: Arc<dyn ReplayCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let secret = config.token.as_ref().map(|token| SharedSecret {
            token: token.clone(),
            signer: RequestSigner::new(token.as_bytes()),
        });
        let rate_limiter = RateLimiter::new(
            Arc::clone(&cache),
            Arc::clone(&clock),
            config.rate_max,
            Duration::from_millis(config.rate_window_ms),
        );

        Self {
            secret,
            window_ms: config.window_ms,
            replay_ttl: Duration::from_millis(config.replay_ttl_ms),
            cache,
            rate_limiter,
            clock,
            ip_locks: IpLocks::new(IP_LOCK_STRIPES),
        }
    }

    /// Whether a shared secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a request, recording it on success.
    pub async fn check(&self, request: &GuardedRequest) -> GuardResult<Admission> {
        let headers = request.headers();
        let token = headers.get(TOKEN_HEADER);
        let timestamp = headers.get_non_empty(TIMESTAMP_HEADER);
        let signature = headers.get_non_empty(SIGNATURE_HEADER);

        let secret = self.secret.as_ref().ok_or_else(|| GuardError::Config {
            message: "Anti-spam protection not configured".to_string(),
        })?;

        match token {
            Some(token) if constant_time_eq(token, &secret.token) => {}
            _ => return Err(GuardError::auth(AuthErrorKind::InvalidToken)),
        }

        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(GuardError::auth(AuthErrorKind::MissingTimestampOrSignature));
        };

        let timestamp_ms = parse_timestamp(timestamp)?;
        let skew = (self.clock.now_ms() as f64 - timestamp_ms).abs();
        if skew > self.window_ms as f64 {
            return Err(GuardError::auth(AuthErrorKind::TimestampOutsideWindow {
                skew_ms: skew as u64,
            }));
        }

        let client_ip = resolve_client_ip(request);
        let _ip_guard = self.ip_locks.lock(&client_ip).await;

        if self.rate_limiter.is_rate_limited(&client_ip).await? {
            return Err(GuardError::RateLimited { ip: client_ip });
        }

        if !secret.signer.verify(
            request.method(),
            request.path(),
            request.body(),
            timestamp,
            signature,
        ) {
            return Err(GuardError::auth(AuthErrorKind::InvalidSignature));
        }

        let key = format!("{}{}", REPLAY_KEY_PREFIX, signature);
        if self.cache.has(&key).await? {
            return Err(GuardError::Replay);
        }
        if !self.cache.add_if_absent(&key, self.replay_ttl).await? {
            trace!(client_ip = %client_ip, "Lost replay insert race");
            return Err(GuardError::Replay);
        }
        self.rate_limiter.record_request(&client_ip).await?;

        Ok(Admission {
            client_ip,
            skew_ms: skew as u64,
        })
    }
}

/// Parse an epoch-millisecond timestamp header.
///
/// Accepts any finite decimal number; the raw string (not the parsed value)
/// is what the signature covers.
fn parse_timestamp(raw: &str) -> GuardResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| GuardError::Validation {
            kind: ValidationErrorKind::InvalidTimestamp {
                value: raw.chars().take(32).collect(),
            },
        })
}
