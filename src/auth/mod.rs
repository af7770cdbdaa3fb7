//! Authentication module.
//!
//! Handles shared-secret and HMAC verification, replay detection, client IP
//! resolution and per-IP rate limiting.

mod client_ip;
mod guard;
mod rate_limit;
mod signature;

pub use client_ip::{resolve_client_ip, UNKNOWN_IP};
pub use guard::{Admission, RequestGuard, REPLAY_KEY_PREFIX};
pub use rate_limit::{RateLimiter, RATE_LIMIT_KEY_PREFIX};
pub use signature::{constant_time_eq, signing_message, RequestSigner, FIELD_DELIMITER};
