//! Integrity Guard Library
//!
//! Admits or rejects inbound HTTP requests before they reach business logic:
//! shared-secret token, bounded timestamp window, HMAC-SHA256 signature over
//! the request, replay detection and per-IP sliding-window rate limiting.

pub mod audit;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod protocol;
