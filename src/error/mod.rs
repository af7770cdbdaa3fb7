//! Error types for the integrity guard.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
