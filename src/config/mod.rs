//! Configuration module for the integrity guard.
//!
//! Settings come from an optional TOML file, overridden by `ANTI_SPAM_*`
//! environment variables.

mod settings;

pub use settings::*;
