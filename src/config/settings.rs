//! Configuration settings for the integrity guard.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::GuardError;

/// Environment variable holding the shared secret.
pub const ENV_TOKEN: &str = "ANTI_SPAM_TOKEN";
/// Environment variable for the allowed clock skew in milliseconds.
pub const ENV_WINDOW_MS: &str = "ANTI_SPAM_WINDOW_MS";
/// Environment variable for the replay record lifetime in milliseconds.
pub const ENV_REPLAY_TTL_MS: &str = "ANTI_SPAM_REPLAY_TTL_MS";
/// Environment variable for the rate-limit window in milliseconds.
pub const ENV_RATE_WINDOW_MS: &str = "ANTI_SPAM_RATE_WINDOW_MS";
/// Environment variable for the max admitted requests per IP per window.
pub const ENV_RATE_MAX: &str = "ANTI_SPAM_RATE_MAX";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:8080".
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Guard configuration.
#[derive(Clone, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret. `None` makes every request fail closed.
    #[serde(default)]
    pub token: Option<String>,
    /// Max allowed `|now - timestamp|` in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// How long a consumed signature is remembered, in milliseconds.
    #[serde(default = "default_replay_ttl_ms")]
    pub replay_ttl_ms: u64,
    /// Rate-limit sliding window in milliseconds.
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,
    /// Max admitted requests per IP per window.
    #[serde(default = "default_rate_max")]
    pub rate_max: usize,
    /// Interval of the background cache sweep in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

// Default value functions
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_size() -> usize {
    1_048_576 // 1MB
}

fn default_request_timeout() -> u64 {
    30
}

fn default_window_ms() -> u64 {
    300_000
}

fn default_replay_ttl_ms() -> u64 {
    600_000
}

fn default_rate_window_ms() -> u64 {
    900_000
}

fn default_rate_max() -> usize {
    10
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/integrity-guard/audit.log")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_size: default_max_body_size(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token: None,
            window_ms: default_window_ms(),
            replay_ttl_ms: default_replay_ttl_ms(),
            rate_window_ms: default_rate_window_ms(),
            rate_max: default_rate_max(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
        }
    }
}

// Keeps the secret out of debug output.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("window_ms", &self.window_ms)
            .field("replay_ttl_ms", &self.replay_ttl_ms)
            .field("rate_window_ms", &self.rate_window_ms)
            .field("rate_max", &self.rate_max)
            .field("cleanup_interval_seconds", &self.cleanup_interval_seconds)
            .finish()
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply `ANTI_SPAM_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, GuardError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_env_overrides(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML file without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path).map_err(|e| GuardError::Settings {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| GuardError::Settings {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })
    }

    /// Override `[security]` values from environment-style lookups.
    ///
    /// An empty `ANTI_SPAM_TOKEN` counts as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), GuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_TOKEN) {
            let token = token.trim();
            if !token.is_empty() {
                self.security.token = Some(token.to_string());
            }
        }
        if let Some(value) = lookup(ENV_WINDOW_MS) {
            self.security.window_ms = parse_env(ENV_WINDOW_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_REPLAY_TTL_MS) {
            self.security.replay_ttl_ms = parse_env(ENV_REPLAY_TTL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_RATE_WINDOW_MS) {
            self.security.rate_window_ms = parse_env(ENV_RATE_WINDOW_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_RATE_MAX) {
            self.security.rate_max = parse_env(ENV_RATE_MAX, &value)?;
        }
        Ok(())
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), GuardError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            return Err(GuardError::Settings {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        let format = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format.as_str()) {
            return Err(GuardError::Settings {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        let sec = &self.security;
        for (name, value) in [
            ("window_ms", sec.window_ms),
            ("replay_ttl_ms", sec.replay_ttl_ms),
            ("rate_window_ms", sec.rate_window_ms),
            ("cleanup_interval_seconds", sec.cleanup_interval_seconds),
        ] {
            if value == 0 {
                return Err(GuardError::Settings {
                    message: format!("security.{} must be greater than zero", name),
                });
            }
        }
        if sec.rate_max == 0 {
            return Err(GuardError::Settings {
                message: "security.rate_max must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, GuardError> {
    value.trim().parse().map_err(|_| GuardError::Settings {
        message: format!("Invalid value for {}: '{}'", name, value),
    })
}
