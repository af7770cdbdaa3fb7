//! Error types for the integrity guard.

use thiserror::Error;

/// Main error type for the guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// The shared secret is not configured; every request fails closed.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The sender could not prove possession of the shared secret.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// The sender supplied malformed data.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// The client IP exhausted its request budget for the current window.
    #[error("Rate limit exceeded for {ip}")]
    RateLimited { ip: String },

    /// A previously consumed signature was presented again.
    #[error("Replay detected: signature already used")]
    Replay,

    /// The request body exceeded the configured limit.
    #[error("Request body exceeds {max} bytes")]
    PayloadTooLarge { max: usize },

    /// The request body could not be read.
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// The cache collaborator failed.
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Settings could not be loaded or failed validation.
    #[error("Settings error: {message}")]
    Settings { message: String },

    /// HTTP server errors.
    #[error("Server error: {message}")]
    Server { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authentication error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Invalid or missing token")]
    InvalidToken,

    #[error("Missing timestamp or signature")]
    MissingTimestampOrSignature,

    #[error("Request timestamp outside allowed window (skew {skew_ms}ms)")]
    TimestampOutsideWindow { skew_ms: u64 },

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Validation error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("Invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },
}

impl GuardError {
    /// Stable error code reported to clients and written to the audit log.
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::Config { .. } => "CONFIG_ERROR",
            GuardError::Auth { .. } => "AUTH_ERROR",
            GuardError::Validation { .. } => "VALIDATION_ERROR",
            GuardError::RateLimited { .. } => "RATE_LIMITED",
            GuardError::Replay => "REPLAY_DETECTED",
            GuardError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            GuardError::BadRequest { .. } => "BAD_REQUEST",
            GuardError::Cache { .. }
            | GuardError::Settings { .. }
            | GuardError::Server { .. }
            | GuardError::Io(_)
            | GuardError::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status matching the error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardError::Config { .. } | GuardError::Auth { .. } => 401,
            GuardError::Validation { .. } | GuardError::BadRequest { .. } => 400,
            GuardError::RateLimited { .. } => 429,
            GuardError::Replay => 403,
            GuardError::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }

    /// Short message safe to hand back to the client.
    ///
    /// Never includes the secret, cache state or internal error text.
    pub fn public_message(&self) -> String {
        match self {
            GuardError::Config { .. } => "Anti-spam protection not configured".to_string(),
            GuardError::Auth { kind } => match kind {
                AuthErrorKind::TimestampOutsideWindow { .. } => {
                    "Request timestamp outside allowed window".to_string()
                }
                other => other.to_string(),
            },
            GuardError::Validation { .. } => "Invalid timestamp".to_string(),
            GuardError::RateLimited { .. } => "Rate limit exceeded".to_string(),
            GuardError::Replay => "Replay detected".to_string(),
            GuardError::PayloadTooLarge { .. } => "Request body too large".to_string(),
            GuardError::BadRequest { .. } => "Failed to read request body".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    pub(crate) fn auth(kind: AuthErrorKind) -> Self {
        GuardError::Auth { kind }
    }
}

/// Result type alias for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
