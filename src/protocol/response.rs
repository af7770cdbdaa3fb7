//! Response bodies returned by the gateway.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::GuardError;

/// A response from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request was admitted.
    pub success: bool,

    /// Unique identifier for this request/response pair.
    pub request_id: Uuid,

    /// Response data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error details on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "AUTH_ERROR", "REPLAY_DETECTED").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

impl Response {
    /// Create a success response with a specific request ID.
    pub fn success_with_id(request_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            success: true,
            request_id,
            data: Some(data),
            error: None,
        }
    }

    /// Create a rejection response for a guard error.
    ///
    /// The client only sees the error code and a sanitized message; the full
    /// error is logged server-side.
    pub fn rejected(request_id: Uuid, error: &GuardError) -> Self {
        debug!(
            request_id = %request_id,
            code = error.code(),
            error = %error,
            "Error response (sanitized for client)"
        );

        Self {
            success: false,
            request_id,
            data: None,
            error: Some(ErrorResponse {
                code: error.code().to_string(),
                message: error.public_message(),
            }),
        }
    }
}
