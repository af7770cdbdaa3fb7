//! Audit entry types.
//!
//! Defines the structure of audit log entries.

use serde::Serialize;
use uuid::Uuid;

/// A single audit log entry.
///
/// Records one guard decision: the request line, the resolved client IP,
/// the outcome and how long the check took.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp of the decision.
    pub timestamp: String,
    /// Unique identifier for the request.
    pub request_id: Uuid,
    /// HTTP method.
    pub method: String,
    /// Path including query string.
    pub path: String,
    /// Client IP the request was attributed to, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Outcome of the check.
    pub result: AuditResult,
    /// Check duration in milliseconds.
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Create an entry for an admitted request.
    pub fn admitted(
        timestamp: String,
        request_id: Uuid,
        method: String,
        path: String,
        client_ip: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp,
            request_id,
            method,
            path,
            client_ip: Some(client_ip),
            result: AuditResult::Admitted,
            duration_ms,
        }
    }

    /// Create an entry for a rejected request.
    pub fn rejected(
        timestamp: String,
        request_id: Uuid,
        method: String,
        path: String,
        client_ip: Option<String>,
        error_code: String,
        error_message: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp,
            request_id,
            method,
            path,
            client_ip,
            result: AuditResult::Rejected {
                error_code,
                error_message,
            },
            duration_ms,
        }
    }
}

/// Result of a guard check for audit purposes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditResult {
    #[serde(rename = "admitted")]
    Admitted,
    #[serde(rename = "rejected")]
    Rejected {
        /// Error code.
        error_code: String,
        /// Error message.
        error_message: String,
    },
}
