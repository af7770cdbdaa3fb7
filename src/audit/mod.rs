//! Audit logging module.
//!
//! Records every guard decision as a JSON line: request line, client IP,
//! outcome and check duration. The shared secret and signature values are
//! never written.

mod entry;
mod logger;

pub use entry::{AuditEntry, AuditResult};
pub use logger::AuditLogger;
