//! Inbound request descriptor.

use std::net::SocketAddr;

use super::Headers;

/// The parts of an inbound request the guard inspects.
///
/// Built once at the ingestion boundary and never persisted. `body` must be
/// the exact bytes received; the signature covers them byte for byte.
#[derive(Debug, Clone)]
pub struct GuardedRequest {
    method: String,
    path: String,
    body: Vec<u8>,
    headers: Headers,
    remote_addr: Option<SocketAddr>,
    ip: Option<String>,
}

impl GuardedRequest {
    /// Create a descriptor. `path` includes the query string as received.
    pub fn new(
        method: impl AsRef<str>,
        path: impl Into<String>,
        body: impl Into<Vec<u8>>,
        headers: Headers,
    ) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            body: body.into(),
            headers,
            remote_addr: None,
            ip: None,
        }
    }

    /// Attach the socket peer address.
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    /// Attach an IP already resolved by the host (e.g. a trusted proxy layer).
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Uppercase HTTP verb.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }
}
