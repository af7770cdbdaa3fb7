//! Client IP resolution.

use crate::protocol::{GuardedRequest, CLIENT_IP_HEADER, FORWARDED_FOR_HEADER, REAL_IP_HEADER};

/// Fallback used when no source yields an address.
pub const UNKNOWN_IP: &str = "unknown";

/// Resolve the client IP used as the rate-limit key.
///
/// Priority: first `X-Forwarded-For` entry, `X-Real-IP`, `X-Client-IP`,
/// socket peer address, host-resolved IP, then [`UNKNOWN_IP`]. Blank values
/// fall through to the next source.
pub fn resolve_client_ip(request: &GuardedRequest) -> String {
    let headers = request.headers();

    if let Some(first) = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    for name in [REAL_IP_HEADER, CLIENT_IP_HEADER] {
        if let Some(ip) = headers.get_non_empty(name) {
            return ip.trim().to_string();
        }
    }

    if let Some(addr) = request.remote_addr() {
        return addr.ip().to_string();
    }

    request
        .ip()
        .filter(|ip| !ip.trim().is_empty())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
