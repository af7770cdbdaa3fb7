//! Case-insensitive header access.

use std::collections::HashMap;

/// Shared-secret token header.
pub const TOKEN_HEADER: &str = "x-anti-spam-token";
/// Sender timestamp header (epoch milliseconds).
pub const TIMESTAMP_HEADER: &str = "x-anti-spam-timestamp";
/// Hex-encoded HMAC-SHA256 header.
pub const SIGNATURE_HEADER: &str = "x-anti-spam-signature";
/// Proxy chain header; the first entry is the originating client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const CLIENT_IP_HEADER: &str = "x-client-ip";

/// Request headers keyed by lower-cased name.
///
/// Every lookup in the guard goes through [`Headers::get`], so callers never
/// need to try several spellings of a header name. Repeated headers are
/// joined with `", "` in arrival order, as HTTP list headers are.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let value = value.into();
        self.entries
            .entry(name.as_ref().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// Builder form of [`insert`](Headers::insert).
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Look up a header, treating an empty or blank value as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
