//! Captured response types.

use serde::{Deserialize, Serialize};

/// A response captured into a cache store.
///
/// Status, headers and body are stored verbatim at capture time. Entries
/// are immutable once written; a later write for the same request key
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Request method the entry was captured for.
    pub method: String,
    /// Canonical request URL.
    pub url: String,
    /// HTTP status code at capture time.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Capture timestamp, RFC 3339.
    pub stored_at: String,
}

impl CachedResponse {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the captured status was a 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CachedResponse {
        CachedResponse {
            method: "GET".to_string(),
            url: "https://example.com/api/items".to_string(),
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: b"[]".to_vec(),
            stored_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let e = entry();
        assert_eq!(e.header("content-type"), Some("application/json"));
        assert_eq!(e.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(e.header("x-missing"), None);
    }

    #[test]
    fn test_is_success() {
        let mut e = entry();
        assert!(e.is_success());
        e.status = 404;
        assert!(!e.is_success());
        e.status = 299;
        assert!(e.is_success());
        e.status = 300;
        assert!(!e.is_success());
    }
}
