//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The identity of a cached entry is its method plus canonical URL. In
/// practice only GET responses are ever stored, but the method
/// participates in the key so a store can never alias across methods.
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = request_key("GET", "https://example.com/api/items");
        let key2 = request_key("GET", "https://example.com/api/items");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let upper = request_key("GET", "https://example.com/api/items");
        let lower = request_key("get", "https://example.com/api/items");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_key_different_urls() {
        let a = request_key("GET", "https://example.com/api/items?page=1");
        let b = request_key("GET", "https://example.com/api/items?page=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_different_methods() {
        let get = request_key("GET", "https://example.com/api/items");
        let post = request_key("POST", "https://example.com/api/items");
        assert_ne!(get, post);
    }

    #[test]
    fn test_key_format() {
        let key = request_key("GET", "https://example.com");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
