//! Request-key helpers.
//!
//! Keys have the shape `scheme/host.port/path`. Rule trees may leave the port
//! out (`http/example.com/`); such keys are completed with the scheme default
//! before they are compiled.

use crate::core::{authority_url, default_port};

/// Whether a key or path uses regex syntax and so cannot be reversed.
pub fn is_regex(value: &str) -> bool {
    value.contains(['\\', '*', '+', '?', '[', ']', '(', ')', '{', '}', '|', '^', '$'])
}

/// Split a key into `(scheme, host segment, rest)`; `rest` keeps its `/`.
fn split_key(key: &str) -> Option<(&str, &str, &str)> {
    let (scheme, tail) = key.split_once('/')?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let (host, rest) = match tail.find('/') {
        Some(idx) => tail.split_at(idx),
        None => (tail, ""),
    };
    (!host.is_empty()).then_some((scheme, host, rest))
}

/// `host.8080` -> `Some(("host", 8080))`
fn split_port(host: &str) -> Option<(&str, u16)> {
    let (name, port) = host.rsplit_once('.')?;
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((name, port.parse().ok()?))
}

/// Give an http(s) key without a port the scheme default.
///
/// ```
/// use waymark::mapping::fix_key_port;
/// assert_eq!(fix_key_port("http/example.com/"), "http/example.com.80/");
/// assert_eq!(fix_key_port("https/example.com.8443/x"), "https/example.com.8443/x");
/// ```
pub fn fix_key_port(key: &str) -> String {
    let Some((scheme, host, rest)) = split_key(key) else {
        return key.to_string();
    };
    let is_web = scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https");
    if !is_web || is_regex(host) || split_port(host).is_some() {
        return key.to_string();
    }
    format!("{scheme}/{host}.{}{rest}", default_port(scheme))
}

/// Turn a literal key into the URL it stands for.
///
/// ```
/// use waymark::mapping::key_to_url;
/// assert_eq!(key_to_url("http/example.com.80/news").as_deref(), Some("http://example.com/news"));
/// assert_eq!(key_to_url("https/example.com.8443/").as_deref(), Some("https://example.com:8443/"));
/// assert_eq!(key_to_url("/content/page"), None);
/// ```
pub fn key_to_url(key: &str) -> Option<String> {
    if is_regex(key) {
        return None;
    }
    let (scheme, host, rest) = split_key(key)?;
    let (name, port) = split_port(host).unwrap_or((host, default_port(scheme)));
    Some(authority_url(scheme, name, port, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_regex() {
        assert!(is_regex("http/[^/]+/"));
        assert!(is_regex("(playground|designground)"));
        assert!(!is_regex("http/virtual.host.com.80/"));
        assert!(!is_regex("/content/page.html"));
    }

    #[test]
    fn test_fix_key_port() {
        assert_eq!(fix_key_port("https/example.com/"), "https/example.com.443/");
        assert_eq!(fix_key_port("http/localhost"), "http/localhost.80");
        assert_eq!(fix_key_port("http/[^/]+/"), "http/[^/]+/");
        assert_eq!(fix_key_port("ftp/files/"), "ftp/files/");
        assert_eq!(fix_key_port("/content/"), "/content/");
    }

    #[test]
    fn test_key_to_url() {
        assert_eq!(
            key_to_url("http/virtual.host.com.80/").as_deref(),
            Some("http://virtual.host.com/")
        );
        assert_eq!(
            key_to_url("http/localhost.8080/playground").as_deref(),
            Some("http://localhost:8080/playground")
        );
        assert_eq!(
            key_to_url("https/example.com/").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(key_to_url("http/[^/]+/"), None);
    }
}
