//! URL and path string helpers.
//!
//! - Internal representation: always decoded (human-readable)
//! - Mapping boundary: encode on output

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in the path part of a mapped URL.
///
/// `%` is left alone so an already escaped path is not escaped twice.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'[')
    .add(b']');

/// Split a path into the path proper and its `#fragment` or `?query` tail.
///
/// The first `#` wins; only without one is the first `?` used. The tail keeps
/// its leading mark so it can be appended back verbatim.
///
/// # Examples
/// ```
/// use waymark::core::split_suffix;
/// assert_eq!(split_suffix("/a.html#sec:1?x=1"), ("/a.html", "#sec:1?x=1"));
/// assert_eq!(split_suffix("/a.html?a:b=1"), ("/a.html", "?a:b=1"));
/// assert_eq!(split_suffix("/a.html"), ("/a.html", ""));
/// ```
#[inline]
pub fn split_suffix(path: &str) -> (&str, &str) {
    let mark = path.find('#').or_else(|| path.find('?'));
    match mark {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    }
}

/// Whether the string carries a scheme separator.
#[inline]
pub fn is_url(value: &str) -> bool {
    value.contains("://")
}

/// Percent-encode a decoded path for use in a URL.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Collapse `.` and `..` segments and repeated slashes.
///
/// Returns `None` when `..` would climb above the first segment.
pub fn normalize_path(path: &str) -> Option<String> {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    Some(if absolute { format!("/{joined}") } else { joined })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_suffix_prefers_fragment() {
        assert_eq!(split_suffix("/x?q=1#frag"), ("/x?q=1", "#frag"));
        assert_eq!(split_suffix("#only"), ("", "#only"));
    }

    #[test]
    fn test_encode_path_escapes_space() {
        assert_eq!(
            encode_path("/sample with spaces/page.html"),
            "/sample%20with%20spaces/page.html"
        );
        assert_eq!(encode_path("/_jcr_content:x"), "/_jcr_content:x");
        assert_eq!(encode_path("/already%20done"), "/already%20done");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/./b/../c"), Some("/a/c".to_string()));
        assert_eq!(normalize_path("/a//b/"), Some("/a/b".to_string()));
        assert_eq!(normalize_path("/"), Some("/".to_string()));
        assert_eq!(normalize_path("a/../b"), Some("b".to_string()));
        assert_eq!(normalize_path("/.."), None);
        assert_eq!(normalize_path("/a/../../b"), None);
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://host/path"));
        assert!(!is_url("/content/path"));
        assert!(!is_url("ws:/content"));
    }
}
