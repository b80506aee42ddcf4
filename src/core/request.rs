//! Request context and the host keys derived from it.
//!
//! Rewrite rules are matched against a *request key* that folds scheme,
//! host and port into a path-like string:
//!
//! ```text
//! https://example.com/news  ->  https/example.com.443/news
//! http://localhost:8080/    ->  http/localhost.8080/
//! ```

/// Scheme, host, port and context path of the request being served.
///
/// Without a request, keys are built as if `http://localhost/` was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    /// `None` means the scheme default.
    pub port: Option<u16>,
    /// Prefix prepended to every mapped path (e.g. `/context`).
    pub context_path: String,
    /// Workspace hint carried by the request.
    pub workspace: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("http", "localhost")
    }
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            context_path: String::new(),
            workspace: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Port actually in use, falling back to the scheme default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| default_port(&self.scheme))
    }

    /// Rewrite key for `path` under this request.
    pub fn key(&self, path: &str) -> String {
        format!(
            "{}/{}.{}{}",
            self.scheme,
            self.host,
            self.effective_port(),
            path
        )
    }

    /// `scheme://host[:port]/` of this request.
    pub fn base_url(&self) -> String {
        authority_url(&self.scheme, &self.host, self.effective_port(), "/")
    }

    /// `scheme://`
    pub fn scheme_prefix(&self) -> String {
        format!("{}://", self.scheme)
    }
}

/// Default port of a scheme: 443 for https, 80 for anything else.
pub fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

/// Rewrite key for an optional request.
pub fn request_key(request: Option<&RequestContext>, path: &str) -> String {
    match request {
        Some(request) => request.key(path),
        None => format!("http/localhost.80{path}"),
    }
}

/// Build `scheme://host[:port]path`, omitting the port when it is the
/// scheme's well-known one.
pub fn authority_url(scheme: &str, host: &str, port: u16, path: &str) -> String {
    let is_default = (scheme.eq_ignore_ascii_case("http") && port == 80)
        || (scheme.eq_ignore_ascii_case("https") && port == 443);
    if is_default {
        format!("{scheme}://{host}{path}")
    } else {
        format!("{scheme}://{host}:{port}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_defaults() {
        assert_eq!(request_key(None, "/a/b"), "http/localhost.80/a/b");

        let https = RequestContext::new("https", "example.com");
        assert_eq!(request_key(Some(&https), "/news"), "https/example.com.443/news");
    }

    #[test]
    fn test_request_key_explicit_port() {
        let request = RequestContext::new("http", "virtual.host.com").with_port(8080);
        assert_eq!(request.key("/"), "http/virtual.host.com.8080/");
    }

    #[test]
    fn test_base_url_omits_default_port() {
        assert_eq!(
            RequestContext::new("http", "localhost").base_url(),
            "http://localhost/"
        );
        assert_eq!(
            RequestContext::new("https", "example.com").with_port(443).base_url(),
            "https://example.com/"
        );
        assert_eq!(
            RequestContext::new("https", "example.com").with_port(80).base_url(),
            "https://example.com:80/"
        );
    }

    #[test]
    fn test_authority_url_other_scheme_keeps_port() {
        assert_eq!(authority_url("ftp", "files", 80, "/x"), "ftp://files:80/x");
    }
}
