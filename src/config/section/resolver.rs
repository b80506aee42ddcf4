//! `[resolver]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [resolver]
//! search_path = ["/apps", "/libs"]   # Tried in order for relative paths
//! mangle_namespaces = true           # /jcr:content <-> /_jcr_content
//! multi_workspaces = false           # Accept `workspace:/path` inputs
//! alias_property = "waymark:alias"
//! content_child = "jcr:content"
//! ```

use crate::config::ConfigDiagnostics;
use macros::Config;
use serde::{Deserialize, Serialize};

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Config)]
#[serde(default)]
#[config(section = "resolver")]
pub struct ResolverConfig {
    /// Prefixes tried in order when a path is relative.
    #[config(default = "[\"/\"]")]
    pub search_path: Vec<String>,

    /// Hide `prefix:` segments in mapped URLs as `_prefix_`.
    #[config(default = "true", inline_doc)]
    pub mangle_namespaces: bool,

    /// Accept `workspace:/path` to address other workspaces.
    #[config(inline_doc)]
    pub multi_workspaces: bool,

    /// Property holding the alternative names of a node.
    #[config(default = "waymark:alias")]
    pub alias_property: String,

    /// Child node whose alias is used when the node itself has none.
    #[config(default = "jcr:content")]
    pub content_child: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_path: vec!["/".to_string()],
            mangle_namespaces: true,
            multi_workspaces: false,
            alias_property: "waymark:alias".to_string(),
            content_child: "jcr:content".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Search path with every entry starting and ending in `/`.
    ///
    /// Blank entries are dropped; an empty result falls back to `["/"]`.
    pub fn normalized_search_path(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .search_path
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut path = String::with_capacity(p.len() + 2);
                if !p.starts_with('/') {
                    path.push('/');
                }
                path.push_str(p);
                if !path.ends_with('/') {
                    path.push('/');
                }
                path
            })
            .collect();

        if paths.is_empty() {
            paths.push("/".to_string());
        }
        paths
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.search_path.iter().any(|p| p.trim().is_empty()) {
            diag.error_with_hint(
                Self::FIELDS.search_path,
                "search path entries must not be blank",
                "remove the empty entry",
            );
        }
        if self.alias_property.trim().is_empty() {
            diag.error(Self::FIELDS.alias_property, "alias property name is empty");
        }
        if self.content_child.contains('/') {
            diag.error(
                Self::FIELDS.content_child,
                "content child must be a single node name",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_resolver_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.resolver.search_path, vec!["/"]);
        assert!(config.resolver.mangle_namespaces);
        assert!(!config.resolver.multi_workspaces);
        assert_eq!(config.resolver.alias_property, "waymark:alias");
    }

    #[test]
    fn test_resolver_config_override() {
        let config = test_parse_config(
            "[resolver]\nsearch_path = [\"/apps\", \"libs\"]\nmangle_namespaces = false",
        );
        assert_eq!(config.resolver.search_path, vec!["/apps", "libs"]);
        assert!(!config.resolver.mangle_namespaces);
    }

    #[test]
    fn test_normalized_search_path() {
        let config = ResolverConfig {
            search_path: vec!["/apps".into(), "libs/".into(), "  ".into()],
            ..Default::default()
        };
        assert_eq!(config.normalized_search_path(), vec!["/apps/", "/libs/"]);

        let empty = ResolverConfig {
            search_path: vec![],
            ..Default::default()
        };
        assert_eq!(empty.normalized_search_path(), vec!["/"]);
    }

    #[test]
    fn test_validate_blank_entry() {
        let config = ResolverConfig {
            search_path: vec!["/apps".into(), String::new()],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "resolver.search_path");
    }
}
