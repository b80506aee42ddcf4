//! Content store contract.
//!
//! The engine only ever talks to the hierarchical store through
//! [`ContentStore`], and obtains per-workspace stores through a
//! [`Repository`]. `MemoryStore` / `MemoryRepository` are the in-process
//! implementations used by the CLI and by tests.
//!
//! Paths are absolute, `/`-separated, and the root is `/`.

mod memory;
mod query;
mod repository;

pub use memory::{MemoryStore, NodeSnapshot, Snapshot};
pub use repository::{MemoryRepository, Repository};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failures reported by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("namespace prefix `{0}` is not registered")]
    NamespaceNotFound(String),

    #[error("invalid {language} query `{query}`: {message}")]
    QuerySyntax {
        query: String,
        language: String,
        message: String,
    },

    #[error("unsupported query language `{0}`")]
    UnsupportedLanguage(String),

    #[error("no node at `{0}`")]
    PathNotFound(String),

    #[error("content store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("content snapshot parsing error")]
    Json(#[from] serde_json::Error),
}

/// Login failure for a workspace.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no workspace named `{0}`")]
    NoSuchWorkspace(String),

    #[error("access to workspace `{0}` denied")]
    Denied(String),
}

// ============================================================================
// Property values
// ============================================================================

/// A stored property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Long(i64),
    String(String),
    Strings(Vec<String>),
}

impl PropertyValue {
    /// Single string view; multi-valued properties yield their first value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Strings(values) => values.first().map(String::as_str),
            _ => None,
        }
    }

    /// Multi-valued string view.
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            Self::String(s) => vec![s.clone()],
            Self::Strings(values) => values.clone(),
            Self::Bool(b) => vec![b.to_string()],
            Self::Long(n) => vec![n.to_string()],
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::Strings(value)
    }
}

impl<const N: usize> From<[&str; N]> for PropertyValue {
    fn from(value: [&str; N]) -> Self {
        Self::Strings(value.iter().map(|s| (*s).to_string()).collect())
    }
}

// ============================================================================
// Store contract
// ============================================================================

/// Read access to one workspace of the content store.
pub trait ContentStore: Send + Sync {
    /// Workspace this store is bound to.
    fn workspace(&self) -> &str;

    /// Node type at `path`, `None` when no node exists there.
    fn node_type(&self, path: &str) -> Result<Option<String>, StoreError>;

    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.node_type(path)?.is_some())
    }

    /// Path of the direct child `name` of `parent`, if any.
    fn child_by_name(&self, parent: &str, name: &str) -> Result<Option<String>, StoreError>;

    /// Child paths of `parent` in stored order. Empty for a missing parent.
    fn children_of(&self, parent: &str) -> Result<Vec<String>, StoreError>;

    fn property(&self, path: &str, name: &str) -> Result<Option<PropertyValue>, StoreError>;

    /// URI registered for a namespace prefix.
    ///
    /// Fails with [`StoreError::NamespaceNotFound`] for unknown prefixes.
    fn namespace_uri(&self, prefix: &str) -> Result<String, StoreError>;

    /// Run a query and return matching node paths in document order.
    fn query(&self, statement: &str, language: &str) -> Result<Vec<String>, StoreError>;
}

/// Shared handle to a store.
pub type StoreRef = Arc<dyn ContentStore>;

// ============================================================================
// Path helpers
// ============================================================================

/// Join a child name onto a parent path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of an absolute path; `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}

/// Last segment of a path.
pub fn node_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("/", "content"), "/content");
        assert_eq!(join_path("/content", "page"), "/content/page");
        assert_eq!(parent_path("/content/page"), Some("/content"));
        assert_eq!(parent_path("/content"), Some("/"));
        assert_eq!(parent_path("/"), None);
        assert_eq!(node_name("/content/page"), "page");
        assert_eq!(node_name("/"), "");
    }

    #[test]
    fn test_property_views() {
        let multi = PropertyValue::from(["kind", "enfant"]);
        assert_eq!(multi.as_str(), Some("kind"));
        assert_eq!(multi.as_strings(), vec!["kind", "enfant"]);

        assert_eq!(PropertyValue::from("301").as_long(), Some(301));
        assert_eq!(PropertyValue::from("true").as_bool(), Some(true));
        assert_eq!(PropertyValue::from(true).as_str(), None);
    }

    #[test]
    fn test_property_value_untagged_json() {
        let value: PropertyValue = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(value, PropertyValue::Strings(vec!["a".into(), "b".into()]));

        let value: PropertyValue = serde_json::from_str("302").unwrap();
        assert_eq!(value, PropertyValue::Long(302));

        let value: PropertyValue = serde_json::from_str("false").unwrap();
        assert_eq!(value, PropertyValue::Bool(false));
    }
}
