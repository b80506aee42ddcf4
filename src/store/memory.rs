//! In-memory content tree.
//!
//! Nodes are kept in a flat path-keyed map; each node remembers the order of
//! its children. A tree can be built programmatically or loaded from a JSON
//! snapshot:
//!
//! ```json
//! {
//!   "namespaces": { "app": "https://example.com/app" },
//!   "root": {
//!     "children": {
//!       "content": {
//!         "type": "page",
//!         "properties": { "waymark:alias": ["home"] },
//!         "children": {}
//!       }
//!     }
//!   }
//! }
//! ```

use super::{ContentStore, PropertyValue, StoreError, join_path, parent_path, query};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Node type given to the root and to implicitly created parents.
const ROOT_TYPE: &str = "rep:root";
const DEFAULT_TYPE: &str = "nt:unstructured";

/// Prefixes every store knows about.
const BUILTIN_NAMESPACES: &[(&str, &str)] = &[
    ("jcr", "http://www.jcp.org/jcr/1.0"),
    ("nt", "http://www.jcp.org/jcr/nt/1.0"),
    ("mix", "http://www.jcp.org/jcr/mix/1.0"),
    ("rep", "internal"),
    ("waymark", "https://waymark.dev/ns/1.0"),
];

// ============================================================================
// Snapshot format
// ============================================================================

/// Serialized form of a whole workspace.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub namespaces: BTreeMap<String, String>,
    pub root: NodeSnapshot,
}

/// Serialized form of one node and its subtree.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeSnapshot {
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Kept as a raw JSON map so child order survives (`preserve_order`).
    pub children: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Clone)]
struct Node {
    node_type: String,
    properties: BTreeMap<String, PropertyValue>,
    children: Vec<String>,
}

impl Node {
    fn new(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: FxHashMap<String, Node>,
    namespaces: FxHashMap<String, String>,
}

/// One workspace held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    workspace: String,
    tree: RwLock<Tree>,
}

impl MemoryStore {
    /// Create an empty workspace containing only the root node.
    pub fn new(workspace: impl Into<String>) -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert("/".to_string(), Node::new(ROOT_TYPE));
        let namespaces = BUILTIN_NAMESPACES
            .iter()
            .map(|(prefix, uri)| ((*prefix).to_string(), (*uri).to_string()))
            .collect();

        Self {
            workspace: workspace.into(),
            tree: RwLock::new(Tree { nodes, namespaces }),
        }
    }

    /// Load a workspace from a JSON snapshot file.
    pub fn load(workspace: impl Into<String>, path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| StoreError::Io(path.to_path_buf(), err))?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Self::from_snapshot(workspace, snapshot)
    }

    /// Build a workspace from a parsed snapshot.
    pub fn from_snapshot(
        workspace: impl Into<String>,
        snapshot: Snapshot,
    ) -> Result<Self, StoreError> {
        let store = Self::new(workspace);
        for (prefix, uri) in snapshot.namespaces {
            store.register_namespace(&prefix, &uri);
        }
        store.insert_snapshot("/", snapshot.root)?;
        Ok(store)
    }

    fn insert_snapshot(&self, path: &str, node: NodeSnapshot) -> Result<(), StoreError> {
        if path != "/" {
            self.add_node(path, node.node_type.as_deref().unwrap_or(DEFAULT_TYPE));
        } else if let Some(node_type) = &node.node_type
            && let Some(root) = self.tree.write().nodes.get_mut("/")
        {
            root.node_type = node_type.clone();
        }

        for (name, value) in node.properties {
            self.set_property(path, &name, value)?;
        }
        for (name, child) in node.children {
            let child: NodeSnapshot = serde_json::from_value(child)?;
            self.insert_snapshot(&join_path(path, &name), child)?;
        }
        Ok(())
    }

    /// Create a node (and any missing parents). An existing node only has
    /// its type replaced.
    pub fn add_node(&self, path: &str, node_type: &str) {
        let mut tree = self.tree.write();
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return;
        }

        let mut current = String::from("/");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, segment) in segments.iter().enumerate() {
            let child = join_path(&current, segment);
            let is_last = i + 1 == segments.len();
            if let Some(existing) = tree.nodes.get_mut(&child) {
                if is_last {
                    existing.node_type = node_type.to_string();
                }
            } else {
                let ty = if is_last { node_type } else { DEFAULT_TYPE };
                tree.nodes.insert(child.clone(), Node::new(ty));
                if let Some(parent) = tree.nodes.get_mut(&current) {
                    parent.children.push((*segment).to_string());
                }
            }
            current = child;
        }
    }

    /// Set a property on an existing node.
    pub fn set_property(
        &self,
        path: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), StoreError> {
        let mut tree = self.tree.write();
        let node = tree
            .nodes
            .get_mut(path)
            .ok_or_else(|| StoreError::PathNotFound(path.to_string()))?;
        node.properties.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&self, path: &str) -> Result<(), StoreError> {
        let Some(parent) = parent_path(path) else {
            return Err(StoreError::Unavailable("the root node cannot be removed".into()));
        };
        let mut tree = self.tree.write();
        if !tree.nodes.contains_key(path) {
            return Err(StoreError::PathNotFound(path.to_string()));
        }

        let prefix = format!("{path}/");
        tree.nodes.retain(|p, _| p != path && !p.starts_with(&prefix));
        let name = super::node_name(path).to_string();
        if let Some(parent) = tree.nodes.get_mut(parent) {
            parent.children.retain(|c| *c != name);
        }
        Ok(())
    }

    pub fn register_namespace(&self, prefix: &str, uri: &str) {
        self.tree
            .write()
            .namespaces
            .insert(prefix.to_string(), uri.to_string());
    }

    /// Visit every node path in document order.
    pub(super) fn walk(&self, mut visit: impl FnMut(&str, &NodeView<'_>)) {
        let tree = self.tree.read();
        let mut stack = vec!["/".to_string()];
        while let Some(path) = stack.pop() {
            let Some(node) = tree.nodes.get(&path) else {
                continue;
            };
            visit(
                &path,
                &NodeView {
                    properties: &node.properties,
                },
            );
            for child in node.children.iter().rev() {
                stack.push(join_path(&path, child));
            }
        }
    }
}

/// Borrowed view on a node during [`MemoryStore::walk`].
pub(super) struct NodeView<'a> {
    pub properties: &'a BTreeMap<String, PropertyValue>,
}

impl ContentStore for MemoryStore {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn node_type(&self, path: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .tree
            .read()
            .nodes
            .get(path)
            .map(|node| node.node_type.clone()))
    }

    fn child_by_name(&self, parent: &str, name: &str) -> Result<Option<String>, StoreError> {
        if name.is_empty() || name.contains('/') {
            return Ok(None);
        }
        let tree = self.tree.read();
        let Some(node) = tree.nodes.get(parent) else {
            return Ok(None);
        };
        Ok(node
            .children
            .iter()
            .any(|child| child == name)
            .then(|| join_path(parent, name)))
    }

    fn children_of(&self, parent: &str) -> Result<Vec<String>, StoreError> {
        let tree = self.tree.read();
        Ok(tree
            .nodes
            .get(parent)
            .map(|node| {
                node.children
                    .iter()
                    .map(|child| join_path(parent, child))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn property(&self, path: &str, name: &str) -> Result<Option<PropertyValue>, StoreError> {
        Ok(self
            .tree
            .read()
            .nodes
            .get(path)
            .and_then(|node| node.properties.get(name).cloned()))
    }

    fn namespace_uri(&self, prefix: &str) -> Result<String, StoreError> {
        self.tree
            .read()
            .namespaces
            .get(prefix)
            .cloned()
            .ok_or_else(|| StoreError::NamespaceNotFound(prefix.to_string()))
    }

    fn query(&self, statement: &str, language: &str) -> Result<Vec<String>, StoreError> {
        let matcher = query::compile(statement, language)?;
        let mut hits = Vec::new();
        self.walk(|path, node| {
            if matcher.matches(path, node) {
                hits.push(path.to_string());
            }
        });
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        let json = r#"{
            "namespaces": { "app": "https://example.com/app" },
            "root": {
                "children": {
                    "content": {
                        "type": "page",
                        "children": {
                            "b": { "properties": { "waymark:alias": ["bee"] } },
                            "a": {}
                        }
                    }
                }
            }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        MemoryStore::from_snapshot("default", snapshot).unwrap()
    }

    #[test]
    fn test_snapshot_keeps_child_order() {
        let store = sample();
        assert_eq!(
            store.children_of("/content").unwrap(),
            vec!["/content/b", "/content/a"]
        );
        assert_eq!(
            store.node_type("/content").unwrap().as_deref(),
            Some("page")
        );
        assert_eq!(
            store.node_type("/content/a").unwrap().as_deref(),
            Some(DEFAULT_TYPE)
        );
    }

    #[test]
    fn test_snapshot_namespaces_and_properties() {
        let store = sample();
        assert_eq!(
            store.namespace_uri("app").unwrap(),
            "https://example.com/app"
        );
        assert!(store.namespace_uri("jcr").is_ok());
        assert!(matches!(
            store.namespace_uri("nope"),
            Err(StoreError::NamespaceNotFound(_))
        ));
        assert_eq!(
            store.property("/content/b", "waymark:alias").unwrap(),
            Some(PropertyValue::from(["bee"]))
        );
    }

    #[test]
    fn test_add_node_creates_parents() {
        let store = MemoryStore::new("default");
        store.add_node("/apps/site/page", "component");

        assert!(store.exists("/apps").unwrap());
        assert!(store.exists("/apps/site").unwrap());
        assert_eq!(
            store.child_by_name("/apps/site", "page").unwrap().as_deref(),
            Some("/apps/site/page")
        );
        assert_eq!(store.child_by_name("/apps/site", "other").unwrap(), None);
    }

    #[test]
    fn test_set_property_on_missing_node() {
        let store = MemoryStore::new("default");
        assert!(matches!(
            store.set_property("/missing", "x", "y"),
            Err(StoreError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_remove_node_drops_subtree() {
        let store = sample();
        store.remove_node("/content/b").unwrap();

        assert!(!store.exists("/content/b").unwrap());
        assert_eq!(store.children_of("/content").unwrap(), vec!["/content/a"]);
        assert!(store.remove_node("/").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("content.json");
        std::fs::write(&file, r#"{"root":{"children":{"x":{}}}}"#).unwrap();

        let store = MemoryStore::load("ws", &file).unwrap();
        assert_eq!(store.workspace(), "ws");
        assert!(store.exists("/x").unwrap());

        let missing = MemoryStore::load("ws", &dir.path().join("nope.json"));
        assert!(matches!(missing, Err(StoreError::Io(..))));
    }
}
