//! Alias lookups.

use crate::config::ResolverConfig;
use crate::debug;
use crate::store::{ContentStore, StoreError};

/// Finds children by their stored name or by one of their aliases.
///
/// A node's aliases come from the alias property on the node itself, or,
/// when it has none, from the same property on its content child.
#[derive(Debug, Clone)]
pub struct AliasResolver {
    property: String,
    content_child: String,
}

impl AliasResolver {
    pub fn new(property: impl Into<String>, content_child: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            content_child: content_child.into(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(&config.alias_property, &config.content_child)
    }

    /// Non-empty alias values of `node`.
    pub fn aliases(&self, store: &dyn ContentStore, node: &str) -> Result<Vec<String>, StoreError> {
        let own = self.read(store, node)?;
        if !own.is_empty() {
            return Ok(own);
        }
        match store.child_by_name(node, &self.content_child)? {
            Some(content) => self.read(store, &content),
            None => Ok(Vec::new()),
        }
    }

    fn read(&self, store: &dyn ContentStore, node: &str) -> Result<Vec<String>, StoreError> {
        Ok(store
            .property(node, &self.property)?
            .map(|value| value.as_strings())
            .unwrap_or_default()
            .into_iter()
            .filter(|alias| !alias.is_empty())
            .collect())
    }

    /// Alias used when building URLs.
    pub fn first_alias(
        &self,
        store: &dyn ContentStore,
        node: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.aliases(store, node)?.into_iter().next())
    }

    /// Child of `parent` called `name`, or else the first child aliased
    /// `name`. A direct child always wins.
    pub fn child_by_name_or_alias(
        &self,
        store: &dyn ContentStore,
        parent: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        if let Some(child) = store.child_by_name(parent, name)? {
            return Ok(Some(child));
        }

        for child in store.children_of(parent)? {
            if self.aliases(store, &child)?.iter().any(|alias| alias == name) {
                debug!("resolve"; "found {} by alias `{}`", child, name);
                return Ok(Some(child));
            }
        }
        debug!("resolve"; "{} has no child `{}`", parent, name);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        let store = MemoryStore::new("default");
        store.add_node("/content/child", "nt:unstructured");
        store
            .set_property("/content/child", "waymark:alias", ["kind", "enfant"])
            .unwrap();
        store.add_node("/content/kind", "nt:unstructured");
        store.add_node("/content/page/jcr:content", "nt:unstructured");
        store
            .set_property("/content/page/jcr:content", "waymark:alias", "seite")
            .unwrap();
        store
    }

    fn resolver() -> AliasResolver {
        AliasResolver::from_config(&ResolverConfig::default())
    }

    #[test]
    fn test_direct_child_beats_alias() {
        let store = store();
        let found = resolver()
            .child_by_name_or_alias(&store, "/content", "kind")
            .unwrap();
        assert_eq!(found.as_deref(), Some("/content/kind"));
    }

    #[test]
    fn test_alias_lookup() {
        let store = store();
        let found = resolver()
            .child_by_name_or_alias(&store, "/content", "enfant")
            .unwrap();
        assert_eq!(found.as_deref(), Some("/content/child"));
        assert!(
            resolver()
                .child_by_name_or_alias(&store, "/content", "missing")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_content_child_alias() {
        let store = store();
        let resolver = resolver();
        assert_eq!(
            resolver.first_alias(&store, "/content/page").unwrap().as_deref(),
            Some("seite")
        );
        assert_eq!(
            resolver
                .child_by_name_or_alias(&store, "/content", "seite")
                .unwrap()
                .as_deref(),
            Some("/content/page")
        );
    }

    #[test]
    fn test_first_alias_of_multi_value() {
        let store = store();
        assert_eq!(
            resolver()
                .first_alias(&store, "/content/child")
                .unwrap()
                .as_deref(),
            Some("kind")
        );
        assert_eq!(resolver().first_alias(&store, "/content/kind").unwrap(), None);
    }
}
