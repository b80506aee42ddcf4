//! Build a [`RewriteTable`] from configuration and content.

use super::{
    ANY_SCHEME_HOST, DEFAULT_REDIRECT_STATUS, MappingError, MappingRule, RewriteEntry,
    RewriteTable, fix_key_port, is_regex, key_to_url,
};
use crate::config::{MappingConfig, ResolverConfig};
use crate::store::{ContentStore, StoreError, node_name, parent_path};
use crate::{debug, debug_do, log};
use rustc_hash::FxHashMap;

/// Collects entries from every rule source.
pub struct RuleLoader<'a> {
    mapping: &'a MappingConfig,
    resolver: &'a ResolverConfig,
    store: &'a dyn ContentStore,
}

/// Entries gathered so far. Map entries with the same pattern are merged.
#[derive(Default)]
struct Collected {
    resolve: Vec<RewriteEntry>,
    map: Vec<RewriteEntry>,
    map_index: FxHashMap<String, usize>,
}

impl Collected {
    fn push_resolve(&mut self, entry: Result<RewriteEntry, MappingError>) {
        match entry {
            Ok(entry) => self.resolve.push(entry),
            Err(err) => log!("warning"; "skipping rewrite rule: {}", describe(&err)),
        }
    }

    fn push_map(&mut self, pattern: &str, replacement: &str, status: Option<u16>) {
        let source = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^{pattern}")
        };
        if let Some(&idx) = self.map_index.get(&source) {
            let entry = &mut self.map[idx];
            if !entry.replacements().iter().any(|r| r == replacement) {
                entry.push_replacement(replacement.to_string());
            }
            return;
        }
        match RewriteEntry::new(&source, status, false, [replacement]) {
            Ok(entry) => {
                self.map_index.insert(source, self.map.len());
                self.map.push(entry);
            }
            Err(err) => log!("warning"; "skipping map rule: {}", describe(&err)),
        }
    }
}

fn describe(err: &MappingError) -> String {
    match err {
        MappingError::Pattern { pattern, source } => format!("`{pattern}`: {source}"),
        other => other.to_string(),
    }
}

impl<'a> RuleLoader<'a> {
    pub fn new(
        mapping: &'a MappingConfig,
        resolver: &'a ResolverConfig,
        store: &'a dyn ContentStore,
    ) -> Self {
        Self {
            mapping,
            resolver,
            store,
        }
    }

    /// Read every source into a fresh table.
    ///
    /// Broken individual rules are skipped with a warning; store failures
    /// abort the build.
    pub fn build(&self) -> Result<RewriteTable, MappingError> {
        let mut acc = Collected::default();

        if self.store.exists(&self.mapping.root)? {
            self.gather(&self.mapping.root, "", &mut acc)?;
        }
        self.load_virtual(&mut acc);
        self.load_mappings(&mut acc);
        if self.mapping.vanity_paths {
            self.load_vanity(&mut acc)?;
        }

        let table = RewriteTable::new(acc.resolve, acc.map);
        debug!(
            "routes";
            "built {} resolve and {} map entries",
            table.resolve_entries().len(),
            table.map_entries().len()
        );
        debug_do! {
            for entry in table.resolve_entries() {
                debug!("routes"; "resolve {} -> {:?}", entry.source(), entry.replacements());
            }
        }
        Ok(table)
    }

    // ========================================================================
    // map-root tree
    // ========================================================================

    /// Walk the rule tree below `node`, `prefix` being the key so far.
    fn gather(&self, node: &str, prefix: &str, acc: &mut Collected) -> Result<(), StoreError> {
        let props = &self.mapping.properties;
        for child in self.store.children_of(node)? {
            let explicit = self
                .store
                .property(&child, &props.match_key)?
                .and_then(|v| v.as_str().map(str::to_string));
            let (segment, trailing_slash) = match explicit {
                Some(segment) => (segment, false),
                None => (format!("{}/", node_name(&child)), true),
            };
            let key = format!("{prefix}{segment}");

            if !key.ends_with('$') {
                let next = if trailing_slash {
                    key.clone()
                } else {
                    format!("{key}/")
                };
                self.gather(&child, &next, acc)?;
            }

            self.add_tree_entries(&child, &key, trailing_slash, acc)?;
        }
        Ok(())
    }

    fn add_tree_entries(
        &self,
        node: &str,
        key: &str,
        trailing_slash: bool,
        acc: &mut Collected,
    ) -> Result<(), StoreError> {
        let props = &self.mapping.properties;
        let key = fix_key_port(key);

        if let Some(target) = self
            .store
            .property(node, &props.redirect)?
            .and_then(|v| v.as_str().map(str::to_string))
        {
            let status = self.status_of(node)?;
            acc.push_resolve(RewriteEntry::new(
                &key,
                Some(status),
                trailing_slash,
                [target],
            ));
            return Ok(());
        }

        let internal = self
            .store
            .property(node, &props.internal_redirect)?
            .map(|v| v.as_strings())
            .unwrap_or_default();
        if internal.is_empty() {
            return Ok(());
        }

        acc.push_resolve(RewriteEntry::new(
            &key,
            None,
            trailing_slash,
            internal.iter().cloned(),
        ));
        self.add_reverse_entries(&key, trailing_slash, &internal, acc);
        Ok(())
    }

    /// Map entries pointing back from internal redirect targets to the key.
    fn add_reverse_entries(
        &self,
        key: &str,
        trailing_slash: bool,
        internal: &[String],
        acc: &mut Collected,
    ) {
        let (url, end_hook) = match key.strip_suffix('$') {
            Some(url) => (url, "$"),
            None => (key, ""),
        };
        let url = url.strip_prefix(ANY_SCHEME_HOST).unwrap_or(url);
        if is_regex(url) {
            return;
        }
        let (url, status) = match key_to_url(url) {
            Some(url) => (url, Some(DEFAULT_REDIRECT_STATUS)),
            None => (url.to_string(), None),
        };

        for target in internal {
            let mut target = target.clone();
            if trailing_slash && !target.ends_with('/') {
                target.push('/');
            }
            if target.contains('$') {
                continue;
            }
            let pattern = format!("^{}{end_hook}", regex::escape(&target));
            acc.push_map(&pattern, &url, status);
        }
    }

    fn status_of(&self, node: &str) -> Result<u16, StoreError> {
        Ok(self
            .store
            .property(node, &self.mapping.properties.status)?
            .and_then(|v| v.as_long())
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(DEFAULT_REDIRECT_STATUS))
    }

    // ========================================================================
    // configured sources
    // ========================================================================

    fn load_virtual(&self, acc: &mut Collected) {
        for (external, internal) in &self.mapping.virtual_urls {
            let (external, internal) = (external.trim(), internal.trim());
            if external == internal || external.is_empty() || internal.is_empty() {
                continue;
            }
            acc.push_resolve(RewriteEntry::internal(
                &format!("^{ANY_SCHEME_HOST}{external}$"),
                [internal],
            ));
            acc.push_map(&format!("^{internal}$"), external, None);
        }
    }

    fn load_mappings(&self, acc: &mut Collected) {
        // Inbound rules sharing an external path become one entry.
        let mut inbound: Vec<(String, Vec<String>)> = Vec::new();

        for spec in &self.mapping.mappings {
            let rule = match MappingRule::parse(spec) {
                Ok(rule) => rule,
                Err(err) => {
                    log!("warning"; "{}", err);
                    continue;
                }
            };
            if rule.inbound {
                match inbound.iter_mut().find(|(ext, _)| *ext == rule.external) {
                    Some((_, targets)) => targets.push(rule.internal.clone()),
                    None => inbound.push((rule.external.clone(), vec![rule.internal.clone()])),
                }
            }
        }

        for spec in self.mapping.mappings.iter().rev() {
            if let Ok(rule) = MappingRule::parse(spec)
                && rule.outbound
                && !rule.is_identity()
            {
                acc.push_map(&rule.internal, &rule.external, None);
            }
        }

        for (external, targets) in inbound {
            acc.push_resolve(RewriteEntry::internal(
                &format!("^{ANY_SCHEME_HOST}{external}"),
                targets,
            ));
        }
    }

    // ========================================================================
    // vanity paths
    // ========================================================================

    fn load_vanity(&self, acc: &mut Collected) -> Result<(), StoreError> {
        let props = &self.mapping.properties;
        let nodes = match self.store.query(&props.vanity_path, "property") {
            Ok(nodes) => nodes,
            Err(err @ (StoreError::UnsupportedLanguage(_) | StoreError::QuerySyntax { .. })) => {
                log!("warning"; "vanity paths disabled: {}", err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        for node in nodes {
            let values = self
                .store
                .property(&node, &props.vanity_path)?
                .map(|v| v.as_strings())
                .unwrap_or_default();

            let target = if node_name(&node) == self.resolver.content_child {
                parent_path(&node).unwrap_or("/").to_string()
            } else {
                node.clone()
            };
            let redirect = self
                .store
                .property(&node, &props.vanity_redirect)?
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let status = if redirect {
                Some(self.status_of(&node)?)
            } else {
                None
            };

            for value in values {
                let Some(key) = vanity_key(&value) else {
                    continue;
                };
                debug!("routes"; "vanity {} -> {}", key, target);
                acc.push_resolve(RewriteEntry::new(
                    &format!("{key}$"),
                    status,
                    false,
                    [format!("{target}.html")],
                ));
                acc.push_resolve(RewriteEntry::new(
                    &format!("{key}(\\..*)"),
                    status,
                    false,
                    [format!("{target}$1")],
                ));
            }
        }
        Ok(())
    }
}

/// Pattern head for a vanity path value, extension stripped.
fn vanity_key(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let key = if value.contains(":/") {
        let url = match url::Url::parse(value) {
            Ok(url) => url,
            Err(err) => {
                log!("warning"; "ignoring vanity path `{}`: {}", value, err);
                return None;
            }
        };
        let host = url.host_str()?;
        let port = url.port_or_known_default().unwrap_or(80);
        format!("^{}/{host}.{port}{}", url.scheme(), url.path())
    } else if value.starts_with('/') {
        format!("^{ANY_SCHEME_HOST}{value}")
    } else {
        format!("^{ANY_SCHEME_HOST}/{value}")
    };

    let last_slash = key.rfind('/').unwrap_or(0);
    match key[last_slash..].find('.') {
        Some(dot) => {
            log!("warning"; "vanity path `{}` has an extension, it is ignored", value);
            Some(key[..last_slash + dot].to_string())
        }
        None => Some(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn build(store: &MemoryStore, mapping: MappingConfig) -> RewriteTable {
        RuleLoader::new(&mapping, &ResolverConfig::default(), store)
            .build()
            .unwrap()
    }

    fn map_tree() -> MemoryStore {
        let store = MemoryStore::new("default");
        store.add_node("/etc/map/http/virtual.host.com", "waymark:Mapping");
        store
            .set_property(
                "/etc/map/http/virtual.host.com",
                "waymark:internalRedirect",
                "/content/virtual",
            )
            .unwrap();
        store.add_node("/etc/map/http/old.host.com", "waymark:Mapping");
        store
            .set_property(
                "/etc/map/http/old.host.com",
                "waymark:redirect",
                "http://new.host.com",
            )
            .unwrap();
        store
            .set_property("/etc/map/http/old.host.com", "waymark:status", 301i64)
            .unwrap();
        store
    }

    #[test]
    fn test_tree_internal_redirect() {
        let table = build(&map_tree(), MappingConfig::default());

        let (entry, paths) = table
            .resolve_match("http/virtual.host.com.80/playground.html")
            .unwrap();
        assert!(entry.is_internal());
        assert_eq!(paths, vec!["/content/virtual/playground.html"]);

        let (entry, urls) = table
            .map_match("/content/virtual/playground.html")
            .unwrap();
        assert_eq!(entry.status(), Some(302));
        assert_eq!(urls, vec!["http://virtual.host.com/playground.html"]);
    }

    #[test]
    fn test_tree_external_redirect() {
        let table = build(&map_tree(), MappingConfig::default());

        let (entry, targets) = table.resolve_match("http/old.host.com.80/a/b").unwrap();
        assert_eq!(entry.status(), Some(301));
        assert_eq!(targets, vec!["http://new.host.com/a/b"]);
        // External redirects are one-way
        assert!(table.map_entries().iter().all(|e| !e.source().contains("new.host")));
    }

    #[test]
    fn test_tree_match_property_and_end_hook() {
        let store = MemoryStore::new("default");
        store.add_node("/etc/map/https/localhost.443/virtual", "waymark:Mapping");
        let node = "/etc/map/https/localhost.443/virtual";
        store
            .set_property(node, "waymark:match", "virtual$")
            .unwrap();
        store
            .set_property(node, "waymark:internalRedirect", "/content/virtual.html")
            .unwrap();

        let table = build(&store, MappingConfig::default());
        let (_, paths) = table.resolve_match("https/localhost.443/virtual").unwrap();
        assert_eq!(paths, vec!["/content/virtual.html"]);

        let (_, urls) = table.map_match("/content/virtual.html").unwrap();
        assert_eq!(urls, vec!["https://localhost/virtual"]);
        assert!(table.map_match("/content/virtual.html.x").is_none());
    }

    #[test]
    fn test_regex_keys_have_no_map_entry() {
        let store = MemoryStore::new("default");
        let node = "/etc/map/http/localhost.80/game";
        store.add_node(node, "waymark:Mapping");
        store
            .set_property(node, "waymark:match", "(playground|designground)")
            .unwrap();
        store
            .set_property(node, "waymark:internalRedirect", "/content/$1.html")
            .unwrap();

        let table = build(&store, MappingConfig::default());
        let (_, paths) = table.resolve_match("http/localhost.80/playground").unwrap();
        assert_eq!(paths, vec!["/content/playground.html"]);
        assert!(table.map_match("/content/playground.html").is_none());
    }

    #[test]
    fn test_same_target_merges_hosts() {
        let store = MemoryStore::new("default");
        for host in ["de.host.com", "en.host.com"] {
            let node = format!("/etc/map/http/{host}");
            store.add_node(&node, "waymark:Mapping");
            store
                .set_property(&node, "waymark:internalRedirect", "/")
                .unwrap();
        }

        let table = build(&store, MappingConfig::default());
        let (_, urls) = table.map_match("/playground.html").unwrap();
        assert_eq!(
            urls,
            vec![
                "http://de.host.com/playground.html",
                "http://en.host.com/playground.html"
            ]
        );
    }

    #[test]
    fn test_default_mapping_strips_host() {
        let table = build(&MemoryStore::new("default"), MappingConfig::default());
        let (_, paths) = table.resolve_match("http/localhost.80/content/a").unwrap();
        assert_eq!(paths, vec!["/content/a"]);
        assert!(table.map_entries().is_empty());
    }

    #[test]
    fn test_configured_mapping_and_virtual() {
        let mut mapping = MappingConfig {
            mappings: vec!["/content/:/".into()],
            ..Default::default()
        };
        mapping
            .virtual_urls
            .insert("/home".into(), "/content/home.html".into());

        let table = build(&MemoryStore::new("default"), mapping);

        let (_, paths) = table.resolve_match("http/localhost.80/home").unwrap();
        assert_eq!(paths, vec!["/content/home.html"]);
        let (_, paths) = table.resolve_match("http/localhost.80/news").unwrap();
        assert_eq!(paths, vec!["/content/news"]);

        let (_, urls) = table.map_match("/content/home.html").unwrap();
        assert_eq!(urls, vec!["/home"]);
        let (_, urls) = table.map_match("/content/news").unwrap();
        assert_eq!(urls, vec!["/news"]);
    }

    #[test]
    fn test_vanity_paths() {
        let store = MemoryStore::new("default");
        store.add_node("/content/news/jcr:content", "page");
        store
            .set_property("/content/news/jcr:content", "waymark:vanityPath", "/latest.html")
            .unwrap();
        store.add_node("/content/promo", "page");
        store
            .set_property("/content/promo", "waymark:vanityPath", "offer")
            .unwrap();
        store
            .set_property("/content/promo", "waymark:vanityRedirect", true)
            .unwrap();

        let table = build(&store, MappingConfig::default());

        let (entry, paths) = table.resolve_match("http/localhost.80/latest").unwrap();
        assert!(entry.is_internal());
        assert_eq!(paths, vec!["/content/news.html"]);

        let (_, paths) = table.resolve_match("http/localhost.80/latest.print.html").unwrap();
        assert_eq!(paths, vec!["/content/news.print.html"]);

        let (entry, targets) = table.resolve_match("https/example.com.443/offer").unwrap();
        assert_eq!(entry.status(), Some(302));
        assert_eq!(targets, vec!["/content/promo.html"]);
    }

    #[test]
    fn test_vanity_key() {
        assert_eq!(
            vanity_key("/latest.html").as_deref(),
            Some("^[^/]+/[^/]+/latest")
        );
        assert_eq!(
            vanity_key("http://example.com/promo").as_deref(),
            Some("^http/example.com.80/promo")
        );
        assert_eq!(vanity_key("  "), None);
    }
}
