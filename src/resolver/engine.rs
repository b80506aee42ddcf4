//! The resolution engine.

use super::factory::Shared;
use super::resource::RESOURCE_TYPE_PROPERTY;
use super::workspace::Siblings;
use super::{
    AliasResolver, MAX_REWRITE_PASSES, NamespaceMangler, Resource, ResolveError,
    path_candidates,
};
use crate::core::{RequestContext, encode_path, is_url, normalize_path, request_key, split_suffix};
use crate::mapping::RewriteEntry;
use crate::store::{AccessError, StoreError, StoreRef, join_path};
use crate::{debug, log};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// Resolves request paths to resources and maps content paths to URLs for
/// one workspace.
///
/// Every call takes one snapshot of the configuration and the rewrite table
/// and uses it throughout, so a concurrent reload is never observed halfway.
pub struct ResolutionEngine {
    shared: Arc<Shared>,
    store: StoreRef,
    siblings: Siblings,
    closed: AtomicBool,
}

impl ResolutionEngine {
    pub(super) fn new(shared: Arc<Shared>, store: StoreRef) -> Self {
        Self {
            shared,
            store,
            siblings: Siblings::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Workspace this engine reads from.
    pub fn workspace(&self) -> &str {
        self.store.workspace()
    }

    pub fn is_live(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Close this engine and every sibling it opened. Closing twice is a
    /// no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("resolve"; "closing engine for workspace `{}`", self.workspace());
        self.siblings.close_all();
    }

    fn check_open(&self) -> Result<(), ResolveError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ResolveError::Closed)
        }
    }

    /// Prefixes tried, in order, for relative paths.
    pub fn search_path(&self) -> Result<Vec<String>, ResolveError> {
        self.check_open()?;
        Ok(self.shared.resolver.load().normalized_search_path())
    }

    // ========================================================================
    // resolve
    // ========================================================================

    /// Resolve a request path into a resource.
    ///
    /// Never fails for a path that matches nothing: that yields a
    /// non-existing placeholder.
    pub fn resolve(
        &self,
        path: Option<&str>,
        request: Option<&RequestContext>,
    ) -> Result<Resource, ResolveError> {
        self.check_open()?;
        let config = self.shared.resolver.load_full();

        let mut workspace = None;
        let abs_path = match path {
            None => "/".to_string(),
            Some(path) if path.starts_with('/') => path.to_string(),
            Some(path) => match split_workspace(path).filter(|_| config.multi_workspaces) {
                Some((ws, rest)) => {
                    workspace = Some(ws.to_string());
                    rest.to_string()
                }
                None => format!("/{path}"),
            },
        };

        let abs_path =
            NamespaceMangler::new(config.mangle_namespaces).unmangle(&abs_path, self.store.as_ref());

        if config.multi_workspaces {
            let target = workspace.or_else(|| request.and_then(|r| r.workspace.clone()));
            if let Some(ws) = target.filter(|ws| ws != self.workspace()) {
                debug!("resolve"; "delegating {} to workspace `{}`", abs_path, ws);
                return match self.sibling(&ws) {
                    Ok(engine) => engine.resolve(Some(&abs_path), request),
                    Err(err) => {
                        debug!("resolve"; "{}, {} does not resolve", err, abs_path);
                        let placeholder = Resource::non_existing(&abs_path, &ws);
                        Ok(self.decorate(placeholder, request))
                    }
                };
            }
        }

        let real_paths = match self.rewrite(&abs_path, request)? {
            Rewritten::Paths(paths) => paths,
            Rewritten::Redirect(entry_status, target) => {
                debug!("resolve"; "{} redirects to {} ({})", abs_path, target, entry_status);
                let redirect = Resource::redirect(&abs_path, target, entry_status, self.workspace());
                return Ok(self.decorate(redirect, request));
            }
        };

        let search_path = config.normalized_search_path();
        let alias = AliasResolver::from_config(&config);
        let mut found = None;

        for real_path in &real_paths {
            if Resource::is_star_path(real_path) {
                debug!("resolve"; "{} is a star resource", real_path);
                found = Some(Resource::star(
                    &absolute(real_path, &search_path),
                    self.workspace(),
                ));
                break;
            }

            if real_path.starts_with('/') {
                found = self.resolve_direct(real_path, &alias)?;
            } else {
                for prefix in &search_path {
                    found = self.resolve_direct(&format!("{prefix}{real_path}"), &alias)?;
                    if found.is_some() {
                        break;
                    }
                }
            }
            if found.is_some() {
                break;
            }
        }

        let resource = match found {
            Some(resource) => {
                debug!("resolve"; "{} resolves to {}", abs_path, resource);
                resource
            }
            None => {
                let first = real_paths.first().map_or(abs_path.as_str(), String::as_str);
                let path = absolute(first, &search_path);
                debug!("resolve"; "{} does not resolve, placeholder at {}", abs_path, path);
                Resource::non_existing(&path, self.workspace())
            }
        };
        Ok(self.decorate(resource, request))
    }

    /// Run the resolve view until it yields content paths or a redirect.
    fn rewrite(
        &self,
        abs_path: &str,
        request: Option<&RequestContext>,
    ) -> Result<Rewritten, ResolveError> {
        let table = self.shared.tables.snapshot();
        let mut key = request_key(request, abs_path);
        let mut real_paths = vec![abs_path.to_string()];

        for _ in 0..MAX_REWRITE_PASSES {
            let Some((entry, mapped)) = table.resolve_match(&key) else {
                debug!("resolve"; "{} matches no rewrite rule", key);
                return Ok(Rewritten::Paths(real_paths));
            };
            debug!("resolve"; "{} matches {}, mapped to {:?}", key, entry.source(), mapped);

            let Some(first) = mapped.first() else {
                return Ok(Rewritten::Paths(real_paths));
            };
            if let Some(status) = entry.status() {
                return Ok(Rewritten::Redirect(status, first.clone()));
            }
            if !is_url(first) {
                return Ok(Rewritten::Paths(mapped));
            }

            let (next_key, path) = url_key(first)?;
            debug!("resolve"; "rewritten to URL, continuing with {}", next_key);
            key = next_key;
            real_paths = vec![path];
        }

        Err(ResolveError::RewriteLoop {
            path: abs_path.to_string(),
            passes: MAX_REWRITE_PASSES,
        })
    }

    /// Find the resource at `abs_path`, cutting selectors and extensions and
    /// following aliases as needed.
    fn resolve_direct(
        &self,
        abs_path: &str,
        alias: &AliasResolver,
    ) -> Result<Option<Resource>, StoreError> {
        let store = self.store.as_ref();

        for candidate in path_candidates(abs_path) {
            if let Some(node_type) = store.node_type(candidate)? {
                let info = &abs_path[candidate.len()..];
                return self
                    .node_resource(candidate, node_type, candidate, info)
                    .map(Some);
            }
        }

        // Drill down from the root, one segment at a time.
        let mut current = "/".to_string();
        let mut consumed = 0;
        let mut offset = 0;
        for segment in abs_path.split('/') {
            let start = offset;
            offset += segment.len() + 1;
            if segment.is_empty() {
                continue;
            }

            if let Some(child) = alias.child_by_name_or_alias(store, &current, segment)? {
                current = child;
                consumed = start + segment.len();
                continue;
            }

            let mut hit = None;
            for name in path_candidates(segment).skip(1) {
                if let Some(child) = alias.child_by_name_or_alias(store, &current, name)? {
                    hit = Some((child, name.len()));
                    break;
                }
            }
            match hit {
                Some((child, len)) => {
                    current = child;
                    consumed = start + len;
                    break;
                }
                None => return Ok(None),
            }
        }

        let Some(node_type) = store.node_type(&current)? else {
            return Ok(None);
        };
        let (resolution_path, info) = abs_path.split_at(consumed);
        self.node_resource(&current, node_type, resolution_path, info)
            .map(Some)
    }

    fn node_resource(
        &self,
        path: &str,
        node_type: String,
        resolution_path: &str,
        info: &str,
    ) -> Result<Resource, StoreError> {
        let resource_type = self
            .store
            .property(path, RESOURCE_TYPE_PROPERTY)?
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or(node_type);
        Ok(Resource::node(
            path,
            resource_type,
            self.workspace(),
            resolution_path,
            info,
        ))
    }

    // ========================================================================
    // map
    // ========================================================================

    /// Build the external form of a content path.
    pub fn map(&self, path: &str, request: Option<&RequestContext>) -> Result<String, ResolveError> {
        self.check_open()?;
        let config = self.shared.resolver.load_full();
        let table = self.shared.tables.snapshot();
        let alias = AliasResolver::from_config(&config);

        let (path_part, suffix) = split_suffix(path);
        let mut mapped = path_part.to_string();
        if let Some(request) = request {
            let base = request.base_url();
            if let Some(rest) = mapped.strip_prefix(base.as_str()) {
                mapped = format!("/{rest}");
            }
        }

        let mut aliased = None;
        let mut denied = false;
        if config.multi_workspaces {
            let target = match split_workspace(&mapped) {
                Some((ws, rest)) => {
                    let ws = ws.to_string();
                    mapped = rest.to_string();
                    Some(ws)
                }
                None => request.and_then(|r| r.workspace.clone()),
            };
            if let Some(ws) = target.filter(|ws| ws != self.workspace()) {
                match self.sibling(&ws) {
                    Ok(engine) => aliased = engine.alias_mapped(&mapped, &alias)?,
                    Err(err) => {
                        debug!("map"; "{}, mapping {} unresolved", err, mapped);
                        denied = true;
                    }
                }
            }
        }
        if aliased.is_none() && !denied {
            aliased = self.alias_mapped(&mapped, &alias)?;
        }
        if let Some(aliased) = aliased {
            debug!("map"; "alias mapping gives {}", aliased);
            mapped = aliased;
        }

        if let Some((entry, candidates)) = table.map_match(&mapped) {
            debug!("map"; "{} matches {}", mapped, entry.source());
            if let Some(chosen) = choose_alternative(entry, candidates, request) {
                mapped = chosen;
            }
        }

        let mangler = NamespaceMangler::new(config.mangle_namespaces);
        let context_path = request.map_or("", |r| r.context_path.as_str());
        let mut url = finish_url(&mapped, mangler, context_path);
        url.push_str(suffix);

        debug!("map"; "{} -> {}", path, url);
        Ok(url)
    }

    /// Path of the resource at `path` with every segment replaced by its
    /// first alias, plus the resolution path info. `None` when nothing is
    /// found.
    fn alias_mapped(
        &self,
        path: &str,
        alias: &AliasResolver,
    ) -> Result<Option<String>, StoreError> {
        let Some(resource) = self.resolve_direct(path, alias)? else {
            return Ok(None);
        };

        let segments: Vec<&str> = resource
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            return Ok(Some("/".to_string()));
        }

        let store = self.store.as_ref();
        let mut mapped = String::with_capacity(resource.path.len());
        let mut current = "/".to_string();
        for name in segments {
            mapped.push('/');
            match store.child_by_name(&current, name)? {
                Some(child) => {
                    let first = alias.first_alias(store, &child)?;
                    mapped.push_str(first.as_deref().unwrap_or(name));
                    current = child;
                }
                None => {
                    log!("warning"; "cannot load {} for alias mapping", join_path(&current, name));
                    mapped.push_str(name);
                    current = join_path(&current, name);
                }
            }
        }
        mapped.push_str(&resource.metadata.resolution_path_info);
        Ok(Some(mapped))
    }

    // ========================================================================
    // Direct access
    // ========================================================================

    /// Resource at exactly `path`, without rewriting or selector stripping.
    ///
    /// `.` and `..` segments are normalized; a path escaping the root gives
    /// `None`. Relative paths are tried against each search path entry.
    pub fn get_resource(&self, path: &str) -> Result<Option<Resource>, ResolveError> {
        self.check_open()?;
        let config = self.shared.resolver.load_full();

        let mut path = path;
        if config.multi_workspaces
            && let Some((ws, rest)) = split_workspace(path)
        {
            if ws != self.workspace() {
                return match self.sibling(ws) {
                    Ok(engine) => engine.get_resource(rest),
                    Err(err) => {
                        debug!("resolve"; "{}, no resource at {}", err, rest);
                        Ok(None)
                    }
                };
            }
            path = rest;
        }

        if path.starts_with('/') {
            let Some(normalized) = normalize_path(path) else {
                return Ok(None);
            };
            let Some(node_type) = self.store.node_type(&normalized)? else {
                return Ok(None);
            };
            let resource = self.node_resource(&normalized, node_type, &normalized, "")?;
            return Ok(Some(self.decorate(resource, None)));
        }

        for prefix in config.normalized_search_path() {
            if let Some(resource) = self.get_resource(&format!("{prefix}{path}"))? {
                return Ok(Some(resource));
            }
        }
        Ok(None)
    }

    /// Like [`get_resource`](Self::get_resource), with relative paths taken
    /// from `base`.
    pub fn get_resource_from(
        &self,
        base: &Resource,
        path: &str,
    ) -> Result<Option<Resource>, ResolveError> {
        if path.starts_with('/') {
            return self.get_resource(path);
        }
        self.get_resource(&join_path(&base.path, path))
    }

    /// Children of `parent`, in stored order.
    pub fn list_children(&self, parent: &Resource) -> Result<Vec<Resource>, ResolveError> {
        self.check_open()?;

        let mut path = parent.path.as_str();
        if let Some((ws, rest)) = split_workspace(path) {
            if ws != self.workspace() {
                if !self.shared.resolver.load().multi_workspaces {
                    log!("warning"; "cannot list {} without multi-workspace support", parent.path);
                    return Ok(Vec::new());
                }
                return match self.sibling(ws) {
                    Ok(engine) => engine.list_children(parent),
                    Err(err) => {
                        debug!("resolve"; "{}, no children for {}", err, parent.path);
                        Ok(Vec::new())
                    }
                };
            }
            path = rest;
        }

        let mut children = Vec::new();
        for child in self.store.children_of(path)? {
            let Some(node_type) = self.store.node_type(&child)? else {
                continue;
            };
            let resource = self.node_resource(&child, node_type, &child, "")?;
            children.push(self.decorate(resource, None));
        }
        Ok(children)
    }

    /// Run a store query and return the matching resources.
    pub fn find_resources(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<Resource>, ResolveError> {
        self.check_open()?;

        let paths = self
            .store
            .query(query, language)
            .map_err(|err| ResolveError::from_query(err, query))?;

        let mut found = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(node_type) = self.store.node_type(&path)? else {
                continue;
            };
            let resource = self.node_resource(&path, node_type, &path, "")?;
            found.push(self.decorate(resource, None));
        }
        Ok(found)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn sibling(&self, workspace: &str) -> Result<Arc<ResolutionEngine>, AccessError> {
        self.siblings.get_or_create(workspace, || {
            let store = self.shared.repository.login(workspace)?;
            Ok(ResolutionEngine::new(Arc::clone(&self.shared), store))
        })
    }

    /// Number of sibling engines opened so far.
    pub fn open_siblings(&self) -> usize {
        self.siblings.len()
    }

    fn decorate(&self, resource: Resource, request: Option<&RequestContext>) -> Resource {
        let foreign = resource.workspace != self.shared.repository.default_workspace();
        let workspace = foreign.then(|| resource.workspace.clone());
        self.shared
            .decorators
            .decorate(resource, workspace.as_deref(), request)
    }
}

impl Drop for ResolutionEngine {
    fn drop(&mut self) {
        self.close();
    }
}

enum Rewritten {
    Paths(Vec<String>),
    Redirect(u16, String),
}

/// `ws:/path` split into `ws` and `/path`.
fn split_workspace(path: &str) -> Option<(&str, &str)> {
    let idx = path.find(":/")?;
    let (workspace, rest) = (&path[..idx], &path[idx + 1..]);
    if workspace.is_empty() || workspace.contains('/') || rest.starts_with("//") {
        return None;
    }
    Some((workspace, rest))
}

/// Relative paths are placed under the first search path entry.
fn absolute(path: &str, search_path: &[String]) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    match search_path.first() {
        Some(prefix) => format!("{prefix}{path}"),
        None => format!("/{path}"),
    }
}

/// Request key and decoded path of an internal URL replacement.
fn url_key(value: &str) -> Result<(String, String), ResolveError> {
    let malformed = |source| ResolveError::MalformedUrl {
        url: value.to_string(),
        source,
    };
    let url = Url::parse(value).map_err(malformed)?;
    let host = url
        .host_str()
        .ok_or_else(|| malformed(url::ParseError::EmptyHost))?;

    let path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
    let mut request = RequestContext::new(url.scheme(), host);
    request.port = url.port();
    Ok((request.key(&path), path))
}

/// Pick among the alternatives of a map entry.
///
/// For redirects and a known request: an alternative on the request's own
/// `scheme://host[:port]/` wins and is shortened to its path, else the first
/// one sharing the scheme, else the first.
fn choose_alternative(
    entry: &RewriteEntry,
    candidates: Vec<String>,
    request: Option<&RequestContext>,
) -> Option<String> {
    let Some(request) = request.filter(|_| !entry.is_internal()) else {
        return candidates.into_iter().next();
    };

    let base = request.base_url();
    let scheme = request.scheme_prefix();
    let mut same_scheme = None;
    for candidate in &candidates {
        if candidate.starts_with(&base) {
            return Some(candidate[base.len() - 1..].to_string());
        }
        if same_scheme.is_none() && candidate.starts_with(&scheme) {
            same_scheme = Some(candidate.clone());
        }
    }
    same_scheme.or_else(|| candidates.into_iter().next())
}

/// Mangle and escape the path part of `mapped`, prefixing the context path.
///
/// A URL that does not parse is returned as is.
fn finish_url(mapped: &str, mangler: NamespaceMangler, context_path: &str) -> String {
    let (head, path) = if is_url(mapped) {
        if let Err(err) = Url::parse(mapped) {
            log!("warning"; "cannot mangle namespaces of `{}`, returning it unmangled: {}", mapped, err);
            return mapped.to_string();
        }
        let authority = mapped.find("://").map_or(0, |idx| idx + 3);
        let path_start = mapped[authority..]
            .find('/')
            .map_or(mapped.len(), |idx| authority + idx);
        mapped.split_at(path_start)
    } else {
        ("", mapped)
    };

    let path = format!("{context_path}{}", mangler.mangle(path));
    format!("{head}{}", encode_path(&path))
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn test_split_workspace() {
        assert_eq!(split_workspace("ws2:/content"), Some(("ws2", "/content")));
        assert_eq!(split_workspace("http://host/x"), None);
        assert_eq!(split_workspace("/content/a:/b"), None);
        assert_eq!(split_workspace(":/x"), None);
    }

    #[test]
    fn test_url_key() {
        let (key, path) = url_key("http://virtual.host.com/content/a%20b.html").unwrap();
        assert_eq!(key, "http/virtual.host.com.80/content/a b.html");
        assert_eq!(path, "/content/a b.html");

        let (key, _) = url_key("https://secure:8443/x").unwrap();
        assert_eq!(key, "https/secure.8443/x");

        assert!(matches!(
            url_key("http://exa mple.com/"),
            Err(ResolveError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_finish_url() {
        let on = NamespaceMangler::new(true);
        assert_eq!(
            finish_url("/content/jcr:content/a b.html", on, "/ctx"),
            "/ctx/content/_jcr_content/a%20b.html"
        );
        assert_eq!(
            finish_url("http://host.com/x/jcr:y", on, ""),
            "http://host.com/x/_jcr_y"
        );
        assert_eq!(finish_url("http://host.com", on, ""), "http://host.com");
        assert_eq!(
            finish_url("http://bad host/jcr:x", on, ""),
            "http://bad host/jcr:x"
        );
    }

    #[test]
    fn test_choose_alternative() {
        let external = RewriteEntry::external(
            "^/content/",
            302,
            ["https://other.com/", "http://www.a.com/", "http://www.b.com/"],
        )
        .unwrap();
        let candidates = || {
            vec![
                "https://other.com/x".to_string(),
                "http://www.a.com/x".to_string(),
                "http://www.b.com/x".to_string(),
            ]
        };

        let request = RequestContext::new("http", "www.b.com");
        assert_eq!(
            choose_alternative(&external, candidates(), Some(&request)).as_deref(),
            Some("/x")
        );

        let request = RequestContext::new("http", "elsewhere.com");
        assert_eq!(
            choose_alternative(&external, candidates(), Some(&request)).as_deref(),
            Some("http://www.a.com/x")
        );

        let request = RequestContext::new("ftp", "elsewhere.com");
        assert_eq!(
            choose_alternative(&external, candidates(), Some(&request)).as_deref(),
            Some("https://other.com/x")
        );

        assert_eq!(
            choose_alternative(&external, candidates(), None).as_deref(),
            Some("https://other.com/x")
        );
    }
}
