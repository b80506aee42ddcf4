//! Pluggable resource transforms.

use super::Resource;
use crate::core::RequestContext;
use crate::debug;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transform applied to every resource an engine hands out.
pub trait ResourceDecorator: Send + Sync {
    /// Return a replacement for `resource`, or `None` to leave it as is.
    fn decorate(
        &self,
        resource: &Resource,
        workspace: Option<&str>,
        request: Option<&RequestContext>,
    ) -> Option<Resource>;
}

/// Handle returned by [`DecoratorChain::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecoratorId(u64);

#[derive(Clone)]
struct Registered {
    id: DecoratorId,
    priority: i32,
    decorator: Arc<dyn ResourceDecorator>,
}

/// Ordered decorators: higher priority first, then registration order.
///
/// Readers load the current chain as one snapshot; registering or removing
/// a decorator swaps in a rebuilt chain.
pub struct DecoratorChain {
    entries: ArcSwap<Vec<Registered>>,
    next_id: AtomicU64,
    write: Mutex<()>,
}

impl Default for DecoratorChain {
    fn default() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
            write: Mutex::new(()),
        }
    }
}

impl DecoratorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, priority: i32, decorator: Arc<dyn ResourceDecorator>) -> DecoratorId {
        let id = DecoratorId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let _guard = self.write.lock();

        let mut entries = Vec::clone(&self.entries.load());
        entries.push(Registered {
            id,
            priority,
            decorator,
        });
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        self.entries.store(Arc::new(entries));

        debug!("resolve"; "registered decorator {:?} with priority {}", id, priority);
        id
    }

    /// Remove a decorator. Returns `false` when `id` is unknown.
    pub fn unregister(&self, id: DecoratorId) -> bool {
        let _guard = self.write.lock();

        let current = self.entries.load();
        if !current.iter().any(|entry| entry.id == id) {
            return false;
        }
        let entries: Vec<_> = current.iter().filter(|entry| entry.id != id).cloned().collect();
        self.entries.store(Arc::new(entries));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `resource` through the chain.
    ///
    /// With a `workspace` (one that is not the default), the path is first
    /// prefixed with `workspace:` so it stays addressable across engines.
    pub fn decorate(
        &self,
        mut resource: Resource,
        workspace: Option<&str>,
        request: Option<&RequestContext>,
    ) -> Resource {
        if let Some(ws) = workspace
            && !resource.path.starts_with(&format!("{ws}:/"))
        {
            resource.path = format!("{ws}:{}", resource.path);
        }

        let entries = self.entries.load();
        for entry in entries.iter() {
            if let Some(replaced) = entry.decorator.decorate(&resource, workspace, request) {
                resource = replaced;
            }
        }
        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResourceKind;

    struct Tag(&'static str);

    impl ResourceDecorator for Tag {
        fn decorate(
            &self,
            resource: &Resource,
            _workspace: Option<&str>,
            _request: Option<&RequestContext>,
        ) -> Option<Resource> {
            let mut out = resource.clone();
            out.resource_type = format!("{}+{}", resource.resource_type, self.0);
            Some(out)
        }
    }

    struct Skip;

    impl ResourceDecorator for Skip {
        fn decorate(
            &self,
            _resource: &Resource,
            _workspace: Option<&str>,
            _request: Option<&RequestContext>,
        ) -> Option<Resource> {
            None
        }
    }

    fn resource() -> Resource {
        Resource::node("/content", "t".into(), "default", "/content", "")
    }

    #[test]
    fn test_priority_then_registration_order() {
        let chain = DecoratorChain::new();
        chain.register(0, Arc::new(Tag("low")));
        chain.register(10, Arc::new(Tag("high")));
        chain.register(0, Arc::new(Tag("low2")));
        chain.register(5, Arc::new(Skip));

        let out = chain.decorate(resource(), None, None);
        assert_eq!(out.resource_type, "t+high+low+low2");
        assert_eq!(out.kind, ResourceKind::Node);
    }

    #[test]
    fn test_unregister() {
        let chain = DecoratorChain::new();
        let id = chain.register(0, Arc::new(Tag("x")));
        assert_eq!(chain.len(), 1);
        assert!(chain.unregister(id));
        assert!(!chain.unregister(id));
        assert!(chain.is_empty());
        assert_eq!(chain.decorate(resource(), None, None).resource_type, "t");
    }

    #[test]
    fn test_workspace_prefix() {
        let chain = DecoratorChain::new();
        let out = chain.decorate(resource(), Some("archive"), None);
        assert_eq!(out.path, "archive:/content");

        let again = chain.decorate(out, Some("archive"), None);
        assert_eq!(again.path, "archive:/content");
    }
}
