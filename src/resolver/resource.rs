//! Resolution results.

use std::fmt;

/// Property naming a node's resource type; the node type is used otherwise.
pub const RESOURCE_TYPE_PROPERTY: &str = "waymark:resourceType";

pub(super) const NON_EXISTING_TYPE: &str = "waymark:nonexisting";
pub(super) const STAR_TYPE: &str = "waymark:syntheticStarResource";
pub(super) const REDIRECT_TYPE: &str = "waymark:redirect";

/// What a [`Resource`] stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A node present in the content store.
    Node,
    /// Nothing matched; the path is kept for further request handling.
    NonExisting,
    /// A path containing `/*`, standing for "any child".
    Star,
    /// The request must be redirected to `target`.
    Redirect { target: String, status: u16 },
}

/// How the requested path splits into the part that addressed the resource
/// and what was left over (selectors, extension, suffix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMetadata {
    pub resolution_path: String,
    pub resolution_path_info: String,
}

/// The thing found at a resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub kind: ResourceKind,
    pub resource_type: String,
    pub workspace: String,
    pub metadata: ResourceMetadata,
}

impl Resource {
    pub(super) fn node(
        path: &str,
        resource_type: String,
        workspace: &str,
        resolution_path: &str,
        resolution_path_info: &str,
    ) -> Self {
        Self {
            path: path.to_string(),
            kind: ResourceKind::Node,
            resource_type,
            workspace: workspace.to_string(),
            metadata: ResourceMetadata {
                resolution_path: resolution_path.to_string(),
                resolution_path_info: resolution_path_info.to_string(),
            },
        }
    }

    /// Placeholder for a path that matched nothing. Everything from the
    /// first `.` on is treated as selectors, extension and suffix.
    pub(super) fn non_existing(path: &str, workspace: &str) -> Self {
        let (resolution_path, info) = match path.find('.') {
            Some(idx) => path.split_at(idx),
            None => (path, ""),
        };
        Self {
            path: path.to_string(),
            kind: ResourceKind::NonExisting,
            resource_type: NON_EXISTING_TYPE.to_string(),
            workspace: workspace.to_string(),
            metadata: ResourceMetadata {
                resolution_path: resolution_path.to_string(),
                resolution_path_info: info.to_string(),
            },
        }
    }

    /// Whether `path` addresses a star resource.
    pub fn is_star_path(path: &str) -> bool {
        path.contains("/*")
    }

    /// Star resource; its path ends right after the `/*`.
    pub(super) fn star(path: &str, workspace: &str) -> Self {
        let end = path.find("/*").map_or(path.len(), |idx| idx + 2);
        let (resource_path, info) = path.split_at(end);
        Self {
            path: resource_path.to_string(),
            kind: ResourceKind::Star,
            resource_type: STAR_TYPE.to_string(),
            workspace: workspace.to_string(),
            metadata: ResourceMetadata {
                resolution_path: resource_path.to_string(),
                resolution_path_info: info.to_string(),
            },
        }
    }

    pub(super) fn redirect(path: &str, target: String, status: u16, workspace: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: ResourceKind::Redirect { target, status },
            resource_type: REDIRECT_TYPE.to_string(),
            workspace: workspace.to_string(),
            metadata: ResourceMetadata {
                resolution_path: path.to_string(),
                resolution_path_info: String::new(),
            },
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self.kind, ResourceKind::NonExisting)
    }

    /// Redirect target and status, if this is a redirect.
    pub fn redirect_target(&self) -> Option<(&str, u16)> {
        match &self.kind {
            ResourceKind::Redirect { target, status } => Some((target, *status)),
            _ => None,
        }
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        crate::store::node_name(&self.path)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ResourceKind::Redirect { target, status } => {
                write!(f, "{} -> {} ({})", self.path, target, status)
            }
            _ => write!(f, "{} [{}]", self.path, self.resource_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_existing_splits_at_first_dot() {
        let res = Resource::non_existing("/content/a.b/c.html", "default");
        assert_eq!(res.metadata.resolution_path, "/content/a");
        assert_eq!(res.metadata.resolution_path_info, ".b/c.html");
        assert!(!res.exists());

        let res = Resource::non_existing("/content/missing", "default");
        assert_eq!(res.metadata.resolution_path, "/content/missing");
        assert_eq!(res.metadata.resolution_path_info, "");
    }

    #[test]
    fn test_star_resource() {
        assert!(Resource::is_star_path("/content/*.html"));
        assert!(!Resource::is_star_path("/content/page"));

        let res = Resource::star("/content/*.print.html", "default");
        assert_eq!(res.path, "/content/*");
        assert_eq!(res.metadata.resolution_path_info, ".print.html");
        assert!(res.exists());
    }

    #[test]
    fn test_redirect_display() {
        let res = Resource::redirect("/old", "http://new/".into(), 301, "default");
        assert_eq!(res.redirect_target(), Some(("http://new/", 301)));
        assert_eq!(res.to_string(), "/old -> http://new/ (301)");
    }
}
