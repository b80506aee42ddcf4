//! Workspace login.

use super::{AccessError, ContentStore, MemoryStore, StoreError, StoreRef};
use crate::{config::StoreConfig, debug, utils::fs::resolve_in};
use dashmap::{DashMap, DashSet};
use std::path::Path;
use std::sync::Arc;

/// Hands out one store per workspace.
pub trait Repository: Send + Sync {
    /// Workspace used when nothing else is asked for.
    fn default_workspace(&self) -> &str;

    /// Open `workspace`. Failing here means access is denied.
    fn login(&self, workspace: &str) -> Result<StoreRef, AccessError>;
}

/// Repository over in-memory workspaces.
#[derive(Debug)]
pub struct MemoryRepository {
    default_workspace: String,
    stores: DashMap<String, Arc<MemoryStore>>,
    denied: DashSet<String>,
}

impl MemoryRepository {
    /// Repository whose default workspace is `store`.
    pub fn new(store: MemoryStore) -> Self {
        let default_workspace = store.workspace().to_string();
        let stores = DashMap::new();
        stores.insert(default_workspace.clone(), Arc::new(store));
        Self {
            default_workspace,
            stores,
            denied: DashSet::new(),
        }
    }

    /// Add another workspace (builder form).
    pub fn with_workspace(self, store: MemoryStore) -> Self {
        self.add_workspace(store);
        self
    }

    pub fn add_workspace(&self, store: MemoryStore) {
        self.stores
            .insert(store.workspace().to_string(), Arc::new(store));
    }

    /// Direct handle on a workspace store, bypassing access checks.
    pub fn store(&self, workspace: &str) -> Option<Arc<MemoryStore>> {
        self.stores.get(workspace).map(|s| Arc::clone(s.value()))
    }

    /// Make every later login to `workspace` fail.
    pub fn deny(&self, workspace: &str) {
        self.denied.insert(workspace.to_string());
    }

    /// Load every workspace snapshot listed in `[store]`.
    ///
    /// Relative snapshot paths are resolved against `root`.
    pub fn from_config(config: &StoreConfig, root: &Path) -> Result<Self, StoreError> {
        let default = &config.default_workspace;
        let default_store = match config.workspaces.get(default) {
            Some(file) => MemoryStore::load(default.clone(), &resolve_in(file, root))?,
            None => MemoryStore::new(default.clone()),
        };

        let repository = Self::new(default_store);
        for (name, file) in &config.workspaces {
            if name == default {
                continue;
            }
            let path = resolve_in(file, root);
            debug!("store"; "loading workspace `{}` from {}", name, path.display());
            repository.add_workspace(MemoryStore::load(name.clone(), &path)?);
        }
        Ok(repository)
    }
}

impl Repository for MemoryRepository {
    fn default_workspace(&self) -> &str {
        &self.default_workspace
    }

    fn login(&self, workspace: &str) -> Result<StoreRef, AccessError> {
        if self.denied.contains(workspace) {
            return Err(AccessError::Denied(workspace.to_string()));
        }
        self.stores
            .get(workspace)
            .map(|s| Arc::clone(s.value()) as StoreRef)
            .ok_or_else(|| AccessError::NoSuchWorkspace(workspace.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_login_known_and_unknown() {
        let repo = MemoryRepository::new(MemoryStore::new("default"))
            .with_workspace(MemoryStore::new("ws2"));

        assert_eq!(repo.default_workspace(), "default");
        assert_eq!(repo.login("ws2").unwrap().workspace(), "ws2");
        assert!(matches!(
            repo.login("ws3"),
            Err(AccessError::NoSuchWorkspace(_))
        ));
    }

    #[test]
    fn test_denied_workspace() {
        let repo = MemoryRepository::new(MemoryStore::new("default"))
            .with_workspace(MemoryStore::new("ws2"));
        repo.deny("ws2");

        assert!(matches!(repo.login("ws2"), Err(AccessError::Denied(_))));
        assert!(repo.store("ws2").is_some());
    }

    #[test]
    fn test_from_config_loads_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.json"),
            r#"{"root":{"children":{"content":{}}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("archive.json"),
            r#"{"root":{"children":{"old":{}}}}"#,
        )
        .unwrap();

        let mut config = StoreConfig::default();
        config
            .workspaces
            .insert("default".into(), PathBuf::from("default.json"));
        config
            .workspaces
            .insert("archive".into(), PathBuf::from("archive.json"));

        let repo = MemoryRepository::from_config(&config, dir.path()).unwrap();
        assert!(repo.login("default").unwrap().exists("/content").unwrap());
        assert!(repo.login("archive").unwrap().exists("/old").unwrap());
    }
}
