//! Shared engine state.

use super::{DecoratorChain, ResolutionEngine, ResolveError};
use crate::config::{MappingConfig, ResolverConfig, WaymarkConfig};
use crate::mapping::{Reloader, RewriteTable, RuleLoader, TableHolder};
use crate::store::{MemoryRepository, Repository};
use crate::{debug, log};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything engines created by one factory have in common.
pub(super) struct Shared {
    pub(super) resolver: ArcSwap<ResolverConfig>,
    pub(super) mapping: ArcSwap<MappingConfig>,
    pub(super) tables: TableHolder,
    pub(super) decorators: DecoratorChain,
    pub(super) repository: Arc<dyn Repository>,
    /// Held from reading the settings until the rebuilt table is published.
    rebuild_lock: Mutex<()>,
}

impl Shared {
    fn build_table(
        resolver: &ResolverConfig,
        mapping: &MappingConfig,
        repository: &dyn Repository,
    ) -> Result<RewriteTable, ResolveError> {
        let store = repository.login(repository.default_workspace())?;
        Ok(RuleLoader::new(mapping, resolver, store.as_ref()).build()?)
    }

    fn rebuild(&self) -> Result<u64, ResolveError> {
        let _guard = self.rebuild_lock.lock();
        self.rebuild_locked()
    }

    fn reconfigure(
        &self,
        resolver: ResolverConfig,
        mapping: MappingConfig,
    ) -> Result<u64, ResolveError> {
        let _guard = self.rebuild_lock.lock();
        self.resolver.store(Arc::new(resolver));
        self.mapping.store(Arc::new(mapping));
        debug!("reload"; "configuration replaced");
        self.rebuild_locked()
    }

    fn rebuild_locked(&self) -> Result<u64, ResolveError> {
        let table = Self::build_table(
            &self.resolver.load(),
            &self.mapping.load(),
            self.repository.as_ref(),
        )?;
        Ok(self.tables.publish(table))
    }
}

/// Creates [`ResolutionEngine`]s and keeps their rewrite table current.
pub struct ResolverFactory {
    shared: Arc<Shared>,
}

impl ResolverFactory {
    /// Build the first rewrite table and wrap everything up.
    pub fn new(
        resolver: ResolverConfig,
        mapping: MappingConfig,
        repository: Arc<dyn Repository>,
    ) -> Result<Self, ResolveError> {
        let table = Shared::build_table(&resolver, &mapping, repository.as_ref())?;
        Ok(Self {
            shared: Arc::new(Shared {
                resolver: ArcSwap::from_pointee(resolver),
                mapping: ArcSwap::from_pointee(mapping),
                tables: TableHolder::new(table),
                decorators: DecoratorChain::new(),
                repository,
                rebuild_lock: Mutex::new(()),
            }),
        })
    }

    /// Factory over the workspaces listed in `[store]`.
    pub fn from_config(config: &WaymarkConfig) -> Result<Self, ResolveError> {
        let repository = MemoryRepository::from_config(&config.store, &config.root)?;
        Self::new(
            config.resolver.clone(),
            config.mapping.clone(),
            Arc::new(repository),
        )
    }

    /// Engine bound to the default workspace.
    pub fn resolver(&self) -> Result<ResolutionEngine, ResolveError> {
        self.resolver_for(self.shared.repository.default_workspace())
    }

    /// Engine bound to `workspace`.
    pub fn resolver_for(&self, workspace: &str) -> Result<ResolutionEngine, ResolveError> {
        let store = self.shared.repository.login(workspace)?;
        Ok(ResolutionEngine::new(Arc::clone(&self.shared), store))
    }

    pub fn decorators(&self) -> &DecoratorChain {
        &self.shared.decorators
    }

    /// Table currently handed to new calls.
    pub fn table(&self) -> Arc<RewriteTable> {
        self.shared.tables.snapshot()
    }

    pub fn resolver_config(&self) -> Arc<ResolverConfig> {
        self.shared.resolver.load_full()
    }

    /// Rebuild the rewrite table now. Returns the new generation.
    pub fn reload(&self) -> Result<u64, ResolveError> {
        self.shared.rebuild()
    }

    /// Swap in new settings and rebuild the table for them.
    pub fn reconfigure(
        &self,
        resolver: ResolverConfig,
        mapping: MappingConfig,
    ) -> Result<u64, ResolveError> {
        self.shared.reconfigure(resolver, mapping)
    }

    /// Start a background worker that rebuilds on [`Reloader::trigger`].
    pub fn spawn_reloader(&self) -> Reloader {
        let shared = Arc::clone(&self.shared);
        Reloader::spawn(move || {
            if let Err(err) = shared.rebuild() {
                log!("error"; "rebuilding rewrite table failed: {}", error_chain(&err));
            }
        })
    }
}

/// `err: cause: cause` on one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
