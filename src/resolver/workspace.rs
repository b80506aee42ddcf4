//! Per-workspace sibling engines.

use super::ResolutionEngine;
use crate::debug;
use crate::store::AccessError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Engines for other workspaces, created on first use and kept until the
/// owning engine closes.
#[derive(Default)]
pub(super) struct Siblings {
    engines: RwLock<FxHashMap<String, Arc<ResolutionEngine>>>,
}

impl Siblings {
    /// Engine for `workspace`, creating it with `create` at most once.
    pub(super) fn get_or_create<F>(
        &self,
        workspace: &str,
        create: F,
    ) -> Result<Arc<ResolutionEngine>, AccessError>
    where
        F: FnOnce() -> Result<ResolutionEngine, AccessError>,
    {
        if let Some(engine) = self.engines.read().get(workspace) {
            return Ok(Arc::clone(engine));
        }

        let mut engines = self.engines.write();
        if let Some(engine) = engines.get(workspace) {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new(create()?);
        debug!("resolve"; "opened engine for workspace `{}`", workspace);
        engines.insert(workspace.to_string(), Arc::clone(&engine));
        Ok(engine)
    }

    pub(super) fn len(&self) -> usize {
        self.engines.read().len()
    }

    /// Close and forget every sibling.
    pub(super) fn close_all(&self) {
        let engines: Vec<_> = self.engines.write().drain().collect();
        for (workspace, engine) in engines {
            debug!("resolve"; "closing engine for workspace `{}`", workspace);
            engine.close();
        }
    }
}
