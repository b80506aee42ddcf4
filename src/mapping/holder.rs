//! Publishing rewrite tables.
//!
//! Readers take an `Arc` snapshot once per operation and never see a table
//! change underneath them. Rebuilds run off the request path and replace the
//! whole table in one store.

use super::RewriteTable;
use crate::debug;
use arc_swap::ArcSwap;
use crossbeam::channel::{self, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Current rewrite table plus its generation counter.
#[derive(Debug)]
pub struct TableHolder {
    current: ArcSwap<RewriteTable>,
    /// Last published generation; held while its table is stored.
    generation: Mutex<u64>,
}

impl Default for TableHolder {
    fn default() -> Self {
        Self::new(RewriteTable::default())
    }
}

impl TableHolder {
    /// Holder publishing `table` as generation 1.
    pub fn new(table: RewriteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table.with_generation(1)),
            generation: Mutex::new(1),
        }
    }

    /// Table to use for one whole operation.
    pub fn snapshot(&self) -> Arc<RewriteTable> {
        self.current.load_full()
    }

    /// Replace the current table, returning its generation.
    pub fn publish(&self, table: RewriteTable) -> u64 {
        let mut last = self.generation.lock();
        *last += 1;
        let generation = *last;
        self.current.store(Arc::new(table.with_generation(generation)));
        drop(last);
        debug!("reload"; "published rewrite table generation {}", generation);
        generation
    }
}

// ============================================================================
// Background rebuilds
// ============================================================================

/// Worker thread running table rebuilds on request.
///
/// Triggers arriving while a rebuild is already queued are coalesced into
/// that rebuild. Dropping the reloader stops the worker after its current
/// run.
pub struct Reloader {
    tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    /// Set when no worker could be started; triggers then rebuild in place.
    inline: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Reloader {
    pub fn spawn<F>(rebuild: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let rebuild: Arc<dyn Fn() + Send + Sync> = Arc::new(rebuild);
        let worker = Arc::clone(&rebuild);
        let (tx, rx) = channel::bounded::<()>(1);
        let spawned = std::thread::Builder::new()
            .name("waymark-reload".into())
            .spawn(move || {
                while rx.recv().is_ok() {
                    worker();
                }
            });

        match spawned {
            Ok(handle) => Self {
                tx: Some(tx),
                handle: Some(handle),
                inline: None,
            },
            Err(err) => {
                crate::log!("error"; "could not start reload worker, rebuilds run inline: {}", err);
                Self::inline(rebuild)
            }
        }
    }

    /// Reloader without a worker: every trigger rebuilds on the caller's
    /// thread.
    pub(crate) fn inline(rebuild: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            tx: None,
            handle: None,
            inline: Some(rebuild),
        }
    }

    /// Ask for a rebuild. Returns `false` when one is already pending.
    pub fn trigger(&self) -> bool {
        if let Some(rebuild) = &self.inline {
            rebuild();
            return true;
        }
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("reload"; "rebuild already pending");
                false
            }
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

impl Drop for Reloader {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RewriteEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn table_to(target: &str) -> RewriteTable {
        RewriteTable::new(
            vec![RewriteEntry::internal("^[^/]+/[^/]+/", [target]).unwrap()],
            vec![],
        )
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let holder = TableHolder::new(table_to("/old/"));
        let before = holder.snapshot();
        assert_eq!(before.generation(), 1);

        assert_eq!(holder.publish(table_to("/new/")), 2);

        let (_, old) = before.resolve_match("http/localhost.80/x").unwrap();
        assert_eq!(old, vec!["/old/x"]);
        let (_, new) = holder
            .snapshot()
            .resolve_match("http/localhost.80/x")
            .unwrap();
        assert_eq!(new, vec!["/new/x"]);
    }

    #[test]
    fn test_reloader_runs_and_stops() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let reloader = Reloader::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(reloader.trigger());
        // Let the worker pick up the first request, then flood it.
        std::thread::sleep(Duration::from_millis(5));
        for _ in 0..10 {
            reloader.trigger();
        }
        drop(reloader);

        let total = runs.load(Ordering::SeqCst);
        assert!((1..=3).contains(&total), "unexpected run count {total}");
    }

    #[test]
    fn test_inline_reloader_rebuilds_on_trigger() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let reloader = Reloader::inline(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(reloader.trigger());
        assert!(reloader.trigger());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
