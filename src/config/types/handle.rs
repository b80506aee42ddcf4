//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement, so a
//! long-running process can pick up an edited `waymark.toml` without
//! restarting.

use crate::config::WaymarkConfig;
use anyhow::{Result, bail};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<WaymarkConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(WaymarkConfig::default()));

/// Global hash of the current config file content.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn cfg() -> Arc<WaymarkConfig> {
    CONFIG.load_full()
}

/// Reload config from disk if content changed.
///
/// Returns `Ok(true)` if config was updated, `Ok(false)` if unchanged.
pub fn reload_config() -> Result<bool> {
    use std::fs;

    let c = cfg();
    if c.config_path.as_os_str().is_empty() {
        bail!("no config file has been loaded");
    }

    let content = fs::read_to_string(&c.config_path)?;
    let new_hash = crate::utils::hash::compute(content.as_bytes());
    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let new_config = WaymarkConfig::load_file(&c.config_path)?;
    CONFIG.store(Arc::new(new_config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);

    Ok(true)
}

#[inline]
pub fn init_config(config: WaymarkConfig) -> Arc<WaymarkConfig> {
    use std::fs;

    if config.config_path.exists()
        && let Ok(content) = fs::read_to_string(&config.config_path)
    {
        let hash = crate::utils::hash::compute(content.as_bytes());
        CONFIG_HASH.store(hash, Ordering::Relaxed);
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_reload_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waymark.toml");
        std::fs::write(&path, "[resolver]\nsearch_path = [\"/apps\"]\n").unwrap();

        let config = WaymarkConfig::load_file(&path).unwrap();
        init_config(config);
        assert_eq!(cfg().resolver.search_path, vec!["/apps"]);

        // Unchanged content is not reloaded
        assert!(!reload_config().unwrap());

        std::fs::write(&path, "[resolver]\nsearch_path = [\"/libs\"]\n").unwrap();
        assert!(reload_config().unwrap());
        assert_eq!(cfg().resolver.search_path, vec!["/libs"]);
    }
}
