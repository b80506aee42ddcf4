//! `[store]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [store]
//! default_workspace = "default"
//!
//! [store.workspaces]
//! default = "content/default.json"
//! archive = "~/snapshots/archive.json"
//! ```

use crate::config::ConfigDiagnostics;
use macros::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Content snapshots loaded into the in-memory repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Config)]
#[serde(default)]
#[config(section = "store")]
pub struct StoreConfig {
    /// Workspace used when a request names none.
    #[config(default = "default", inline_doc)]
    pub default_workspace: String,

    /// Snapshot file per workspace (relative to the config file).
    #[config(status = hidden)]
    pub workspaces: BTreeMap<String, PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_workspace: "default".to_string(),
            workspaces: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.default_workspace.trim().is_empty() {
            diag.error(Self::FIELDS.default_workspace, "workspace name is empty");
        }
        if !self.workspaces.is_empty() && !self.workspaces.contains_key(&self.default_workspace) {
            diag.error_with_hint(
                Self::FIELDS.workspaces,
                format!(
                    "no snapshot for the default workspace `{}`",
                    self.default_workspace
                ),
                format!(
                    "add `{} = \"<file>.json\"` under [store.workspaces]",
                    self.default_workspace
                ),
            );
        }
    }
}
