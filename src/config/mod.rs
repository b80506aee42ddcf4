//! Configuration management for `waymark.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── resolver   # [resolver]
//! │   ├── mapping    # [mapping], [mapping.virtual], [mapping.properties]
//! │   └── store      # [store], [store.workspaces]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # WaymarkConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section                | Purpose                                     |
//! |------------------------|---------------------------------------------|
//! | `[resolver]`           | Search path, mangling, workspaces, aliases  |
//! | `[mapping]`            | Map root, path mappings, vanity paths       |
//! | `[mapping.virtual]`    | Exact URL to path pairs                     |
//! | `[mapping.properties]` | Property names of rule and content nodes    |
//! | `[store]`              | Default workspace and snapshot files        |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{MappingConfig, PropertyNames, ResolverConfig, StoreConfig};
pub use types::{
    ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config, reload_config,
};

use crate::log;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "waymark.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing waymark.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaymarkConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl WaymarkConfig {
    /// Find `config_name` by searching upward from cwd and load it.
    pub fn load(config_name: &Path) -> Result<Self> {
        let Some(path) = find_config_file(config_name) else {
            bail!(ConfigError::Validation(format!(
                "config file '{}' not found, run 'waymark init' to create one",
                config_name.display()
            )));
        };
        Self::load_file(&path)
    }

    /// Load and validate a specific config file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut config = Self::from_path(path)?;
        config.config_path = crate::utils::fs::normalize_path(path);
        config.root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("in {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            log!("warning"; "- {}", field);
        }
    }

    /// Join a path with the config directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Commented default config, as written by `waymark init`.
    pub fn template() -> String {
        [
            ResolverConfig::template_with_header(),
            MappingConfig::template_with_header(),
            PropertyNames::template_with_header(),
            StoreConfig::template_with_header(),
        ]
        .join("\n\n")
            + "\n"
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.resolver.validate_field_status(&mut diag);
        self.mapping.validate_field_status(&mut diag);
        self.store.validate_field_status(&mut diag);

        self.resolver.validate(&mut diag);
        self.mapping.validate(&mut diag);
        self.store.validate(&mut diag);
        self.validate_snapshots(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Snapshot files must exist once the config root is known.
    fn validate_snapshots(&self, diag: &mut ConfigDiagnostics) {
        if self.root.as_os_str().is_empty() {
            return;
        }
        for (workspace, file) in &self.store.workspaces {
            let path = crate::utils::fs::resolve_in(file, &self.root);
            if !path.exists() {
                diag.error_with_hint(
                    StoreConfig::FIELDS.workspaces,
                    format!(
                        "snapshot for workspace `{workspace}` not found: {}",
                        path.display()
                    ),
                    "paths are relative to the directory of waymark.toml",
                );
            }
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> WaymarkConfig {
    let (parsed, ignored) = WaymarkConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
