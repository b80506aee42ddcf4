//! `[mapping]` section configuration.
//!
//! Sources of rewrite rules besides the map-root tree in the content store.
//!
//! # Example
//!
//! ```toml
//! [mapping]
//! root = "/etc/map"            # Rule tree in the default workspace
//! mappings = ["/content/:/"]   # internal:external, `>` inbound, `<` outbound
//! vanity_paths = true          # Honor vanity path properties on content
//!
//! [mapping.virtual]
//! "/home" = "/content/home.html"
//!
//! [mapping.properties]
//! match = "waymark:match"
//! ```

use crate::config::ConfigDiagnostics;
use crate::mapping::MappingRule;
use macros::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rewrite rule sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Config)]
#[serde(default)]
#[config(section = "mapping")]
pub struct MappingConfig {
    /// Content path of the rule tree.
    #[config(default = "/etc/map", inline_doc)]
    pub root: String,

    /// Path mappings as `internal<op>external`.
    /// `:` works both ways, `>` only for resolving, `<` only for mapping.
    #[config(default = "[\"/:/\"]")]
    pub mappings: Vec<String>,

    /// Register vanity paths declared on content nodes.
    #[config(default = "true", inline_doc)]
    pub vanity_paths: bool,

    /// Exact external URL path to internal path pairs.
    #[serde(rename = "virtual")]
    #[config(name = "virtual", status = hidden)]
    pub virtual_urls: BTreeMap<String, String>,

    /// Names of the properties read from the rule tree and from content.
    /// Written to the template as its own `[mapping.properties]` table.
    #[config(sub_config)]
    #[config(status = hidden)]
    pub properties: PropertyNames,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            root: "/etc/map".to_string(),
            mappings: vec!["/:/".to_string()],
            vanity_paths: true,
            virtual_urls: BTreeMap::new(),
            properties: PropertyNames::default(),
        }
    }
}

impl MappingConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.root.starts_with('/') {
            diag.error_with_hint(
                Self::FIELDS.root,
                format!("map root `{}` is not an absolute path", self.root),
                "use a path such as \"/etc/map\"",
            );
        }

        for mapping in &self.mappings {
            if let Err(err) = MappingRule::parse(mapping) {
                diag.error(Self::FIELDS.mappings, err.to_string());
            }
        }

        for (external, internal) in &self.virtual_urls {
            if external.trim().is_empty() || internal.trim().is_empty() {
                diag.error(
                    Self::FIELDS.virtual_urls,
                    format!("virtual entry `{external}` = `{internal}` has an empty side"),
                );
            }
        }
    }
}

/// Property names understood by the rule loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Config)]
#[serde(default)]
#[config(section = "mapping.properties")]
pub struct PropertyNames {
    /// Rule-tree key segment overriding the node name.
    #[serde(rename = "match")]
    #[config(name = "match")]
    #[config(default = "waymark:match")]
    pub match_key: String,

    /// External redirect target of a rule node.
    #[config(default = "waymark:redirect")]
    pub redirect: String,

    /// Internal rewrite targets of a rule node.
    #[config(default = "waymark:internalRedirect")]
    pub internal_redirect: String,

    /// Redirect status code.
    #[config(default = "waymark:status")]
    pub status: String,

    /// Vanity paths declared on a content node.
    #[config(default = "waymark:vanityPath")]
    pub vanity_path: String,

    /// Whether a vanity path answers with a redirect.
    #[config(default = "waymark:vanityRedirect")]
    pub vanity_redirect: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            match_key: "waymark:match".to_string(),
            redirect: "waymark:redirect".to_string(),
            internal_redirect: "waymark:internalRedirect".to_string(),
            status: "waymark:status".to_string(),
            vanity_path: "waymark:vanityPath".to_string(),
            vanity_redirect: "waymark:vanityRedirect".to_string(),
        }
    }
}
