//! Namespace prefix mangling.
//!
//! `/jcr:content` is not pleasant in a URL, so mapped paths carry
//! `/_jcr_content` instead and resolution turns it back.

use crate::log;
use crate::store::ContentStore;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static MANGLE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"/([^:/]+):"));

static UNMANGLE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"/_([^_/]+)_"));

/// Bidirectional `/prefix:name` <-> `/_prefix_name` transform.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceMangler {
    enabled: bool,
}

impl NamespaceMangler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `/prefix:` segments become `/_prefix_`.
    pub fn mangle(&self, path: &str) -> String {
        if !self.enabled || !path.contains(':') {
            return path.to_string();
        }
        match MANGLE.as_ref() {
            Ok(re) => re.replace_all(path, "/_${1}_").into_owned(),
            Err(err) => {
                log!("warning"; "namespace mangling unavailable: {}", err);
                path.to_string()
            }
        }
    }

    /// `/_prefix_` segments become `/prefix:` when `prefix` is a namespace
    /// registered in `store`.
    pub fn unmangle(&self, path: &str, store: &dyn ContentStore) -> String {
        if !self.enabled || !path.contains("/_") {
            return path.to_string();
        }
        let re = match UNMANGLE.as_ref() {
            Ok(re) => re,
            Err(err) => {
                log!("warning"; "namespace unmangling unavailable: {}", err);
                return path.to_string();
            }
        };
        re.replace_all(path, |caps: &Captures<'_>| {
            let prefix = &caps[1];
            match store.namespace_uri(prefix) {
                Ok(_) => format!("/{prefix}:"),
                Err(crate::store::StoreError::NamespaceNotFound(_)) => caps[0].to_string(),
                Err(err) => {
                    log!("warning"; "cannot check namespace `{}`, keeping `{}`: {}", prefix, &caps[0], err);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
    }
}
