//! Rewrite tables.
//!
//! A [`RewriteTable`] holds two ordered entry lists: the *resolve* view turns
//! request keys (`http/host.80/path`) into content paths, the *map* view turns
//! content paths back into URLs. Tables are immutable; a rebuild publishes a
//! whole new generation through [`TableHolder`].
//!
//! ```text
//! config mappings ─┐
//! virtual urls ────┤
//! map-root tree ───┼─> RuleLoader ─> RewriteTable ─> TableHolder (ArcSwap)
//! vanity paths ────┘
//! ```

mod entry;
mod holder;
mod key;
mod loader;
mod rule;
mod table;

pub use entry::RewriteEntry;
pub use holder::{Reloader, TableHolder};
pub use key::{fix_key_port, is_regex, key_to_url};
pub use loader::RuleLoader;
pub use rule::MappingRule;
pub use table::RewriteTable;

use crate::store::StoreError;
use thiserror::Error;

/// Matches the `scheme/host.port` head of any request key.
pub const ANY_SCHEME_HOST: &str = "[^/]+/[^/]+";

/// Status used for redirects that do not name one.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// Errors raised while building rewrite entries.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid rewrite pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid mapping `{0}`: {1}")]
    Rule(String, &'static str),

    #[error("reading rewrite rules failed")]
    Store(#[from] StoreError),
}
