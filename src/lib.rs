//! Resolution and mapping engine for hierarchical content stores.
//!
//! Incoming request paths are resolved to resources in a content store, and
//! content paths are mapped back to the URLs that reach them. Both directions
//! are driven by one rewrite table built from configuration and a map root in
//! the store.

pub mod config;
pub mod core;
pub mod logger;
pub mod mapping;
pub mod resolver;
pub mod store;
pub mod utils;
