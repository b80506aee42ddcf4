//! Core types - pure abstractions shared across the codebase.

mod request;
mod url;

pub use request::{RequestContext, authority_url, default_port, request_key};
pub use url::{encode_path, is_url, normalize_path, split_suffix};
