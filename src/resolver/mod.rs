//! Resolution and mapping.
//!
//! [`ResolutionEngine::resolve`] turns a request path into a [`Resource`];
//! [`ResolutionEngine::map`] turns a content path back into a URL. Engines
//! are handed out by a [`ResolverFactory`], which owns everything they share.
//!
//! ```text
//! resolve:  unmangle ─> workspace? ─> rewrite loop ─> search path ─> PathIterator/alias ─> decorate
//! map:      split suffix ─> workspace? ─> resolve_direct ─> alias walk ─> map view ─> mangle/encode
//! ```

mod alias;
mod decorate;
mod engine;
mod error;
mod factory;
mod mangle;
mod path_iter;
mod resource;
mod workspace;


pub use alias::AliasResolver;
pub use decorate::{DecoratorChain, DecoratorId, ResourceDecorator};
pub use engine::ResolutionEngine;
pub use error::ResolveError;
pub use factory::ResolverFactory;
pub use mangle::NamespaceMangler;
pub use path_iter::{PathCandidates, path_candidates};
pub use resource::{Resource, ResourceKind, ResourceMetadata};

/// Upper bound on rewrite passes for a single `resolve` call.
pub const MAX_REWRITE_PASSES: usize = 100;
