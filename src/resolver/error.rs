//! Resolution errors.

use crate::mapping::MappingError;
use crate::store::{AccessError, StoreError};
use thiserror::Error;

/// Errors returned by [`ResolutionEngine`](super::ResolutionEngine) and
/// [`ResolverFactory`](super::ResolverFactory).
///
/// A path that matches nothing is not an error: `resolve` answers it with a
/// non-existing placeholder resource.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("rewrite rules for `{path}` still loop after {passes} passes")]
    RewriteLoop { path: String, passes: usize },

    #[error("rewrite produced malformed URL `{url}`")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid {language} query `{query}`: {message}")]
    QuerySyntax {
        query: String,
        language: String,
        message: String,
    },

    #[error("content store error")]
    Store(#[from] StoreError),

    #[error("workspace login failed")]
    Access(#[from] AccessError),

    #[error("building rewrite table failed")]
    Mapping(#[from] MappingError),

    #[error("resolver is already closed")]
    Closed,
}

impl ResolveError {
    /// Lift a store query failure, keeping syntax problems distinct.
    pub(crate) fn from_query(err: StoreError, statement: &str) -> Self {
        match err {
            StoreError::QuerySyntax {
                query,
                language,
                message,
            } => Self::QuerySyntax {
                query,
                language,
                message,
            },
            StoreError::UnsupportedLanguage(language) => Self::QuerySyntax {
                query: statement.to_string(),
                message: format!("unsupported query language `{language}`"),
                language,
            },
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_stay_distinct() {
        let err = ResolveError::from_query(
            StoreError::QuerySyntax {
                query: "[".into(),
                language: "path".into(),
                message: "bad".into(),
            },
            "[",
        );
        assert!(matches!(err, ResolveError::QuerySyntax { .. }));

        let err = ResolveError::from_query(StoreError::UnsupportedLanguage("sql".into()), "x");
        assert!(matches!(err, ResolveError::QuerySyntax { ref language, .. } if language == "sql"));

        let err = ResolveError::from_query(StoreError::Unavailable("down".into()), "/x");
        assert!(matches!(err, ResolveError::Store(_)));
    }

    #[test]
    fn test_loop_message() {
        let err = ResolveError::RewriteLoop {
            path: "/a".into(),
            passes: 100,
        };
        assert_eq!(
            err.to_string(),
            "rewrite rules for `/a` still loop after 100 passes"
        );
    }
}
