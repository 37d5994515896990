use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned when building a search query.
///
/// Running the search itself never fails; missing data yields an empty outcome.
pub enum SearchError {
    /// The query text or image could not be embedded.
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A precomputed query file does not exist.
    #[error("query file not found: {path}")]
    QueryNotFound { path: PathBuf },

    /// A precomputed query file could not be read or parsed.
    #[error("failed to read query: {0}")]
    Storage(#[from] StorageError),

    /// No query vector was supplied for any method.
    #[error("query has no vectors")]
    EmptyQuery,
}

/// Convenience result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
