use std::path::PathBuf;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned when reading or writing storefront catalog files.
pub enum CatalogError {
    /// A category's product list does not exist.
    #[error("product file not found: {path}")]
    ProductsNotFound {
        /// Expected location.
        path: PathBuf,
    },

    /// A category's comment map does not exist.
    #[error("comment file not found: {path}")]
    CommentsNotFound {
        /// Expected location.
        path: PathBuf,
    },

    /// Underlying read, parse or write failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    /// Returns `true` if the file is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::ProductsNotFound { .. } | CatalogError::CommentsNotFound { .. }
        )
    }
}

/// Convenience result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
