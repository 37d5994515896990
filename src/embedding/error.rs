use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by embedding producers and vector arithmetic.
pub enum EmbeddingError {
    /// The input cannot be embedded (missing image, empty text).
    #[error("invalid embedding input: {reason}")]
    InvalidInput { reason: String },

    /// An image path does not exist or is not a file.
    #[error("image not found: {path}")]
    ImageNotFound { path: PathBuf },

    /// The vector has zero length or zero norm and cannot be normalized.
    #[error("vector has zero norm")]
    ZeroNorm,

    /// The producer failed.
    #[error("embedding inference failed: {reason}")]
    InferenceFailed { reason: String },
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
