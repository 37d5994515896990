use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by JSON document storage.
pub enum StorageError {
    /// Reading or writing the file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid JSON for the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be encoded as JSON.
    #[error("failed to serialize {path}: {source}")]
    Serialization {
        /// Destination file.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The temp file could not be renamed over the destination.
    #[error("write failed for {path}: {reason}")]
    WriteFailed {
        /// Destination file.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
}

impl StorageError {
    /// Returns `true` for parse failures (the file exists but is malformed).
    pub fn is_parse(&self) -> bool {
        matches!(self, StorageError::Parse { .. })
    }
}

/// Convenience result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
