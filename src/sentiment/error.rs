use std::path::PathBuf;
use thiserror::Error;

use crate::retry::{RetryError, Retryable};
use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned by sentiment classification and caching.
pub enum SentimentError {
    /// No API key is configured for the classifier service.
    #[error(
        "no sentiment API key configured (set PRICELENS_SENTIMENT_API_KEY, GEMINI_API_KEY or GOOGLE_API_KEY)"
    )]
    MissingCredentials,

    /// The HTTP request could not be completed (connect, timeout, body read).
    #[error("sentiment request to '{url}' failed: {message}")]
    Request {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("sentiment service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The response was not a valid classification array for the batch.
    #[error("invalid sentiment response: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },

    /// Every retry of a batch failed.
    #[error("sentiment batch failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: Box<SentimentError>,
    },

    /// The cache file exists but could not be parsed.
    #[error("sentiment cache at {path} is corrupt: {reason}")]
    CorruptCache {
        /// Cache file.
        path: PathBuf,
        /// Parse failure.
        reason: String,
    },

    /// Reading or writing the cache or a comment file failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SentimentError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        SentimentError::Protocol {
            message: message.into(),
        }
    }
}

impl Retryable for SentimentError {
    fn is_retryable(&self) -> bool {
        match self {
            SentimentError::Request { .. } | SentimentError::Protocol { .. } => true,
            SentimentError::Status { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            _ => false,
        }
    }
}

impl From<RetryError<SentimentError>> for SentimentError {
    fn from(err: RetryError<SentimentError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => SentimentError::RetriesExhausted {
                attempts,
                source: Box::new(last),
            },
            RetryError::Aborted(e) => e,
        }
    }
}

/// Convenience result type for sentiment operations.
pub type SentimentResult<T> = Result<T, SentimentError>;
