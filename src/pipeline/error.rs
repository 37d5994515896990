use thiserror::Error;

use crate::sentiment::SentimentError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Fatal errors that stop a pipeline run.
///
/// Per-file problems are logged and counted in the run summary instead.
pub enum PipelineError {
    /// A change-detection state file could not be read or written.
    #[error("pipeline state error: {0}")]
    State(#[from] StorageError),

    /// Sentiment enrichment failed (exhausted retries, cache write failure).
    #[error("sentiment stage failed: {0}")]
    Sentiment(#[from] SentimentError),
}

impl PipelineError {
    /// Returns `true` if the classifier gave up after retrying.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(
            self,
            PipelineError::Sentiment(SentimentError::RetriesExhausted { .. })
        )
    }
}

/// Convenience result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;
