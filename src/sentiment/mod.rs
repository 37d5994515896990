//! Comment sentiment: digest-keyed cache, batched classification and enrichment.
//!
//! A run has three steps:
//! 1. [`collect_misses`] scans every comment file and queues texts the cache lacks.
//! 2. [`BatchSentimentClient::resolve`] sends the queue to the classifier in batches,
//!    storing and flushing results as each batch completes.
//! 3. [`enrich_comment_files`] writes cached annotations back into the comment files.

pub mod batch;
pub mod cache;
pub mod client;
pub mod enrich;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod types;


pub use batch::{BatchConfig, BatchSentimentClient, MissQueue, ResolveReport};
pub use cache::{SentimentCache, SentimentCacheEntry, SentimentCacheHandle};
pub use client::{
    BatchItem, ClassifiedItem, HttpSentimentClassifier, SentimentClassifier, extract_json_array,
    parse_classifier_response,
};
pub use enrich::{EnrichReport, ScanReport, collect_misses, enrich_comment_files};
pub use error::{SentimentError, SentimentResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSentimentClassifier;
pub use types::{SentimentClass, SentimentTuple};

use tracing::{info, instrument, warn};

use crate::catalog::CategoryFiles;

/// Outcome of a full sentiment stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentimentReport {
    pub scan: ScanReport,
    pub resolve: ResolveReport,
    pub enrich: EnrichReport,
}

/// Runs scan, resolve and enrich over `files`.
///
/// Exhausted retries, missing credentials and cache write failures are returned as
/// errors. Unreadable comment files are skipped.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn run_sentiment_stage<C: SentimentClassifier>(
    files: &[CategoryFiles],
    client: &BatchSentimentClient<C>,
) -> SentimentResult<SentimentReport> {
    let (queue, scan) = {
        let cache = client.cache().lock();
        collect_misses(files, &cache)
    };

    if scan.files_found == 0 {
        warn!("No comment files found, nothing to enrich");
        return Ok(SentimentReport {
            scan,
            ..SentimentReport::default()
        });
    }

    let resolve = client.resolve(queue).await?;

    let enrich = {
        let cache = client.cache().lock();
        enrich_comment_files(files, &cache)
    };

    info!(
        misses = resolve.requested,
        resolved = resolve.resolved,
        files_updated = enrich.files_updated,
        "Sentiment stage complete"
    );

    Ok(SentimentReport {
        scan,
        resolve,
        enrich,
    })
}
