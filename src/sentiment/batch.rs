use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tracing::{debug, info, warn};

use super::cache::{SentimentCache, SentimentCacheHandle};
use super::client::{BatchItem, ClassifiedItem, SentimentClassifier};
use super::error::{SentimentError, SentimentResult};
use crate::constants::{
    DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENT_BATCHES,
};
use crate::hashing::digest_text;
use crate::retry::RetryPolicy;

/// Unique cache misses waiting to be classified.
///
/// Deduplicated by text digest; the first text seen for a digest is the one sent.
/// Insertion order is preserved.
#[derive(Debug, Clone, Default)]
pub struct MissQueue {
    items: Vec<BatchItem>,
    seen: HashSet<String>,
}

impl MissQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `text` unless it is blank, already cached, or already queued.
    ///
    /// Returns `true` if the text was queued.
    pub fn enqueue_miss(&mut self, text: &str, cache: &SentimentCache) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let id = digest_text(text);
        if cache.contains_digest(&id) || self.seen.contains(&id) {
            return false;
        }

        self.seen.insert(id.clone());
        self.items.push(BatchItem {
            id,
            text: text.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queued items in insertion order.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Splits the queue into consecutive batches of at most `batch_size` items.
    pub fn into_batches(self, batch_size: usize) -> Vec<Vec<BatchItem>> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(self.items.len().div_ceil(batch_size));
        let mut items = self.items.into_iter().peekable();
        while items.peek().is_some() {
            batches.push(items.by_ref().take(batch_size).collect());
        }
        batches
    }
}

/// Batching, concurrency and retry settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    /// Items per request. Default: `5`.
    pub batch_size: usize,
    /// Batches in flight at once. Default: `1`.
    pub max_concurrent: usize,
    /// Wait after each completed batch. Default: `200ms`.
    pub pause: Duration,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT_BATCHES,
            pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
            retry: RetryPolicy::default(),
        }
    }
}

/// Counts from one [`BatchSentimentClient::resolve`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Unique texts submitted.
    pub requested: usize,
    /// New cache entries written.
    pub resolved: usize,
    /// Requested ids the service did not answer for.
    pub unanswered: usize,
    /// Batches sent (successful ones).
    pub batches: usize,
}

/// Sends cache misses to a [`SentimentClassifier`] in bounded batches.
///
/// Results are written to the cache, and the cache is flushed, as soon as each batch
/// completes. A batch that exhausts its retries fails the whole call.
pub struct BatchSentimentClient<C> {
    classifier: Arc<C>,
    cache: SentimentCacheHandle,
    config: BatchConfig,
}

impl<C: SentimentClassifier> BatchSentimentClient<C> {
    pub fn new(classifier: Arc<C>, cache: SentimentCacheHandle, config: BatchConfig) -> Self {
        Self {
            classifier,
            cache,
            config,
        }
    }

    /// Returns the shared cache handle.
    pub fn cache(&self) -> &SentimentCacheHandle {
        &self.cache
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Classifies every queued miss and stores the results.
    pub async fn resolve(&self, queue: MissQueue) -> SentimentResult<ResolveReport> {
        let mut report = ResolveReport {
            requested: queue.len(),
            ..ResolveReport::default()
        };

        if queue.is_empty() {
            debug!("No sentiment cache misses");
            return Ok(report);
        }

        let batches = queue.into_batches(self.config.batch_size);
        let total = batches.len();
        info!(
            misses = report.requested,
            batches = total,
            batch_size = self.config.batch_size,
            max_concurrent = self.config.max_concurrent,
            "Resolving sentiment cache misses"
        );

        let classifier = self.classifier.as_ref();
        let retry = self.config.retry;

        let mut in_flight = stream::iter(batches.into_iter().enumerate())
            .map(|(index, items)| async move {
                let outcome = retry
                    .run("sentiment_batch", |attempt| {
                        debug!(batch = index + 1, attempt, size = items.len(), "Sending batch");
                        classifier.classify(&items)
                    })
                    .await;
                (index, items, outcome)
            })
            .buffer_unordered(self.config.max_concurrent.max(1));

        let mut completed = 0;
        while let Some((index, items, outcome)) = in_flight.next().await {
            let classified = outcome.map_err(SentimentError::from)?;
            self.store_batch(&items, classified, &mut report)?;
            completed += 1;

            info!(batch = index + 1, total, size = items.len(), "Batch stored");

            if completed < total && !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }
        }

        info!(
            resolved = report.resolved,
            unanswered = report.unanswered,
            cache_entries = self.cache.len(),
            "Sentiment cache misses resolved"
        );

        Ok(report)
    }

    fn store_batch(
        &self,
        items: &[BatchItem],
        classified: Vec<ClassifiedItem>,
        report: &mut ResolveReport,
    ) -> SentimentResult<()> {
        let mut by_id: HashMap<String, ClassifiedItem> = classified
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let mut cache = self.cache.lock();
        for item in items {
            match by_id.remove(&item.id) {
                Some(result) => {
                    if cache.insert(&item.text, result.sentiment, self.classifier.model_id()) {
                        report.resolved += 1;
                    }
                }
                None => {
                    warn!(id = %item.id, "No result for id in batch response, leaving uncached");
                    report.unanswered += 1;
                }
            }
        }

        if !by_id.is_empty() {
            debug!(extra = by_id.len(), "Ignoring response items for ids not in the batch");
        }

        cache.flush()?;
        report.batches += 1;
        Ok(())
    }
}
