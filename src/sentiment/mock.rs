use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::client::{BatchItem, ClassifiedItem, SentimentClassifier, parse_classifier_response};
use super::error::{SentimentError, SentimentResult};
use super::types::{SentimentClass, SentimentTuple};

const POSITIVE_WORDS: &[&str] = &["harika", "güzel", "mükemmel", "rahat", "iyi", "great", "good"];
const NEGATIVE_WORDS: &[&str] = &["kötü", "berbat", "bozuk", "iade", "bad", "broken"];

/// Deterministic classifier for tests.
///
/// Texts containing a positive keyword score positive, a negative keyword score
/// negative, anything else neutral. Failures and raw responses can be scripted.
#[derive(Default)]
pub struct MockSentimentClassifier {
    fail_times: AtomicU32,
    calls: AtomicU32,
    batch_sizes: Mutex<Vec<usize>>,
    succeed_limit: Option<u32>,
    raw_response: Option<String>,
    omitted_ids: Vec<String>,
}

impl MockSentimentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `times` calls with a protocol error.
    pub fn with_failures(self, times: u32) -> Self {
        self.fail_times.store(times, Ordering::SeqCst);
        self
    }

    /// Fails every call after the first `calls` calls.
    pub fn failing_after(mut self, calls: u32) -> Self {
        self.succeed_limit = Some(calls);
        self
    }

    /// Answers every call by parsing `raw` instead of classifying.
    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }

    /// Leaves `id` out of every response.
    pub fn omitting(mut self, id: impl Into<String>) -> Self {
        self.omitted_ids.push(id.into());
        self
    }

    /// Number of `classify` calls, including failed ones.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sizes of every batch received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }

    /// The annotation this mock produces for `text`.
    pub fn expected(text: &str) -> SentimentTuple {
        let lower = text.to_lowercase();
        if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
            SentimentTuple::new(0.8, 0.7, 0.6, SentimentClass::Positive)
        } else if NEGATIVE_WORDS.iter().any(|w| lower.contains(w)) {
            SentimentTuple::new(-0.7, 0.6, 0.5, SentimentClass::Negative)
        } else {
            SentimentTuple::new(0.0, 0.1, 0.1, SentimentClass::Neutral)
        }
    }

    fn respond(&self, batch: &[BatchItem]) -> SentimentResult<Vec<ClassifiedItem>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batch_sizes.lock().push(batch.len());

        if self.succeed_limit.is_some_and(|limit| call > limit) {
            return Err(SentimentError::protocol("scripted failure"));
        }

        let remaining = self.fail_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_times.store(remaining - 1, Ordering::SeqCst);
            return Err(SentimentError::protocol("scripted failure"));
        }

        if let Some(raw) = &self.raw_response {
            return parse_classifier_response(raw);
        }

        Ok(batch
            .iter()
            .filter(|item| !self.omitted_ids.contains(&item.id))
            .map(|item| ClassifiedItem {
                id: item.id.clone(),
                sentiment: Self::expected(&item.text),
            })
            .collect())
    }
}

impl SentimentClassifier for MockSentimentClassifier {
    fn model_id(&self) -> &str {
        "mock-sentiment"
    }

    async fn classify(&self, batch: &[BatchItem]) -> SentimentResult<Vec<ClassifiedItem>> {
        self.respond(batch)
    }
}
