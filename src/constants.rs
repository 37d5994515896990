//! Cross-cutting, shared constants.
//!
//! Scoring weights and RRF parameters are fixed: changing one changes every
//! persisted score.

/// Unique cache misses per classifier request.
pub const DEFAULT_BATCH_SIZE: usize = 5;
/// In-flight classifier requests.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 1;
/// Pause between consecutive batches (rate limiting).
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 200;
/// Per-request timeout for the sentiment service.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 1.5;

/// Schema version written into every sentiment cache entry.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_SENTIMENT_MODEL: &str = "models/gemini-1.5-flash";

/// Reciprocal rank fusion smoothing constant.
pub const DEFAULT_RRF_K: f64 = 60.0;
/// Result-count bound for search.
pub const DEFAULT_TOP_N: usize = 3;

pub const WEIGHT_SENTIMENT: f64 = 0.40;
pub const WEIGHT_RATING: f64 = 0.30;
pub const WEIGHT_VALUE: f64 = 0.30;
pub const WEIGHT_RATING_NO_SENTIMENT: f64 = 0.50;
pub const WEIGHT_VALUE_NO_SENTIMENT: f64 = 0.50;

/// Confidence never drops below this, however few comments a product has.
pub const MIN_CONFIDENCE: f64 = 0.2;
/// Scale applied to `rating / price` before normalization.
pub const VALUE_SCALE: f64 = 1000.0;
/// Upper bound of the rating scale.
pub const MAX_RATING: f64 = 5.0;

pub const DEFAULT_CLIP_WEIGHT: f64 = 0.6;
pub const DEFAULT_TEXT_CLIP_WEIGHT: f64 = 0.4;

pub const PRODUCT_STATE_FILENAME: &str = "product_hashes.json";
pub const COMMENT_STATE_FILENAME: &str = "comment_hashes.json";
