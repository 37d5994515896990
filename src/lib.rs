//! Pricelens library crate (used by the batch binary and integration tests).
//!
//! # Public API Surface
//!
//! The exports are organized by module:
//!
//! ## Pipeline
//! - [`Pipeline`], [`PipelineReport`], [`RunSummary`] - Change-driven stage runner
//! - [`ChangeDetectionStore`] - Per-file digest tracking
//!
//! ## Stages
//! - [`BatchSentimentClient`], [`SentimentCache`] - Cached, batched comment sentiment
//! - [`run_scoring_stage`], [`score_category`] - Product scoring
//! - [`run_ratings_stage`], [`RatingSummary`] - Rating aggregation from comments
//! - [`run_combine_stage`], [`CombineWeights`] - Combined image/text vectors
//!
//! ## Search
//! - [`SearchEngine`], [`QueryVectors`], [`SearchOutcome`] - Multi-vector product search
//! - [`reciprocal_rank_fusion`] - Rank fusion across embedding methods
//!
//! ## Catalog & Configuration
//! - [`Product`], [`Comment`], [`CommentMap`], [`CategoryFiles`] - Storefront files
//! - [`Config`], [`CatalogConfig`] - Environment and TOML settings
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod pipeline;
pub mod ratings;
pub mod retry;
pub mod scoring;
pub mod search;
pub mod sentiment;
pub mod state;
pub mod storage;

pub use catalog::{
    CatalogError, CatalogResult, CategoryFiles, Comment, CommentMap, Numeric, Product,
    ProductList, RatingStats, ScoreMetadata, next_category_id, next_product_id,
};
pub use config::{CatalogConfig, CategoryConfig, Config, ConfigError, ShopConfig};
pub use embedding::{
    CombineReport, CombineWeights, Embedder, EmbeddingError, EmbeddingMethod, EmbeddingResult,
    run_combine_stage,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use hashing::{digest, digest_text, normalize_text};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, PipelineResult, RunSummary};
pub use ratings::{RatingSummary, RatingsReport, run_ratings_stage, update_category_ratings};
pub use retry::{RetryError, RetryPolicy, Retryable};
pub use scoring::{CategoryScoreReport, ScoringReport, run_scoring_stage, score_category};
pub use search::{
    Candidate, FusedResult, MethodHit, QueryVectors, Resolution, SearchEngine, SearchError,
    SearchOutcome, SearchResult, Variant, reciprocal_rank_fusion,
};
#[cfg(any(test, feature = "mock"))]
pub use sentiment::MockSentimentClassifier;
pub use sentiment::{
    BatchConfig, BatchSentimentClient, HttpSentimentClassifier, SentimentCache,
    SentimentCacheHandle, SentimentClass, SentimentClassifier, SentimentError, SentimentReport,
    SentimentResult, SentimentTuple, run_sentiment_stage,
};
pub use state::ChangeDetectionStore;
pub use storage::{StorageError, StorageResult};
