//! Change-driven stage sequencing.
//!
//! A run has two phases, each gated on its own digest map:
//!
//! 1. Product files changed: fill missing combined vectors.
//! 2. Comment files changed: sentiment enrichment, then scoring, then rating
//!    aggregation. A fatal sentiment error stops the phase.
//!
//! Files the pipeline rewrites itself are re-recorded in the digest maps so its own
//! output does not trigger the next run.

mod error;


pub use error::{PipelineError, PipelineResult};

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::CategoryFiles;
use crate::config::{CatalogConfig, Config};
use crate::embedding::{CombineReport, CombineWeights, run_combine_stage};
use crate::ratings::{RatingsReport, run_ratings_stage};
use crate::scoring::{ScoringReport, run_scoring_stage};
use crate::sentiment::{BatchSentimentClient, SentimentClassifier, SentimentReport, run_sentiment_stage};
use crate::state::ChangeDetectionStore;

/// File-level outcome counts across every stage that ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files rewritten.
    pub processed: usize,
    /// Files left alone (missing, unchanged or nothing to do).
    pub skipped: usize,
    /// Files that could not be read or written.
    pub failed: usize,
}

impl RunSummary {
    fn add_combine(&mut self, report: &CombineReport, files: usize) {
        self.processed += report.files_updated;
        self.failed += report.files_failed;
        self.skipped += files.saturating_sub(report.files_updated + report.files_failed);
    }

    fn add_sentiment(&mut self, report: &SentimentReport, files: usize) {
        let failed = report.scan.files_failed.max(report.enrich.files_failed);
        self.processed += report.enrich.files_updated;
        self.failed += failed;
        self.skipped += files.saturating_sub(report.enrich.files_updated + failed);
    }

    fn add_scoring(&mut self, report: &ScoringReport, files: usize) {
        self.processed += report.files_updated;
        self.failed += report.files_failed;
        self.skipped += files.saturating_sub(report.files_updated + report.files_failed);
    }

    fn add_ratings(&mut self, report: &RatingsReport, files: usize) {
        self.processed += report.files_updated;
        self.failed += report.files_failed;
        self.skipped += files.saturating_sub(report.files_updated + report.files_failed);
    }
}

/// Everything one run did. Stages that did not run are `None`.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub changed_products: Vec<PathBuf>,
    pub changed_comments: Vec<PathBuf>,
    pub combine: Option<CombineReport>,
    pub sentiment: Option<SentimentReport>,
    pub scoring: Option<ScoringReport>,
    pub ratings: Option<RatingsReport>,
    pub summary: RunSummary,
}

impl PipelineReport {
    /// `true` if neither phase detected a change.
    pub fn is_noop(&self) -> bool {
        self.changed_products.is_empty() && self.changed_comments.is_empty()
    }
}

/// The batch job over every configured `(store, category)` pair.
pub struct Pipeline<C> {
    files: Vec<CategoryFiles>,
    weights: CombineWeights,
    product_state: PathBuf,
    comment_state: PathBuf,
    client: BatchSentimentClient<C>,
}

impl<C: SentimentClassifier> Pipeline<C> {
    pub fn new(
        files: Vec<CategoryFiles>,
        weights: CombineWeights,
        product_state: PathBuf,
        comment_state: PathBuf,
        client: BatchSentimentClient<C>,
    ) -> Self {
        Self {
            files,
            weights,
            product_state,
            comment_state,
            client,
        }
    }

    /// Builds a pipeline over every file the catalog declares.
    pub fn from_config(config: &Config, catalog: &CatalogConfig, client: BatchSentimentClient<C>) -> Self {
        Self::new(
            catalog.category_files(&config.root),
            catalog.combined,
            config.product_state_file(),
            config.comment_state_file(),
            client,
        )
    }

    pub fn files(&self) -> &[CategoryFiles] {
        &self.files
    }

    pub fn client(&self) -> &BatchSentimentClient<C> {
        &self.client
    }

    /// Runs both phases once.
    ///
    /// Digest maps are flushed right after detection. If the comment phase fails, the
    /// changed comment files are forgotten so the next run retries them.
    #[instrument(skip_all, fields(files = self.files.len()))]
    pub async fn run(&self) -> PipelineResult<PipelineReport> {
        let mut report = PipelineReport::default();
        let file_count = self.files.len();

        let mut product_state = ChangeDetectionStore::load(&self.product_state)?;
        let mut comment_state = ChangeDetectionStore::load(&self.comment_state)?;

        let product_paths: Vec<PathBuf> = self.files.iter().map(|f| f.products.clone()).collect();
        report.changed_products = product_state.changed_files(&product_paths);
        product_state.flush()?;

        if report.changed_products.is_empty() {
            info!("No product file changes");
        } else {
            info!(changed = report.changed_products.len(), "Product files changed");
            let combine = run_combine_stage(&self.files, self.weights);
            product_state.acknowledge(&combine.written);
            product_state.flush()?;
            report.summary.add_combine(&combine, file_count);
            report.combine = Some(combine);
        }

        let comment_paths: Vec<PathBuf> = self.files.iter().map(|f| f.comments.clone()).collect();
        report.changed_comments = comment_state.changed_files(&comment_paths);
        comment_state.flush()?;

        if report.changed_comments.is_empty() {
            info!("No comment file changes");
            return Ok(report);
        }

        info!(changed = report.changed_comments.len(), "Comment files changed");
        let sentiment = match run_sentiment_stage(&self.files, &self.client).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                warn!(error = %e, "Sentiment stage failed, stopping");
                comment_state.forget(&report.changed_comments);
                comment_state.flush()?;
                return Err(e.into());
            }
        };
        comment_state.acknowledge(&sentiment.enrich.written);
        comment_state.flush()?;
        report.summary.add_sentiment(&sentiment, file_count);
        report.sentiment = Some(sentiment);

        let scoring = run_scoring_stage(&self.files);
        product_state.acknowledge(&scoring.written);
        report.summary.add_scoring(&scoring, file_count);
        report.scoring = Some(scoring);

        let ratings = run_ratings_stage(&self.files);
        product_state.acknowledge(&ratings.written);
        report.summary.add_ratings(&ratings, file_count);
        report.ratings = Some(ratings);

        product_state.flush()?;

        info!(
            processed = report.summary.processed,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "Pipeline run complete"
        );

        Ok(report)
    }
}
