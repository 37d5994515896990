//! Product scoring.
//!
//! Each `(store, category)` product list is scored as one batch: value and confidence
//! are relative to the other products in the same file. The final score is
//!
//! ```text
//! with sentiment:    (0.40 * sentiment + 0.30 * rating + 0.30 * value) * confidence
//! without sentiment: (0.50 * rating + 0.50 * value) * confidence
//! ```
//!
//! rounded to four decimals. Products without comments keep their previous score.

pub mod formula;

#[cfg(test)]
mod tests;

pub use formula::{
    combine, confidence, normalize_min_max, normalized_rating, round_to, sentiment_score,
    value_score,
};

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::catalog::{CategoryFiles, Comment, CommentMap, Product, ScoreMetadata, save_products};

/// Counts from scoring one product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryScoreReport {
    pub scored: usize,
    /// Products with no usable comments (score left untouched).
    pub skipped_no_comments: usize,
    /// Products without an id.
    pub skipped_no_id: usize,
    pub with_sentiment: usize,
    pub without_sentiment: usize,
}

/// Scores every product in `products` against its comments, in place.
pub fn score_category(products: &mut [Product], comments: &CommentMap) -> CategoryScoreReport {
    let mut report = CategoryScoreReport::default();

    let ids: Vec<&str> = products.iter().filter_map(Product::id).collect();
    let raw_values: Vec<f64> = products
        .iter()
        .filter(|p| p.id().is_some())
        .map(|p| value_score(p.rating_value(), p.price_value()))
        .collect();
    let value_norm: HashMap<&str, f64> = ids
        .iter()
        .copied()
        .zip(normalize_min_max(&raw_values))
        .collect();

    let max_comment_count = ids
        .iter()
        .map(|id| comments.get(id).len())
        .max()
        .unwrap_or(0);

    let mut updates: Vec<(usize, f64, ScoreMetadata)> = Vec::new();

    for (index, product) in products.iter().enumerate() {
        let Some(id) = product.id() else {
            report.skipped_no_id += 1;
            continue;
        };

        let valid: Vec<&Comment> = comments
            .get(id)
            .iter()
            .filter(|c| !c.is_blank_record())
            .collect();
        if valid.is_empty() {
            debug!(product = id, "No comments, skipping");
            report.skipped_no_comments += 1;
            continue;
        }

        let rating_norm = normalized_rating(product.rating_value());
        let value = value_norm.get(id).copied().unwrap_or(0.0);
        let sentiment = sentiment_score(valid.iter().copied());
        let weight = confidence(valid.len(), max_comment_count);
        let score = round_to(combine(sentiment, rating_norm, value) * weight, 4);

        match sentiment {
            Some(_) => report.with_sentiment += 1,
            None => report.without_sentiment += 1,
        }

        let metadata = ScoreMetadata {
            avg_sentiment: round_to(sentiment.unwrap_or(0.0), 3),
            normalized_rating: round_to(rating_norm, 3),
            value_score_norm: round_to(value, 3),
            confidence: round_to(weight, 3),
            comment_count: valid.len() as u64,
            has_sentiment: sentiment.is_some(),
            extra: product
                .score_metadata
                .as_ref()
                .map(|m| m.extra.clone())
                .unwrap_or_default(),
        };
        updates.push((index, score, metadata));
    }

    for (index, score, metadata) in updates {
        let product = &mut products[index];
        product.score = Some(score);
        product.score_metadata = Some(metadata);
        report.scored += 1;
    }

    report
}

/// Counts from a scoring pass over many files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringReport {
    /// Files that had at least one product scored.
    pub files_updated: usize,
    /// Files skipped because the product or comment file was missing or unreadable.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub products: CategoryScoreReport,
    /// Product files that were rewritten.
    pub written: Vec<PathBuf>,
}

/// Scores every `(store, category)` pair and writes results atomically.
#[instrument(skip_all, fields(files = files.len()))]
pub fn run_scoring_stage(files: &[CategoryFiles]) -> ScoringReport {
    let mut report = ScoringReport::default();

    for file in files {
        let loaded = file
            .load_products()
            .and_then(|products| Ok((products, file.load_comments()?)));

        let (mut products, comments) = match loaded {
            Ok(loaded) => loaded,
            Err(e) if e.is_not_found() => {
                debug!(file = %file.label(), error = %e, "Missing product or comment file, skipping");
                report.files_skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Unreadable category files, skipping");
                report.files_skipped += 1;
                continue;
            }
        };

        let category = score_category(&mut products, &comments);
        debug!(
            file = %file.label(),
            scored = category.scored,
            with_sentiment = category.with_sentiment,
            without_sentiment = category.without_sentiment,
            "Category scored"
        );
        let updated = category.scored > 0;
        accumulate(&mut report.products, &category);

        if !updated {
            continue;
        }

        match save_products(&file.products, &products) {
            Ok(()) => {
                report.files_updated += 1;
                report.written.push(file.products.clone());
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Failed to write scores");
                report.files_failed += 1;
            }
        }
    }

    info!(
        scored = report.products.scored,
        skipped = report.products.skipped_no_comments,
        files_updated = report.files_updated,
        "Scoring complete"
    );

    report
}

fn accumulate(total: &mut CategoryScoreReport, category: &CategoryScoreReport) {
    total.scored += category.scored;
    total.skipped_no_comments += category.skipped_no_comments;
    total.skipped_no_id += category.skipped_no_id;
    total.with_sentiment += category.with_sentiment;
    total.without_sentiment += category.without_sentiment;
}
