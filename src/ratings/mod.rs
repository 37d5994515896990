//! Product ratings recomputed from the star ratings on their comments.


use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::catalog::{CategoryFiles, Comment, CommentMap, Numeric, Product, RatingStats, save_products};
use crate::scoring::round_to;

/// Aggregate of the positive star ratings in one comment list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingSummary {
    /// Mean rating rounded to two decimals, `0` when nothing was rated.
    pub average: f64,
    pub count: u64,
    pub stats: RatingStats,
}

impl RatingSummary {
    /// Summarizes ratings that are JSON numbers greater than zero.
    pub fn from_comments(comments: &[Comment]) -> Self {
        let ratings: Vec<f64> = comments
            .iter()
            .filter_map(Comment::rating_value)
            .filter(|r| *r > 0.0)
            .collect();

        if ratings.is_empty() {
            return Self::default();
        }

        let sum: f64 = ratings.iter().sum();
        let min = ratings.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            average: round_to(sum / ratings.len() as f64, 2),
            count: ratings.len() as u64,
            stats: RatingStats { min, max, ratings },
        }
    }

    /// Writes the summary onto `product`. Returns `true` if any field changed.
    fn apply(self, product: &mut Product) -> bool {
        let rating = Numeric::from_f64(self.average);
        let rating_changed = product.rating_value() != Some(self.average)
            || !matches!(product.rating, Some(Numeric::Number(_)));

        let mut changed = rating_changed
            || product.rating_count != Some(self.count)
            || product.rating_stats.as_ref() != Some(&self.stats);

        if rating_changed {
            product.rating = rating;
        }
        product.rating_count = Some(self.count);
        product.rating_stats = Some(self.stats);

        if let Some(meta) = product.score_metadata.as_mut()
            && meta.comment_count != self.count
        {
            meta.comment_count = self.count;
            changed = true;
        }

        changed
    }
}

/// Counts from refreshing one product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRatingReport {
    /// Products with comments whose rating fields were recomputed.
    pub updated: usize,
    /// Products with an empty or missing comment list.
    pub no_comments: usize,
    pub skipped_no_id: usize,
    /// Products whose stored fields actually differed.
    pub changed: usize,
}

/// Recomputes `rating`, `rating_count` and `rating_stats` in place.
pub fn update_category_ratings(products: &mut [Product], comments: &CommentMap) -> CategoryRatingReport {
    let mut report = CategoryRatingReport::default();

    for product in products.iter_mut() {
        let Some(id) = product.id() else {
            debug!(name = product.display_name(), "Product without id, skipping");
            report.skipped_no_id += 1;
            continue;
        };

        let list = comments.get(id);
        if list.is_empty() {
            debug!(product = id, "No comments, rating left as is");
            report.no_comments += 1;
            continue;
        }

        let summary = RatingSummary::from_comments(list);
        report.updated += 1;
        if summary.apply(product) {
            report.changed += 1;
        }
    }

    report
}

/// Counts from a rating pass over many files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingsReport {
    pub files_updated: usize,
    /// Files skipped because the product or comment file was missing or unreadable.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub products_updated: usize,
    pub products_without_comments: usize,
    /// Product files that were rewritten.
    pub written: Vec<PathBuf>,
}

/// Refreshes ratings for every `(store, category)` pair.
///
/// A product file is rewritten only when at least one product's fields changed.
#[instrument(skip_all, fields(files = files.len()))]
pub fn run_ratings_stage(files: &[CategoryFiles]) -> RatingsReport {
    let mut report = RatingsReport::default();

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

        let category = update_category_ratings(&mut products, &comments);
        report.products_updated += category.updated;
        report.products_without_comments += category.no_comments;

        if category.changed == 0 {
            debug!(file = %file.label(), "Ratings unchanged");
            continue;
        }

        match save_products(&file.products, &products) {
            Ok(()) => {
                debug!(file = %file.label(), changed = category.changed, "Ratings written");
                report.files_updated += 1;
                report.written.push(file.products.clone());
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Failed to write ratings");
                report.files_failed += 1;
            }
        }
    }

    info!(
        updated = report.products_updated,
        without_comments = report.products_without_comments,
        files_updated = report.files_updated,
        "Rating aggregation complete"
    );

    report
}
