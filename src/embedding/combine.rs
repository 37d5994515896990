use std::borrow::Cow;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{EmbeddingMethod, combine_vectors};
use crate::catalog::{CategoryFiles, Product, save_products};
use crate::constants::{DEFAULT_CLIP_WEIGHT, DEFAULT_TEXT_CLIP_WEIGHT};

/// Blend weights for building `combined_vector`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombineWeights {
    /// Weight of the image vector. Default: `0.6`.
    pub clip: f64,
    /// Weight of the text vector from the same joint model. Default: `0.4`.
    pub text_clip: f64,
}

impl Default for CombineWeights {
    fn default() -> Self {
        Self {
            clip: DEFAULT_CLIP_WEIGHT,
            text_clip: DEFAULT_TEXT_CLIP_WEIGHT,
        }
    }
}

/// Counts from a combine pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineReport {
    /// Products that received a new combined vector.
    pub combined: usize,
    /// Products that already had one.
    pub up_to_date: usize,
    /// Products missing an input vector.
    pub incomplete: usize,
    /// Products whose inputs could not be combined (zero norm).
    pub failed: usize,
    pub files_updated: usize,
    pub files_failed: usize,
    /// Product files that were rewritten.
    pub written: Vec<PathBuf>,
}

impl CombineReport {
    fn absorb(&mut self, other: CombineReport) {
        self.combined += other.combined;
        self.up_to_date += other.up_to_date;
        self.incomplete += other.incomplete;
        self.failed += other.failed;
    }
}

/// Older exports stored the joint-model text vector under this name.
const LEGACY_TEXT_VISUAL_FIELD: &str = "clip_text_vector";

/// Text side of the joint model, falling back to the legacy field.
fn text_visual_vector(product: &Product) -> Option<Cow<'_, [f64]>> {
    if let Some(vector) = product.vector(EmbeddingMethod::TextVisual) {
        return Some(Cow::Borrowed(vector));
    }
    let legacy = product.extra.get(LEGACY_TEXT_VISUAL_FIELD)?;
    Vec::<f64>::deserialize(legacy)
        .ok()
        .filter(|vector| !vector.is_empty())
        .map(Cow::Owned)
}

/// Fills missing `combined_vector`s in place.
pub fn combine_category_vectors(products: &mut [Product], weights: CombineWeights) -> CombineReport {
    let mut report = CombineReport::default();

    for product in products.iter_mut() {
        if product.vector(EmbeddingMethod::Combined).is_some() {
            report.up_to_date += 1;
            continue;
        }

        let (Some(visual), Some(text)) = (
            product.vector(EmbeddingMethod::Visual),
            text_visual_vector(product),
        ) else {
            report.incomplete += 1;
            continue;
        };

        match combine_vectors(visual, &text, weights.clip, weights.text_clip) {
            Ok(combined) => {
                product.combined_vector = Some(combined);
                report.combined += 1;
            }
            Err(e) => {
                warn!(product = product.display_name(), error = %e, "Cannot combine vectors");
                report.failed += 1;
            }
        }
    }

    report
}

/// Runs [`combine_category_vectors`] over every product file.
///
/// Missing or unreadable files are skipped. A file is rewritten only if a vector was
/// added.
#[instrument(skip_all, fields(files = files.len()))]
pub fn run_combine_stage(files: &[CategoryFiles], weights: CombineWeights) -> CombineReport {
    let mut report = CombineReport::default();

    for file in files {
        let mut products = match file.load_products() {
            Ok(products) => products,
            Err(e) if e.is_not_found() => {
                debug!(file = %file.label(), "No product file, skipping");
                continue;
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Unreadable product file, skipping");
                report.files_failed += 1;
                continue;
            }
        };

        let category = combine_category_vectors(&mut products, weights);
        let updated = category.combined > 0;
        report.absorb(category);

        if !updated {
            continue;
        }

        match save_products(&file.products, &products) {
            Ok(()) => {
                report.files_updated += 1;
                report.written.push(file.products.clone());
            }
            Err(e) => {
                warn!(file = %file.label(), error = %e, "Failed to write product file");
                report.files_failed += 1;
            }
        }
    }

    info!(
        combined = report.combined,
        incomplete = report.incomplete,
        files_updated = report.files_updated,
        "Vector combination complete"
    );

    report
}
