//! Embedding contract and vector helpers.
//!
//! Models are external: an [`Embedder`] turns text or an image into a vector for one
//! [`EmbeddingMethod`]. Stored vectors are L2-normalized, so similarity is a plain dot
//! product.

pub mod combine;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use combine::{CombineReport, CombineWeights, combine_category_vectors, run_combine_stage};
pub use error::{EmbeddingError, EmbeddingResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The vector spaces a product can be indexed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMethod {
    /// Sentence-embedding of the product text (`text_vector_st`).
    TextSemantic,
    /// Joint image/text model, text side (`text_vector_clip`).
    TextVisual,
    /// Joint image/text model, image side (`clip_vector`).
    Visual,
    /// Weighted blend of `Visual` and `TextVisual` (`combined_vector`).
    Combined,
}

impl EmbeddingMethod {
    /// Product field holding vectors for this method.
    pub fn field_name(&self) -> &'static str {
        match self {
            EmbeddingMethod::TextSemantic => "text_vector_st",
            EmbeddingMethod::TextVisual => "text_vector_clip",
            EmbeddingMethod::Visual => "clip_vector",
            EmbeddingMethod::Combined => "combined_vector",
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EmbeddingMethod::TextSemantic => "text_semantic",
            EmbeddingMethod::TextVisual => "text_visual",
            EmbeddingMethod::Visual => "visual",
            EmbeddingMethod::Combined => "combined",
        };
        f.write_str(label)
    }
}

/// External embedding producer.
pub trait Embedder: Send + Sync {
    /// Embeds query or product text in the text space of `method`.
    fn embed_text(&self, method: EmbeddingMethod, text: &str) -> EmbeddingResult<Vec<f64>>;

    /// Embeds an image in the visual space.
    fn embed_image(&self, path: &Path) -> EmbeddingResult<Vec<f64>>;
}

/// Dot product over the common prefix of two vectors.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scales `vector` to unit length. Zero-norm vectors are rejected, never coerced.
pub fn l2_normalize(mut vector: Vec<f64>) -> EmbeddingResult<Vec<f64>> {
    let norm = dot(&vector, &vector).sqrt();
    if vector.is_empty() || !norm.is_finite() || norm <= 0.0 {
        return Err(EmbeddingError::ZeroNorm);
    }

    for x in &mut vector {
        *x /= norm;
    }
    Ok(vector)
}

/// Weighted mean of two vectors, normalized.
///
/// Mismatched lengths are truncated to the shorter one with a warning.
pub fn combine_vectors(
    a: &[f64],
    b: &[f64],
    weight_a: f64,
    weight_b: f64,
) -> EmbeddingResult<Vec<f64>> {
    if a.is_empty() || b.is_empty() {
        return Err(EmbeddingError::InvalidInput {
            reason: "cannot combine an empty vector".to_string(),
        });
    }

    let total = weight_a + weight_b;
    if !total.is_finite() || total <= 0.0 {
        return Err(EmbeddingError::InvalidInput {
            reason: format!("weights must sum to a positive value, got {total}"),
        });
    }

    if a.len() != b.len() {
        warn!(
            left = a.len(),
            right = b.len(),
            "Vector length mismatch, truncating to shorter"
        );
    }

    let combined = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x * weight_a + y * weight_b) / total)
        .collect();

    l2_normalize(combined)
}
