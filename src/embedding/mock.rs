use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

use super::{Embedder, EmbeddingError, EmbeddingMethod, EmbeddingResult, l2_normalize};

/// Deterministic embedder for tests: vectors are seeded from the input.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dim: usize,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dim: 8 }
    }
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The vector this mock returns for `(method, text)`.
    pub fn vector_for(&self, method: EmbeddingMethod, text: &str) -> Vec<f64> {
        let mut hasher = DefaultHasher::new();
        method.hash(&mut hasher);
        text.hash(&mut hasher);
        self.seeded(hasher.finish())
    }

    fn seeded(&self, seed: u64) -> Vec<f64> {
        let mut state = seed;
        let raw: Vec<f64> = (0..self.dim)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 32) as f64 / u32::MAX as f64) * 2.0 - 1.0
            })
            .collect();
        l2_normalize(raw).unwrap_or_else(|_| {
            let mut unit = vec![0.0; self.dim];
            if let Some(first) = unit.first_mut() {
                *first = 1.0;
            }
            unit
        })
    }
}

impl Embedder for MockEmbedder {
    fn embed_text(&self, method: EmbeddingMethod, text: &str) -> EmbeddingResult<Vec<f64>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput {
                reason: "empty text".to_string(),
            });
        }
        Ok(self.vector_for(method, text))
    }

    fn embed_image(&self, path: &Path) -> EmbeddingResult<Vec<f64>> {
        if !path.is_file() {
            return Err(EmbeddingError::ImageNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path).map_err(|e| EmbeddingError::InvalidInput {
            reason: e.to_string(),
        })?;

        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(self.seeded(hasher.finish()))
    }
}
