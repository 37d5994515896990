//! Reciprocal rank fusion over per-method result lists.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::catalog::Product;
use crate::embedding::EmbeddingMethod;

/// One product matched in one vector space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub product_id: String,
    /// Store the matched product came from.
    pub store: String,
    /// Dot product against the query.
    pub similarity: f64,
    #[serde(skip)]
    pub product: Product,
}

/// Where a product placed in one method's list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MethodHit {
    /// 1-based.
    pub rank: usize,
    pub similarity: f64,
}

/// A product id with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub product_id: String,
    /// Store of the first-seen match.
    pub store: String,
    pub rrf_score: f64,
    /// Best rank per method.
    pub methods: BTreeMap<EmbeddingMethod, MethodHit>,
    /// First-seen matched product.
    pub product: Product,
}

/// Sorts descending by similarity, keeping input order among equal scores.
pub(crate) fn sort_by_similarity(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
}

/// Fuses ranked lists: each appearance at rank `r` adds `1 / (k + r)`.
///
/// A product appearing in several stores within one list is credited once per
/// appearance. Ties in the fused score keep first-seen order: lists are visited in
/// the order given, then top to bottom.
pub fn reciprocal_rank_fusion(
    lists: &[(EmbeddingMethod, Vec<Candidate>)],
    k: f64,
) -> Vec<FusedResult> {
    let mut fused: Vec<FusedResult> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (method, candidates) in lists {
        for (position, candidate) in candidates.iter().enumerate() {
            let rank = position + 1;
            let slot = *index.entry(candidate.product_id.as_str()).or_insert_with(|| {
                fused.push(FusedResult {
                    product_id: candidate.product_id.clone(),
                    store: candidate.store.clone(),
                    rrf_score: 0.0,
                    methods: BTreeMap::new(),
                    product: candidate.product.clone(),
                });
                fused.len() - 1
            });

            let entry = &mut fused[slot];
            entry.rrf_score += 1.0 / (k + rank as f64);
            entry.methods.entry(*method).or_insert(MethodHit {
                rank,
                similarity: candidate.similarity,
            });
        }
    }

    fused.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(Ordering::Equal));
    fused
}
