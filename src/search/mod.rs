//! Multi-store product search with reciprocal rank fusion.
//!
//! For each supplied [`EmbeddingMethod`] the engine takes the top N products per
//! store by dot product, merges stores into one top-N list per method, fuses the
//! lists with RRF and resolves the winner to its offers across stores.

mod error;
pub mod fusion;


pub use error::{SearchError, SearchResult};
pub use fusion::{Candidate, FusedResult, MethodHit, reciprocal_rank_fusion};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CategoryFiles, Numeric, Product};
use crate::constants::DEFAULT_RRF_K;
use crate::embedding::{Embedder, EmbeddingMethod, dot};
use crate::storage::read_json;
use fusion::sort_by_similarity;

/// One query vector per method. Methods without a vector are not searched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryVectors {
    vectors: BTreeMap<EmbeddingMethod, Vec<f64>>,
}

impl QueryVectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the vector for `method`. Empty vectors are ignored.
    pub fn with(mut self, method: EmbeddingMethod, vector: Vec<f64>) -> Self {
        if !vector.is_empty() {
            self.vectors.insert(method, vector);
        }
        self
    }

    /// Text query: the semantic and visual text spaces, with the combined space
    /// searched using the visual text vector.
    pub fn from_text<E: Embedder + ?Sized>(embedder: &E, text: &str) -> SearchResult<Self> {
        let semantic = embedder.embed_text(EmbeddingMethod::TextSemantic, text)?;
        let visual = embedder.embed_text(EmbeddingMethod::TextVisual, text)?;
        Ok(Self::new()
            .with(EmbeddingMethod::TextSemantic, semantic)
            .with(EmbeddingMethod::Combined, visual.clone())
            .with(EmbeddingMethod::TextVisual, visual))
    }

    /// Image query: the image vector searched in the visual and combined spaces.
    pub fn from_image<E: Embedder + ?Sized>(embedder: &E, path: &Path) -> SearchResult<Self> {
        let image = embedder.embed_image(path)?;
        Ok(Self::new()
            .with(EmbeddingMethod::Combined, image.clone())
            .with(EmbeddingMethod::Visual, image))
    }

    /// Reads precomputed vectors from a JSON object keyed by method name.
    pub fn load(path: &Path) -> SearchResult<Self> {
        let mut query: Self = read_json(path)?.ok_or_else(|| SearchError::QueryNotFound {
            path: path.to_path_buf(),
        })?;
        query.vectors.retain(|_, v| !v.is_empty());
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(query)
    }

    pub fn get(&self, method: EmbeddingMethod) -> Option<&[f64]> {
        self.vectors.get(&method).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Supplied methods in fusion order.
    pub fn iter(&self) -> impl Iterator<Item = (EmbeddingMethod, &[f64])> {
        self.vectors.iter().map(|(m, v)| (*m, v.as_slice()))
    }
}

/// One store's copy of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub store: String,
    pub name: Option<String>,
    pub price: Option<Numeric>,
    pub rating: Option<Numeric>,
    /// Stored product score, `0` when the product has not been scored.
    pub score: f64,
    pub image: Option<String>,
    pub product: Product,
}

impl Variant {
    fn from_product(store: &str, product: &Product) -> Self {
        Self {
            store: store.to_string(),
            name: product.name.clone(),
            price: product.price.clone(),
            rating: product.rating.clone(),
            score: product.score.unwrap_or(0.0),
            image: product.primary_image().map(str::to_string),
            product: product.clone(),
        }
    }
}

/// What the top fused result resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Offers for the winning product, best score first.
    Variants {
        best_offer: Variant,
        other_offers: Vec<Variant>,
    },
    /// No store lists the winner any more; the raw fused result stands in.
    Fallback { result: FusedResult },
    /// Nothing matched.
    Empty,
}

/// Result of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub category: String,
    pub fused: Vec<FusedResult>,
    pub resolution: Resolution,
}

impl SearchOutcome {
    fn empty(category: &str) -> Self {
        Self {
            category: category.to_string(),
            fused: Vec::new(),
            resolution: Resolution::Empty,
        }
    }

    /// The best offer, if the winner resolved to variants.
    pub fn best_offer(&self) -> Option<&Variant> {
        match &self.resolution {
            Resolution::Variants { best_offer, .. } => Some(best_offer),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fused.is_empty()
    }
}

/// Read-only search over the product files of every configured store.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    stores: Vec<CategoryFiles>,
    rrf_k: f64,
}

impl SearchEngine {
    /// `stores` lists every `(store, category)` product file, in store order.
    pub fn new(stores: Vec<CategoryFiles>) -> Self {
        Self {
            stores,
            rrf_k: DEFAULT_RRF_K,
        }
    }

    pub fn with_rrf_k(mut self, k: f64) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn rrf_k(&self) -> f64 {
        self.rrf_k
    }

    /// Runs a fused search in `category`. Never fails: unreadable stores are skipped
    /// and a query with no matches returns an empty outcome.
    #[instrument(skip_all, fields(category = category, top_n = top_n))]
    pub fn search(&self, category: &str, query: &QueryVectors, top_n: usize) -> SearchOutcome {
        if query.is_empty() || top_n == 0 {
            debug!("Nothing to search");
            return SearchOutcome::empty(category);
        }

        let stores = self.load_category(category);
        if stores.is_empty() {
            warn!("No readable product files for category");
            return SearchOutcome::empty(category);
        }

        let lists: Vec<(EmbeddingMethod, Vec<Candidate>)> = query
            .iter()
            .map(|(method, vector)| {
                let mut merged: Vec<Candidate> = stores
                    .iter()
                    .flat_map(|(store, products)| top_n_for_store(store, products, method, vector, top_n))
                    .collect();
                sort_by_similarity(&mut merged);
                merged.truncate(top_n);
                (method, merged)
            })
            .collect();

        let fused = reciprocal_rank_fusion(&lists, self.rrf_k);
        let Some(top) = fused.first() else {
            debug!("No products matched");
            return SearchOutcome::empty(category);
        };

        let resolution = resolve_variants(&stores, top);
        info!(
            product = %top.product_id,
            rrf_score = top.rrf_score,
            results = fused.len(),
            "Search complete"
        );

        SearchOutcome {
            category: category.to_string(),
            fused,
            resolution,
        }
    }

    /// Embeds `text` and searches with [`QueryVectors::from_text`].
    pub fn search_text<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        category: &str,
        text: &str,
        top_n: usize,
    ) -> SearchResult<SearchOutcome> {
        let query = QueryVectors::from_text(embedder, text)?;
        Ok(self.search(category, &query, top_n))
    }

    /// Embeds the image at `path` and searches with [`QueryVectors::from_image`].
    pub fn search_image<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        category: &str,
        path: &Path,
        top_n: usize,
    ) -> SearchResult<SearchOutcome> {
        let query = QueryVectors::from_image(embedder, path)?;
        Ok(self.search(category, &query, top_n))
    }

    fn load_category(&self, category: &str) -> Vec<(&str, Vec<Product>)> {
        self.stores
            .iter()
            .filter(|files| files.category == category)
            .filter_map(|files| match files.load_products() {
                Ok(products) => Some((files.shop.as_str(), products.into_products())),
                Err(e) if e.is_not_found() => {
                    debug!(file = %files.label(), "No product file, skipping store");
                    None
                }
                Err(e) => {
                    warn!(file = %files.label(), error = %e, "Unreadable product file, skipping store");
                    None
                }
            })
            .collect()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn top_n_for_store(
    store: &str,
    products: &[Product],
    method: EmbeddingMethod,
    query: &[f64],
    top_n: usize,
) -> Vec<Candidate> {
    let mut scored: Vec<(usize, f64)> = products
        .iter()
        .enumerate()
        .filter_map(|(index, product)| {
            product.id()?;
            let vector = product.vector(method)?;
            if vector.len() != query.len() {
                debug!(
                    store,
                    product = product.display_name(),
                    %method,
                    expected = query.len(),
                    actual = vector.len(),
                    "Vector length mismatch, skipping product"
                );
                return None;
            }
            Some((index, dot(query, vector)))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_n);

    scored
        .into_iter()
        .filter_map(|(index, similarity)| {
            let product = &products[index];
            Some(Candidate {
                product_id: product.id()?.to_string(),
                store: store.to_string(),
                similarity,
                product: product.clone(),
            })
        })
        .collect()
}

fn resolve_variants(stores: &[(&str, Vec<Product>)], top: &FusedResult) -> Resolution {
    let mut variants: Vec<Variant> = stores
        .iter()
        .flat_map(|(store, products)| {
            products
                .iter()
                .filter(|p| p.id() == Some(top.product_id.as_str()))
                .map(move |p| Variant::from_product(store, p))
        })
        .collect();

    if variants.is_empty() {
        debug!(product = %top.product_id, "No variants found, using fused result");
        return Resolution::Fallback { result: top.clone() };
    }

    variants.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    let best_offer = variants.remove(0);
    Resolution::Variants {
        best_offer,
        other_offers: variants,
    }
}
