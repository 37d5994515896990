//! Storefront catalog files: one product list and one comment map per store and
//! category.

pub mod error;
mod ids;
pub mod model;


pub use error::{CatalogError, CatalogResult};
pub use ids::next_product_id;
pub use model::{
    Comment, CommentMap, Numeric, Product, ProductList, RatingStats, ScoreMetadata,
};

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::storage::{read_json, write_json_atomic};

/// Resolved file locations for one `(store, category)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFiles {
    /// Store name.
    pub shop: String,
    /// Category name.
    pub category: String,
    /// Product list (`[Product]`).
    pub products: PathBuf,
    /// Comment map (`{product_id: [Comment]}`).
    pub comments: PathBuf,
}

impl CategoryFiles {
    /// Short label for logs.
    pub fn label(&self) -> String {
        format!("{}/{}", self.shop, self.category)
    }

    pub fn load_products(&self) -> CatalogResult<ProductList> {
        load_products(&self.products)
    }

    pub fn load_comments(&self) -> CatalogResult<CommentMap> {
        load_comments(&self.comments)
    }
}

/// Reads a product list. Records that do not parse are kept raw and logged.
pub fn load_products(path: &Path) -> CatalogResult<ProductList> {
    read_json(path)?.ok_or_else(|| CatalogError::ProductsNotFound {
        path: path.to_path_buf(),
    })
}

/// Atomically rewrites a product list, raw records included.
pub fn save_products(path: &Path, products: &ProductList) -> CatalogResult<()> {
    write_json_atomic(path, products)?;
    Ok(())
}

/// Reads a comment map.
pub fn load_comments(path: &Path) -> CatalogResult<CommentMap> {
    read_json(path)?.ok_or_else(|| CatalogError::CommentsNotFound {
        path: path.to_path_buf(),
    })
}

/// Atomically rewrites a comment map.
pub fn save_comments(path: &Path, comments: &CommentMap) -> CatalogResult<()> {
    write_json_atomic(path, comments)?;
    Ok(())
}

/// Next free id in a category, taking every store's product list into account.
///
/// Missing files count as empty. Unreadable files are logged and skipped.
pub fn next_category_id(files: &[CategoryFiles], prefix: &str) -> String {
    let mut ids = Vec::new();
    for file in files {
        match file.load_products() {
            Ok(products) => ids.extend(products.into_products().into_iter().filter_map(|p| p.id)),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(file = %file.label(), error = %e, "Unreadable product file, ignoring its ids"),
        }
    }
    next_product_id(ids.iter().map(String::as_str), prefix)
}
