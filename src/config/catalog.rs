//! Store and category layout, read from TOML.
//!
//! ```toml
//! [shops.ecommerce1]
//! data_path = "dukkans/ecommerce1/backend/data"
//!
//! [categories.ayakkabi]
//! product_file = "product/ayakkabi.json"
//! comments_file = "comments/ayakkabi.json"
//! id_prefix = "ayk"
//! sizes = ["37", "38", "39", "40", "41", "42"]
//!
//! [combined]
//! clip = 0.6
//! text_clip = 0.4
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use crate::catalog::CategoryFiles;
use crate::embedding::CombineWeights;

/// Size used by categories that declare none.
pub const DEFAULT_SIZE: &str = "STD";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShopConfig {
    /// Data directory, relative to the project root unless absolute.
    pub data_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryConfig {
    /// Product list, relative to a shop's data directory.
    pub product_file: PathBuf,
    /// Comment map, relative to a shop's data directory.
    pub comments_file: PathBuf,
    /// Id prefix without the trailing underscore (`ayk` gives `ayk_01`).
    pub id_prefix: String,
    #[serde(default = "default_sizes")]
    pub sizes: Vec<String>,
}

impl CategoryConfig {
    /// Prefix used for product ids in this category.
    pub fn id_prefix(&self) -> String {
        format!("{}_", self.id_prefix)
    }
}

fn default_sizes() -> Vec<String> {
    vec![DEFAULT_SIZE.to_string()]
}

/// Parsed catalog file. Shops and categories iterate in name order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub shops: BTreeMap<String, ShopConfig>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryConfig>,
    #[serde(default)]
    pub combined: CombineWeights,
}

impl CatalogConfig {
    /// Reads and validates a catalog file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parses catalog TOML. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::CatalogParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let CombineWeights { clip, text_clip } = self.combined;
        let valid = clip.is_finite() && text_clip.is_finite() && clip >= 0.0 && text_clip >= 0.0;
        if !valid || clip + text_clip <= 0.0 {
            return Err(ConfigError::InvalidWeights { clip, text_clip });
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Result<&CategoryConfig, ConfigError> {
        self.categories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCategory {
                category: name.to_string(),
            })
    }

    /// Every `(shop, category)` file pair, shop-major.
    pub fn category_files(&self, root: &Path) -> Vec<CategoryFiles> {
        self.shops
            .iter()
            .flat_map(|(shop, shop_config)| {
                let data_dir = resolve(root, &shop_config.data_path);
                self.categories.iter().map(move |(category, files)| CategoryFiles {
                    shop: shop.clone(),
                    category: category.clone(),
                    products: data_dir.join(&files.product_file),
                    comments: data_dir.join(&files.comments_file),
                })
            })
            .collect()
    }

    /// File pairs for one category across every shop, in shop order.
    pub fn files_for_category(
        &self,
        root: &Path,
        category: &str,
    ) -> Result<Vec<CategoryFiles>, ConfigError> {
        self.category(category)?;
        Ok(self
            .category_files(root)
            .into_iter()
            .filter(|files| files.category == category)
            .collect())
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
