//! Test fixtures for integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pricelens::catalog::{CategoryFiles, Comment, CommentMap, Numeric, Product, save_comments, save_products};
use pricelens::config::{CatalogConfig, Config};
use pricelens::retry::RetryPolicy;
use pricelens::sentiment::{
    BatchConfig, BatchSentimentClient, MockSentimentClassifier, SentimentCache,
    SentimentCacheHandle,
};
use tempfile::TempDir;

pub const CATEGORY: &str = "ayakkabi";

pub const CATALOG_TOML: &str = r#"
[shops.ecommerce1]
data_path = "dukkans/ecommerce1/backend/data"

[shops.ecommerce2]
data_path = "dukkans/ecommerce2/backend/data"

[categories.ayakkabi]
product_file = "product/ayakkabi.json"
comments_file = "comments/ayakkabi.json"
id_prefix = "ayk"
sizes = ["40", "41", "42"]
"#;

#[derive(Default)]
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            product: Product {
                id: Some(id.to_string()),
                name: Some(format!("Ürün {id}")),
                ..Product::default()
            },
        }
    }

    pub fn price(mut self, price: f64) -> Self {
        self.product.price = Numeric::from_f64(price);
        self
    }

    pub fn rating(mut self, rating: u32) -> Self {
        self.product.rating = Some(Numeric::from(rating));
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.product.score = Some(score);
        self
    }

    pub fn clip(mut self, vector: Vec<f64>) -> Self {
        self.product.clip_vector = Some(vector);
        self
    }

    pub fn text_clip(mut self, vector: Vec<f64>) -> Self {
        self.product.text_vector_clip = Some(vector);
        self
    }

    pub fn text_st(mut self, vector: Vec<f64>) -> Self {
        self.product.text_vector_st = Some(vector);
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}

pub fn rated_comment(text: &str, rating: u32) -> Comment {
    Comment {
        rating: Some(Numeric::from(rating)),
        ..Comment::with_text(text)
    }
}

/// A project root with a catalog file and two stores.
pub struct Storefronts {
    pub dir: TempDir,
    pub catalog: CatalogConfig,
}

impl Storefronts {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let catalog_path = dir.path().join("config").join("catalog.toml");
        fs::create_dir_all(catalog_path.parent().expect("parent")).expect("mkdir");
        fs::write(&catalog_path, CATALOG_TOML).expect("write catalog");
        let catalog = CatalogConfig::load(&catalog_path).expect("catalog");
        Self { dir, catalog }
    }

    pub fn config(&self) -> Config {
        Config {
            root: self.dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    pub fn files(&self) -> Vec<CategoryFiles> {
        self.catalog
            .files_for_category(self.dir.path(), CATEGORY)
            .expect("known category")
    }

    pub fn store(&self, shop: &str) -> CategoryFiles {
        self.files()
            .into_iter()
            .find(|f| f.shop == shop)
            .expect("known shop")
    }

    pub fn write_products(&self, shop: &str, products: &[Product]) {
        save_products(&self.store(shop).products, &products.to_vec().into()).expect("write products");
    }

    pub fn write_comments(&self, shop: &str, comments: &CommentMap) {
        save_comments(&self.store(shop).comments, comments).expect("write comments");
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn client(&self, classifier: MockSentimentClassifier) -> BatchSentimentClient<MockSentimentClassifier> {
        let config = self.config();
        let cache = SentimentCache::load(config.cache_file()).expect("cache");
        BatchSentimentClient::new(
            Arc::new(classifier),
            SentimentCacheHandle::new(cache),
            fast_batch_config(),
        )
    }
}

pub fn fast_batch_config() -> BatchConfig {
    BatchConfig {
        batch_size: 2,
        max_concurrent: 1,
        pause: Duration::ZERO,
        retry: RetryPolicy::immediate(3),
    }
}
