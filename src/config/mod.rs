//! Environment-backed configuration.
//!
//! Runtime settings have defaults. Override with `PRICELENS_*` environment variables.
//! Stores and categories come from the TOML catalog, see [`CatalogConfig`].

pub mod catalog;
pub mod error;


pub use catalog::{CatalogConfig, CategoryConfig, ShopConfig};
pub use error::ConfigError;

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    COMMENT_STATE_FILENAME, DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE,
    DEFAULT_MAX_CONCURRENT_BATCHES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SENTIMENT_MODEL,
    DEFAULT_TOP_N, PRODUCT_STATE_FILENAME,
};
use crate::retry::RetryPolicy;
use crate::sentiment::BatchConfig;

/// Pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `PRICELENS_*` overrides on top of defaults.
/// Relative paths are resolved against [`Config::root`].
#[derive(Clone)]
pub struct Config {
    /// Project root. Default: `.`.
    pub root: PathBuf,

    /// Catalog TOML. Default: `config/catalog.toml`.
    pub catalog_path: PathBuf,

    /// Directory holding the change-detection state files. Default: `state`.
    pub state_dir: PathBuf,

    /// Sentiment cache file. Default: `dukkans/cache.json`.
    pub cache_path: PathBuf,

    /// Sentiment classification endpoint.
    pub sentiment_url: String,

    /// Bearer token for the sentiment endpoint.
    pub sentiment_api_key: Option<String>,

    /// Model id sent with requests and recorded in cache entries.
    pub sentiment_model: String,

    /// Unique texts per classifier request. Default: `5`.
    pub batch_size: usize,

    /// Classifier requests in flight. Default: `1`.
    pub max_concurrent_batches: usize,

    /// Per-request timeout. Default: 30 seconds.
    pub request_timeout: Duration,

    /// Results per method in search. Default: `3`.
    pub top_n: usize,
}

/// Sentiment endpoint used when `PRICELENS_SENTIMENT_URL` is not set.
pub const DEFAULT_SENTIMENT_URL: &str = "http://localhost:8000/v1/sentiment";

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            catalog_path: PathBuf::from("config/catalog.toml"),
            state_dir: PathBuf::from("state"),
            cache_path: PathBuf::from("dukkans/cache.json"),
            sentiment_url: DEFAULT_SENTIMENT_URL.to_string(),
            sentiment_api_key: None,
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("catalog_path", &self.catalog_path)
            .field("state_dir", &self.state_dir)
            .field("cache_path", &self.cache_path)
            .field("sentiment_url", &self.sentiment_url)
            .field(
                "sentiment_api_key",
                &self.sentiment_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("sentiment_model", &self.sentiment_model)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("request_timeout", &self.request_timeout)
            .field("top_n", &self.top_n)
            .finish()
    }
}

impl Config {
    const ENV_ROOT: &'static str = "PRICELENS_ROOT";
    const ENV_CATALOG_PATH: &'static str = "PRICELENS_CATALOG_PATH";
    const ENV_STATE_DIR: &'static str = "PRICELENS_STATE_DIR";
    const ENV_CACHE_PATH: &'static str = "PRICELENS_CACHE_PATH";
    const ENV_SENTIMENT_URL: &'static str = "PRICELENS_SENTIMENT_URL";
    const ENV_SENTIMENT_API_KEY: &'static str = "PRICELENS_SENTIMENT_API_KEY";
    const ENV_SENTIMENT_MODEL: &'static str = "PRICELENS_SENTIMENT_MODEL";
    const ENV_BATCH_SIZE: &'static str = "PRICELENS_BATCH_SIZE";
    const ENV_MAX_CONCURRENT_BATCHES: &'static str = "PRICELENS_MAX_CONCURRENT_BATCHES";
    const ENV_REQUEST_TIMEOUT_SECS: &'static str = "PRICELENS_REQUEST_TIMEOUT_SECS";
    const ENV_TOP_N: &'static str = "PRICELENS_TOP_N";

    /// Checked in order when `PRICELENS_SENTIMENT_API_KEY` is unset.
    const API_KEY_FALLBACKS: [&'static str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let root = Self::parse_path_from_env(Self::ENV_ROOT, defaults.root);
        let catalog_path = Self::parse_path_from_env(Self::ENV_CATALOG_PATH, defaults.catalog_path);
        let state_dir = Self::parse_path_from_env(Self::ENV_STATE_DIR, defaults.state_dir);
        let cache_path = Self::parse_path_from_env(Self::ENV_CACHE_PATH, defaults.cache_path);
        let sentiment_url = Self::parse_string_from_env(Self::ENV_SENTIMENT_URL, defaults.sentiment_url);
        let sentiment_api_key = Self::parse_api_key_from_env();
        let sentiment_model =
            Self::parse_string_from_env(Self::ENV_SENTIMENT_MODEL, defaults.sentiment_model);
        let batch_size = Self::parse_positive_from_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?;
        let max_concurrent_batches = Self::parse_positive_from_env(
            Self::ENV_MAX_CONCURRENT_BATCHES,
            defaults.max_concurrent_batches,
        )?;
        let request_timeout = Duration::from_secs(Self::parse_positive_from_env(
            Self::ENV_REQUEST_TIMEOUT_SECS,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let top_n = Self::parse_positive_from_env(Self::ENV_TOP_N, defaults.top_n)?;

        Ok(Self {
            root,
            catalog_path,
            state_dir,
            cache_path,
            sentiment_url,
            sentiment_api_key,
            sentiment_model,
            batch_size,
            max_concurrent_batches,
            request_timeout,
            top_n,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::PathNotFound {
                path: self.root.clone(),
            });
        }
        if !self.root.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let catalog = self.catalog_file();
        if !catalog.exists() {
            return Err(ConfigError::PathNotFound { path: catalog });
        }
        if !catalog.is_file() {
            return Err(ConfigError::NotAFile { path: catalog });
        }

        let state_dir = self.resolve(&self.state_dir);
        if state_dir.exists() && !state_dir.is_dir() {
            return Err(ConfigError::NotADirectory { path: state_dir });
        }

        let cache = self.cache_file();
        if cache.is_dir() {
            return Err(ConfigError::NotAFile { path: cache });
        }

        for (name, value) in [
            (Self::ENV_BATCH_SIZE, self.batch_size),
            (Self::ENV_MAX_CONCURRENT_BATCHES, self.max_concurrent_batches),
            (Self::ENV_TOP_N, self.top_n),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    value: value.to_string(),
                    reason: "must be at least 1",
                });
            }
        }

        Ok(())
    }

    /// Resolves `path` against the project root unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.resolve(&self.catalog_path)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.resolve(&self.cache_path)
    }

    /// Digest map for product files.
    pub fn product_state_file(&self) -> PathBuf {
        self.resolve(&self.state_dir).join(PRODUCT_STATE_FILENAME)
    }

    /// Digest map for comment files.
    pub fn comment_state_file(&self) -> PathBuf {
        self.resolve(&self.state_dir).join(COMMENT_STATE_FILENAME)
    }

    /// Batching and retry settings for the sentiment client.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            max_concurrent: self.max_concurrent_batches,
            pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
            retry: RetryPolicy::default(),
        }
    }

    fn parse_api_key_from_env() -> Option<String> {
        std::iter::once(Self::ENV_SENTIMENT_API_KEY)
            .chain(Self::API_KEY_FALLBACKS)
            .find_map(|name| {
                env::var(name)
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_positive_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr<Err = std::num::ParseIntError> + PartialEq + Default,
    {
        match env::var(var_name) {
            Ok(value) => {
                let parsed: T = value.trim().parse().map_err(|e| ConfigError::NumberParseError {
                    name: var_name,
                    value: value.clone(),
                    source: e,
                })?;

                if parsed == T::default() {
                    return Err(ConfigError::InvalidValue {
                        name: var_name,
                        value,
                        reason: "must be at least 1",
                    });
                }

                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }
}
