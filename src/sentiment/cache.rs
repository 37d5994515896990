//! Digest-keyed memo of sentiment annotations.
//!
//! Keys are [`digest_text`] of the comment body, so formatting variants of the same
//! text share one entry. Entries are never replaced once written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{SentimentError, SentimentResult};
use super::types::SentimentTuple;
use crate::constants::CACHE_SCHEMA_VERSION;
use crate::hashing::{digest, digest_text, is_digest, normalize_text};
use crate::storage::{StorageError, read_json, write_json_atomic};

/// One persisted annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentCacheEntry {
    /// Text as first sent to the classifier.
    pub original: String,
    /// Normalized form that was hashed.
    pub normalized: String,
    /// Clamped annotation.
    pub sentiment: SentimentTuple,
    /// Model that produced the annotation.
    #[serde(default)]
    pub source: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    CACHE_SCHEMA_VERSION
}

/// In-memory view of the cache file with an explicit load/flush lifecycle.
#[derive(Debug, Clone)]
pub struct SentimentCache {
    path: PathBuf,
    entries: BTreeMap<String, SentimentCacheEntry>,
    dirty: bool,
}

impl SentimentCache {
    /// Creates an empty cache that will be written to `path` on flush.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the cache file (empty if it does not exist).
    ///
    /// A cache file that exists but cannot be parsed is an error: silently starting
    /// over would resend every comment to the classifier.
    pub fn load(path: impl Into<PathBuf>) -> SentimentResult<Self> {
        let path = path.into();
        let entries = match read_json::<BTreeMap<String, SentimentCacheEntry>>(&path) {
            Ok(Some(entries)) => entries,
            Ok(None) => BTreeMap::new(),
            Err(StorageError::Parse { source, .. }) => {
                return Err(SentimentError::CorruptCache {
                    path,
                    reason: source.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let foreign = entries.keys().filter(|k| !is_digest(k)).count();
        if foreign > 0 {
            warn!(path = %path.display(), foreign, "Cache contains keys that are not text digests");
        }

        info!(path = %path.display(), entries = entries.len(), "Sentiment cache loaded");

        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry exists for the digest.
    pub fn contains_digest(&self, digest: &str) -> bool {
        self.entries.contains_key(digest)
    }

    /// Looks up the cached annotation for `text`.
    pub fn lookup(&self, text: &str) -> Option<SentimentTuple> {
        self.entries
            .get(&digest_text(text))
            .map(|entry| entry.sentiment)
    }

    /// Stores the clamped annotation for `text` unless one already exists.
    ///
    /// Returns `true` if a new entry was written.
    pub fn insert(&mut self, text: &str, sentiment: SentimentTuple, source: &str) -> bool {
        let normalized = normalize_text(text);
        let key = digest(normalized.as_bytes());

        if self.entries.contains_key(&key) {
            debug!(digest = %key, "Cache entry already present, keeping existing");
            return false;
        }

        self.entries.insert(
            key,
            SentimentCacheEntry {
                original: text.to_string(),
                normalized,
                sentiment: sentiment.clamped(),
                source: source.to_string(),
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                version: CACHE_SCHEMA_VERSION,
            },
        );
        self.dirty = true;
        true
    }

    /// Writes the cache atomically if it changed since the last flush.
    pub fn flush(&mut self) -> SentimentResult<()> {
        if !self.dirty {
            return Ok(());
        }
        write_json_atomic(&self.path, &self.entries)?;
        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "Sentiment cache flushed");
        Ok(())
    }
}

/// Cloneable, thread-safe handle to a [`SentimentCache`].
///
/// Inserts go through the lock, so two workers resolving the same digest cannot
/// overwrite each other.
#[derive(Clone)]
pub struct SentimentCacheHandle {
    inner: Arc<Mutex<SentimentCache>>,
}

impl SentimentCacheHandle {
    #[inline]
    pub fn new(cache: SentimentCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Locks the cache for compound operations.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, SentimentCache> {
        self.inner.lock()
    }

    #[inline]
    pub fn lookup(&self, text: &str) -> Option<SentimentTuple> {
        self.inner.lock().lookup(text)
    }

    #[inline]
    pub fn insert(&self, text: &str, sentiment: SentimentTuple, source: &str) -> bool {
        self.inner.lock().insert(text, sentiment, source)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    #[inline]
    pub fn flush(&self) -> SentimentResult<()> {
        self.inner.lock().flush()
    }
}

impl std::fmt::Debug for SentimentCacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentCacheHandle")
            .field("entries", &self.len())
            .finish()
    }
}
