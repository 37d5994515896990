//! Change detection over tracked files.
//!
//! A [`ChangeDetectionStore`] persists the last digest seen for each path. Checking a
//! path always records its fresh digest, so a change is reported exactly once: the
//! store is an edge trigger per run, not a history.


use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::hashing::digest;
use crate::storage::{StorageError, StorageResult, read_json, write_json_atomic};

/// Persisted `path -> digest` map.
#[derive(Debug, Clone)]
pub struct ChangeDetectionStore {
    path: PathBuf,
    digests: BTreeMap<String, String>,
    dirty: bool,
}

impl ChangeDetectionStore {
    /// Loads the digest map at `path` (empty if the file does not exist).
    ///
    /// A corrupt map is discarded with a warning: the worst outcome is that every
    /// tracked file is reported as changed once.
    pub fn load(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let digests = match read_json::<BTreeMap<String, String>>(&path) {
            Ok(Some(digests)) => digests,
            Ok(None) => BTreeMap::new(),
            Err(e @ StorageError::Parse { .. }) => {
                warn!(path = %path.display(), error = %e, "Discarding corrupt digest map");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        debug!(path = %path.display(), tracked = digests.len(), "Loaded digest map");

        Ok(Self {
            path,
            digests,
            dirty: false,
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored digest for `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&str> {
        self.digests.get(&Self::key(path)).map(String::as_str)
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Compares `content` against the stored digest for `path`.
    ///
    /// Returns `true` when the digest differs or the path was never seen. The stored
    /// digest is overwritten on every call.
    pub fn has_changed(&mut self, path: &Path, content: &[u8]) -> bool {
        let fresh = digest(content);
        let key = Self::key(path);
        let changed = self.digests.get(&key) != Some(&fresh);
        self.digests.insert(key, fresh);
        self.dirty = true;
        changed
    }

    /// Reads each path and returns the ones whose content changed since the last run.
    ///
    /// Unreadable files are skipped with a warning and never reported as changed.
    pub fn changed_files(&mut self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut changed = Vec::new();

        for path in paths {
            let content = match fs::read(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            if self.has_changed(path, &content) {
                info!(path = %path.display(), "Change detected");
                changed.push(path.clone());
            }
        }

        changed
    }

    /// Re-records the current digest of files this process just rewrote, so its own
    /// writes do not trigger the next run.
    pub fn acknowledge(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if let Ok(content) = fs::read(path) {
                self.has_changed(path, &content);
            }
        }
    }

    /// Drops the stored digests for `paths` so the next check reports them as changed.
    pub fn forget(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if self.digests.remove(&Self::key(path)).is_some() {
                self.dirty = true;
            }
        }
    }

    /// Writes the digest map atomically if it was modified.
    pub fn flush(&mut self) -> StorageResult<()> {
        if !self.dirty {
            return Ok(());
        }
        write_json_atomic(&self.path, &self.digests)?;
        self.dirty = false;
        Ok(())
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}
