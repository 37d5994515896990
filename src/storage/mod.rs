//! JSON document storage with crash-safe writes.
//!
//! Writes go to a temp file in the destination directory, are fsynced, and are then
//! renamed over the target, so readers never observe a half-written document.

pub mod error;


pub use error::{StorageError, StorageResult};

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

/// Reads and parses a JSON document.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Serializes `value` as pretty JSON with a trailing newline and atomically replaces
/// `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let mut bytes =
        serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialization {
            path: path.to_path_buf(),
            source,
        })?;
    bytes.push(b'\n');
    write_bytes_atomic(path, &bytes)
}

/// Atomically replaces `path` with `bytes` (temp file + fsync + rename).
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let io_err = |source: io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        writer.write_all(bytes).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }
    temp.as_file().sync_all().map_err(io_err)?;

    temp.persist(path).map_err(|e| StorageError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.error.to_string(),
    })?;

    Ok(())
}
