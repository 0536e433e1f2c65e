//! Key-value persistence for study state.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Byte storage addressed by a storage name.
pub trait StateBackend: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    fn store(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid storage key '{}'", key),
        )
        .into())
    }
}

/// Stores each key as `<root>/<key>.json`.
///
/// Writes go to a temporary file in `root` that is renamed over the old
/// value, so a reader never sees a partial file.
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    /// Creates a backend rooted at `root`; the directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the backend directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl StateBackend for DirectoryBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        check_key(key)?;
        let path = self.path_for(key);
        let copy_failed = |source: io::Error| Error::CopyFailed {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(copy_failed)?;
        let mut temp = NamedTempFile::new_in(&self.root).map_err(copy_failed)?;
        temp.write_all(bytes).map_err(copy_failed)?;
        temp.as_file().sync_all().map_err(copy_failed)?;
        temp.persist(&path).map_err(|e| copy_failed(e.error))?;
        Ok(())
    }
}

/// In-process backend, mainly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
