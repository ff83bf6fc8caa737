//! Key-value storage backends.
//!
//! The record store keeps its whole payload under one key. A backend only has to read and
//! replace a string value atomically; the store owns the format.

use crate::constants::STORAGE_FILE_EXTENSION;
use crate::{OccurrenceError, OccurrenceResult};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Local single-user key-value storage.
pub trait StorageBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` if nothing was ever written.
    fn read(&self, key: &str) -> OccurrenceResult<Option<String>>;

    /// Replaces the value stored under `key`.
    ///
    /// Implementations must not leave a partially written value visible to `read`.
    fn write(&self, key: &str, value: &str) -> OccurrenceResult<()>;
}

/// Stores each key as a JSON file under a root directory.
///
/// Writes go to a temporary sibling file that is then renamed over the target, so a
/// failed write leaves the previous payload intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `key`. `:` is not portable in file names, so it becomes `__`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}",
            key.replace(':', "__"),
            STORAGE_FILE_EXTENSION
        ))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> OccurrenceResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OccurrenceError::FileRead(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> OccurrenceResult<()> {
        fs::create_dir_all(&self.root).map_err(OccurrenceError::StorageDirCreation)?;

        let target = self.path_for(key);
        let tmp = target.with_extension(format!("{STORAGE_FILE_EXTENSION}.tmp"));

        fs::write(&tmp, value).map_err(OccurrenceError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(OccurrenceError::FileWrite(e));
        }
        Ok(())
    }
}

/// In-process storage, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `key` with a raw value, bypassing the store's encoder.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> OccurrenceResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> OccurrenceResult<()> {
        self.insert_raw(key, value);
        Ok(())
    }
}
