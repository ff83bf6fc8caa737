//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the record store as
//! a reference. Core code never reads environment variables itself; the binary
//! that embeds the core decides where values come from.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_NAMESPACE, RECORDS_COLLECTION};
use crate::OccurrenceResult;
use ocorrencia_types::StorageNamespace;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    namespace: StorageNamespace,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(data_dir: PathBuf, namespace: StorageNamespace) -> Self {
        Self {
            data_dir,
            namespace,
        }
    }

    /// Build a configuration from optional raw values, applying defaults.
    ///
    /// Blank values count as absent. The namespace is validated.
    ///
    /// # Errors
    ///
    /// Returns `OccurrenceError::Text` if the namespace is not key-safe.
    pub fn from_values(
        data_dir: Option<String>,
        namespace: Option<String>,
    ) -> OccurrenceResult<Self> {
        let data_dir = data_dir
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let namespace = namespace
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Ok(Self::new(
            PathBuf::from(data_dir),
            StorageNamespace::new(namespace)?,
        ))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn namespace(&self) -> &StorageNamespace {
        &self.namespace
    }

    /// Storage key holding the occurrence records payload.
    pub fn records_key(&self) -> String {
        self.namespace.key_for(RECORDS_COLLECTION)
    }
}
