//! Constants used throughout the occurrence core crate.
//!
//! Storage names, wire labels, and defaults live here so that the store, the wizard and
//! the CLI agree on them.

/// Default directory for local storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "ocorrencia_data";

/// Default storage namespace.
pub const DEFAULT_NAMESPACE: &str = "ocorrencias.local";

/// Collection name appended to the namespace to form the storage key.
pub const RECORDS_COLLECTION: &str = "ocorrencias";

/// Current version of the persisted records envelope.
pub const PAYLOAD_VERSION: u32 = 1;

/// File extension used by the file backend for stored keys.
pub const STORAGE_FILE_EXTENSION: &str = "json";

/// Priority recorded on the dashboard when the form leaves it blank.
pub const DEFAULT_PRIORITY: &str = "Média";

/// Dashboard type label for occurrences without an active nature.
pub const BASIC_OCCURRENCE_LABEL: &str = "Ocorrência Básica";

/// Prefix of generated reference numbers (`OC-<year>-<suffix>`).
pub const REFERENCE_PREFIX: &str = "OC";

/// Number of trailing id characters used in generated reference numbers.
pub const REFERENCE_SUFFIX_LEN: usize = 4;

/// Submit button labels handed to form renderers.
pub const SUBMIT_LABEL_SAVE: &str = "Salvar";
pub const SUBMIT_LABEL_NEXT: &str = "Próximo";
pub const SUBMIT_LABEL_FINISH: &str = "Finalizar";
