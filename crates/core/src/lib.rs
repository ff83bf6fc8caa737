//! # Ocorrência Core
//!
//! Core logic for recording fire-department occurrences in the field.
//!
//! This crate contains the record model and everything that happens to a record before it
//! reaches local storage:
//! - the two-step [`wizard`] that creates and edits occurrences
//! - nature resolution and dashboard field derivation
//! - dotted-path field changes coming from form renderers
//! - the namespaced local [`store`] with change notification
//!
//! **No platform concerns**: rendering, dialogs, GPS, camera and signature pads are
//! provided by the embedding application through [`wizard::WizardHost`] and the
//! [`capture`] traits.

pub mod capture;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod field_path;
pub mod nature;
pub mod occurrence;
pub mod store;
pub mod validation;
pub mod wizard;

pub use config::CoreConfig;
pub use error::{OccurrenceError, OccurrenceResult};
pub use nature::{resolve_active_nature, NatureKey};
pub use occurrence::{NatureDetails, OccurrenceDraft, OccurrenceRecord};
pub use store::{FileBackend, MemoryBackend, RecordStore, StorageBackend, Subscription};
pub use wizard::{Mode, Step, Wizard, WizardHost};

pub use ocorrencia_types::{NonEmptyText, StorageNamespace};
pub use ocorrencia_uuid::OccurrenceId;
