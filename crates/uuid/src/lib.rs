//! Occurrence identifiers.
//!
//! Every occurrence carries an identifier that is generated once, when the draft is
//! created, and never changes afterwards. The workspace uses a *canonical* textual form
//! for these identifiers: **32 lowercase hexadecimal characters** (no hyphens), which is
//! what `Uuid::new_v4().simple()` produces.
//!
//! The canonical form matters beyond storage: the human-facing reference number
//! (`OC-<year>-<suffix>`) is built from the last characters of the identifier, so two
//! spellings of the same UUID would yield different reference numbers.
//!
//! Externally supplied identifiers (CLI arguments, persisted payloads) must already be
//! canonical; see [`OccurrenceId::parse`].

mod id;

pub use id::{OccurrenceId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("invalid occurrence id: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
