use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum OccurrenceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read local storage: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write local storage: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize occurrence records: {0}")]
    Serialization(serde_json::Error),
    #[error("stored occurrence payload is corrupt at {path}: {reason}")]
    Deserialization { path: String, reason: String },
    #[error("stored occurrence payload has unsupported version {found} (max supported {supported})")]
    UnsupportedPayloadVersion { found: u32, supported: u32 },

    #[error("field '{path}' cannot be set: {reason}")]
    InvalidField { path: String, reason: String },
    #[error("field '{0}' is immutable")]
    ImmutableField(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("wizard has already finished")]
    WizardFinished,

    #[error("invalid text: {0}")]
    Text(#[from] ocorrencia_types::TextError),
    #[error("invalid id: {0}")]
    Id(#[from] ocorrencia_uuid::IdError),
}

impl OccurrenceError {
    /// True for failures of the local storage layer (read, write, encode, decode).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageDirCreation(_)
                | Self::FileRead(_)
                | Self::FileWrite(_)
                | Self::Serialization(_)
                | Self::Deserialization { .. }
                | Self::UnsupportedPayloadVersion { .. }
        )
    }
}

pub type OccurrenceResult<T> = std::result::Result<T, OccurrenceError>;
