//! Basic-form validation.
//!
//! Only brand-new occurrences are validated before the first save. Edits of existing
//! records skip these checks so that older records with incomplete addresses can still
//! be updated; see [`crate::wizard::Wizard::submit`].

use crate::occurrence::OccurrenceDraft;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("informe ao menos a rua, o bairro ou um ponto de referência")]
    MissingLocation,
}

/// Checks the required fields of the basic form.
///
/// A location identifier is required: street, neighbourhood, or reference point. Blank
/// (whitespace-only) values do not count.
///
/// # Errors
///
/// Returns [`ValidationError::MissingLocation`] when no identifier is present.
pub fn validate_basic(draft: &OccurrenceDraft) -> Result<(), ValidationError> {
    if draft.location_identifier().is_none() {
        return Err(ValidationError::MissingLocation);
    }
    Ok(())
}
