//! Validated primitive types shared across the occurrence workspace.
//!
//! These wrappers guarantee an invariant once constructed, so the core can accept them
//! without re-checking:
//! - [`NonEmptyText`]: trimmed text with at least one visible character
//! - [`StorageNamespace`]: a namespace that is safe to embed in a local storage key

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,

    /// The input exceeded the maximum permitted length
    #[error("text exceeds maximum length of {max} characters")]
    TooLong { max: usize },

    /// The input contained characters outside the permitted set
    #[error("text contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction. Form
/// inputs that are blank after trimming are treated as absent, which is why the
/// location check on new occurrences goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns `Some` when `input` has visible content, `None` otherwise.
    pub fn from_optional(input: impl AsRef<str>) -> Option<Self> {
        Self::new(input).ok()
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Namespace under which the record store keeps its payload.
///
/// The namespace becomes part of a storage key (`<namespace>:ocorrencias`) and, for the
/// file backend, part of a file name. It is therefore restricted to a conservative ASCII
/// set: alphanumerics, `.`, `-` and `_`, at most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageNamespace(String);

impl StorageNamespace {
    pub const MAX_LEN: usize = 128;

    /// Validates and wraps a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`TextError`] if the namespace is blank, too long, or contains characters
    /// outside the permitted set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let namespace = input.as_ref().trim();

        if namespace.is_empty() {
            return Err(TextError::Empty);
        }

        if namespace.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }

        let ok = namespace
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok {
            return Err(TextError::InvalidCharacters);
        }

        Ok(Self(namespace.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the storage key for a collection held under this namespace.
    pub fn key_for(&self, collection: &str) -> String {
        format!("{}:{}", self.0, collection)
    }
}

impl fmt::Display for StorageNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StorageNamespace {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Boa Viagem ").unwrap();
        assert_eq!(text.as_str(), "Boa Viagem");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   \t"), Err(TextError::Empty));
        assert!(NonEmptyText::from_optional("").is_none());
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_blank() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"");
        assert!(err.is_err());

        let ok: NonEmptyText = serde_json::from_str("\" Recife \"").unwrap();
        assert_eq!(ok.as_str(), "Recife");
    }

    #[test]
    fn test_namespace_accepts_key_safe_ascii() {
        let ns = StorageNamespace::new("cbm-pe.v1_local").unwrap();
        assert_eq!(ns.key_for("ocorrencias"), "cbm-pe.v1_local:ocorrencias");
    }

    #[test]
    fn test_namespace_rejects_separators_and_paths() {
        assert_eq!(
            StorageNamespace::new("../etc"),
            Err(TextError::InvalidCharacters)
        );
        assert_eq!(
            StorageNamespace::new("a:b"),
            Err(TextError::InvalidCharacters)
        );
        assert_eq!(StorageNamespace::new(" "), Err(TextError::Empty));
    }

    #[test]
    fn test_namespace_rejects_overlong_input() {
        let long = "a".repeat(StorageNamespace::MAX_LEN + 1);
        assert_eq!(
            StorageNamespace::new(long),
            Err(TextError::TooLong {
                max: StorageNamespace::MAX_LEN
            })
        );
    }
}
