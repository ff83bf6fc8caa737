use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical occurrence identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to render in canonical form.
///
/// # Construction
/// - [`OccurrenceId::new`] generates a fresh identifier for a new draft.
/// - [`OccurrenceId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceId(Uuid);

impl Default for OccurrenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl OccurrenceId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// Hyphenated or uppercase spellings are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> IdResult<Self> {
        if !Self::is_canonical(input) {
            return Err(IdError::InvalidInput(format!(
                "id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| IdError::InvalidInput(e.to_string()))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the last `len` characters of the canonical form, upper-cased.
    ///
    /// `len` is clamped to the identifier length.
    pub fn upper_suffix(&self, len: usize) -> String {
        let canonical = self.0.simple().to_string();
        let start = canonical.len().saturating_sub(len);
        canonical[start..].to_ascii_uppercase()
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for OccurrenceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OccurrenceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for OccurrenceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for OccurrenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OccurrenceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_canonical_and_distinct() {
        let a = OccurrenceId::new();
        let b = OccurrenceId::new();
        assert!(OccurrenceId::is_canonical(&a.to_string()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = OccurrenceId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        for input in [
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400E29B41D4A716446655440000",
            "550e8400",
            "zz0e8400e29b41d4a716446655440000",
        ] {
            assert!(OccurrenceId::parse(input).is_err(), "accepted {input}");
        }
    }

    #[test]
    fn test_upper_suffix_takes_trailing_characters() {
        let id = OccurrenceId::parse("0123456789abcdef0123456789abab12").unwrap();
        assert_eq!(id.upper_suffix(4), "AB12");
        assert_eq!(id.upper_suffix(100).len(), 32);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_canonical_string() {
        let id = OccurrenceId::parse("0123456789abcdef0123456789abab12").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0123456789abcdef0123456789abab12\"");

        let back: OccurrenceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<OccurrenceId>("\"not-an-id\"").is_err());
    }
}
