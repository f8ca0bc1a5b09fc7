use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

const MAX_LENGTH: usize = 32;

/// A validated short key identifying one URL mapping.
///
/// Short keys are 1-32 characters of `[a-zA-Z0-9_-]`, which keeps them
/// safe to embed in a URL path segment without escaping.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShortKey(SmolStr);

impl ShortKey {
    /// Creates a new `ShortKey` after validating the input.
    pub fn new(key: impl Into<String>) -> Result<Self, CoreError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(SmolStr::new(key)))
    }

    /// Creates a `ShortKey` without validation.
    ///
    /// Use this only for keys produced by trusted internal sources
    /// (the codec is guaranteed to emit valid output).
    pub fn new_unchecked(key: impl AsRef<str>) -> Self {
        Self(SmolStr::new(key.as_ref()))
    }

    /// Returns the short key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full shortened URL under the given base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    fn validate(key: &str) -> Result<(), CoreError> {
        if key.is_empty() || key.len() > MAX_LENGTH {
            return Err(CoreError::InvalidShortKey(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH,
                key.len()
            )));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortKey(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortKey").field(&self.0).finish()
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShortKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        ShortKey::new(s.as_str()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys() {
        assert!(ShortKey::new("a").is_ok());
        assert!(ShortKey::new("Abc-123_xyz").is_ok());
        assert!(ShortKey::new("a".repeat(32)).is_ok());
    }

    #[test]
    fn empty_key() {
        assert!(ShortKey::new("").is_err());
    }

    #[test]
    fn too_long() {
        assert!(ShortKey::new("a".repeat(33)).is_err());
    }

    #[test]
    fn invalid_characters() {
        assert!(ShortKey::new("abc def").is_err());
        assert!(ShortKey::new("abc/def").is_err());
        assert!(ShortKey::new("abc!def").is_err());
    }

    #[test]
    fn to_url_joins_with_single_slash() {
        let key = ShortKey::new("abc123").unwrap();
        assert_eq!(key.to_url("https://curta.il"), "https://curta.il/abc123");
        assert_eq!(key.to_url("https://curta.il/"), "https://curta.il/abc123");
    }

    #[test]
    fn display_matches_as_str() {
        let key = ShortKey::new("my-key").unwrap();
        assert_eq!(key.to_string(), key.as_str());
    }
}
