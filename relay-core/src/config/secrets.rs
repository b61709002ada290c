//! Credential wrapper that never prints its value

use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// API key or token. `Debug` and `Display` print `[REDACTED]`; serde sees
/// the plain string so configs round-trip.
#[derive(Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short preview for logs: the provider prefix (`sk-`, `gsk_`) and the
    /// last four characters. Keys too short to preview are fully hidden.
    pub fn masked(&self) -> String {
        let key = self.0.as_str();
        if key.is_empty() {
            return "[EMPTY]".to_string();
        }
        if key.len() < 12 || !key.is_ascii() {
            return REDACTED.to_string();
        }

        let prefix = key
            .find(['-', '_'])
            .filter(|pos| *pos < 5)
            .map(|pos| &key[..=pos])
            .unwrap_or("");
        format!("{}...{}", prefix, &key[key.len() - 4..])
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_formatting_hides_value() {
        let secret = SecretString::new("sk-1234567890abcdef");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.to_string(), "[REDACTED]");
        assert_eq!(secret.expose_secret(), "sk-1234567890abcdef");
    }

    #[test_case("", "[EMPTY]")]
    #[test_case("short-key", "[REDACTED]")]
    #[test_case("sk-1234567890abcdef", "sk-...cdef")]
    #[test_case("gsk_abcdefghijkl", "gsk_...ijkl")]
    #[test_case("a0b1c2d3e4f5g6", "...f5g6")]
    fn test_masked(key: &str, expected: &str) {
        assert_eq!(SecretString::new(key).masked(), expected);
    }

    #[test]
    fn test_round_trips_through_yaml() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            api_key: SecretString,
        }

        let yaml = serde_yaml::to_string(&Holder {
            api_key: "my-api-key-value".into(),
        })
        .unwrap();
        assert!(yaml.contains("my-api-key-value"));

        let back: Holder = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.api_key.expose_secret(), "my-api-key-value");
    }
}
