//! Validated user identifier.
//!
//! A [`UserId`] is the last segment of a remote presence key, so it must be
//! non-empty and must not contain characters that are reserved in key paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Characters the remote store reserves in key segments.
const RESERVED: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Identifier of a tracked user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parse and validate a user identifier.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.trim().is_empty() {
            return Err(AppError::invalid_argument("user id must not be empty"));
        }
        if let Some(c) = raw.chars().find(|c| RESERVED.contains(c) || c.is_control()) {
            return Err(AppError::invalid_argument(format!(
                "user id '{raw}' contains reserved character {c:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> String {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_valid() {
        let id = UserId::parse("u1").expect("valid id");
        assert_eq!(id.as_str(), "u1");
        assert_eq!(id.to_string(), "u1");
    }

    #[test]
    fn test_empty_is_invalid_argument() {
        let err = UserId::parse("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        let err = UserId::parse("   ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_reserved_characters_rejected() {
        for raw in ["a/b", "a.b", "a#b", "a$b", "a[b", "a]b"] {
            let err = UserId::parse(raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{raw}");
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: UserId = serde_json::from_str("\"alice\"").expect("deserialize");
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }
}
