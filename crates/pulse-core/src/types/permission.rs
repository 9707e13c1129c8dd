//! Notification permission state.

use serde::{Deserialize, Serialize};

/// Mirror of the platform notification permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// The user has not been asked yet.
    #[default]
    Default,
    /// Notifications are allowed.
    Granted,
    /// Notifications are blocked; terminal for the session.
    Denied,
}

impl PermissionState {
    /// Parses from a string, falling back to [`PermissionState::Default`].
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            _ => Self::Default,
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        assert_eq!(PermissionState::from_str_or_default("GRANTED"), PermissionState::Granted);
        assert_eq!(PermissionState::from_str_or_default("denied"), PermissionState::Denied);
        assert_eq!(PermissionState::from_str_or_default("prompt"), PermissionState::Default);
        assert_eq!(PermissionState::Denied.as_str(), "denied");
    }
}
