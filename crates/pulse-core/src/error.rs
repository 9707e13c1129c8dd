//! Unified error types for SocialPulse.
//!
//! Every component maps its failures into [`AppError`]. Most of them never
//! leave the component that produced them: they are logged and folded into
//! state (permission state, presence snapshot). Only
//! [`ErrorKind::InvalidArgument`] is returned to callers on API misuse.

use std::fmt;
use thiserror::Error;

/// Error categories used across the coordination layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// An identifier or argument was empty or malformed.
    InvalidArgument,
    /// The remote presence channel could not be opened.
    SubscriptionFailure,
    /// The platform denied notification permission.
    PermissionDenied,
    /// The push service could not issue a token.
    TokenAcquisition,
    /// The application backend rejected or did not accept a token.
    TokenRegistration,
    /// An inbound push payload is missing required fields.
    MalformedPayload,
    /// A collaborator is temporarily unavailable.
    ServiceUnavailable,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::SubscriptionFailure => write!(f, "SUBSCRIPTION_FAILURE"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::TokenAcquisition => write!(f, "TOKEN_ACQUISITION"),
            Self::TokenRegistration => write!(f, "TOKEN_REGISTRATION"),
            Self::MalformedPayload => write!(f, "MALFORMED_PAYLOAD"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout SocialPulse.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a subscription-failure error.
    pub fn subscription_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SubscriptionFailure, message)
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create a token-acquisition error.
    pub fn token_acquisition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenAcquisition, message)
    }

    /// Create a token-registration error.
    pub fn token_registration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenRegistration, message)
    }

    /// Create a malformed-payload error.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPayload, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether a retry may succeed where this attempt failed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ServiceUnavailable
                | ErrorKind::SubscriptionFailure
                | ErrorKind::TokenAcquisition
                | ErrorKind::TokenRegistration
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
