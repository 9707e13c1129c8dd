//! Convenience result type alias for SocialPulse.

use crate::error::AppError;

/// A specialized `Result` type for SocialPulse operations.
pub type AppResult<T> = Result<T, AppError>;
