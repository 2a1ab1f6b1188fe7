//! Convenience result type alias for TickRelay.

use crate::error::AppError;

/// A specialized `Result` type for TickRelay operations.
pub type AppResult<T> = Result<T, AppError>;
