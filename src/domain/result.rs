//! Result type alias
//!
//! Convenience alias using [`SyncError`] as the error type, used for every
//! fallible operation in the crate.

use super::errors::SyncError;

/// Result type alias for sync operations.
///
/// # Examples
///
/// ```
/// use shopsync::domain::result::Result;
/// use shopsync::domain::errors::SyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
