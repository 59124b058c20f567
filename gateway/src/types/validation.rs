//! Shared path-segment validation (spec §6/§4.5): every `{var}` path segment must
//! match `[A-Za-z0-9_-]+`.

use crate::types::error::AppError;

#[must_use]
pub fn is_valid_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates `name` and returns `AppError::invalid_argument` naming `field` if it
/// doesn't match the path-segment charset.
pub fn require_valid_segment(name: &str, field: &str) -> Result<(), AppError> {
    if is_valid_segment(name) {
        Ok(())
    } else {
        Err(AppError::invalid_argument(format!("{field} must match [A-Za-z0-9_-]+")))
    }
}
