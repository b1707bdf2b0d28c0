//! Input validation and normalization.
//!
//! Usernames arrive through JSON bodies, HTTP Basic headers and seed config;
//! all of them go through `normalize_username` before touching the store.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Input exceeds maximum allowed length.
    #[error("{field} exceeds maximum length ({max} characters, got {actual})")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
        /// Actual input length.
        actual: usize,
    },

    /// Disallowed characters in input.
    #[error("{field} contains disallowed characters")]
    DisallowedChars {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Size limits per input type.
pub mod limits {
    /// Maximum username length in characters.
    pub const MAX_USERNAME_LENGTH: usize = 64;

    /// Minimum password length for new accounts.
    pub const MIN_PASSWORD_LENGTH: usize = 8;

    /// Maximum password length (bounds hashing cost).
    pub const MAX_PASSWORD_LENGTH: usize = 1024;
}

/// Validate and normalize a username.
///
/// Performs:
/// 1. Unicode normalization (NFC, so visually equal names map to one key)
/// 2. Emptiness and length checks
/// 3. Rejects control characters and `:` (the HTTP Basic separator)
///
/// # Errors
///
/// Returns a `ValidationError` describing the first failed check.
pub fn normalize_username(input: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "username";

    let normalized: String = input.nfc().collect();

    if normalized.is_empty() {
        return Err(ValidationError::Empty { field: FIELD });
    }

    let len = normalized.chars().count();
    if len > limits::MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: limits::MAX_USERNAME_LENGTH,
            actual: len,
        });
    }

    if normalized.chars().any(|c| c.is_control() || c == ':') {
        return Err(ValidationError::DisallowedChars { field: FIELD });
    }

    Ok(normalized)
}
