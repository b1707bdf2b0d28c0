//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - An in-memory credential store with pluggable password hashing
//! - Signed, expiring session tokens
//! - Password and token authenticators and a role authorizer
//! - Guard middleware for protected routes

mod authenticator;
mod authorizer;
mod jwt;
mod middleware;
mod password;
/// Startup seeding of the credential store.
pub mod setup;
mod users;

pub use authenticator::{Authenticator, Principal, parse_basic_header};
pub use authorizer::{Decision, authorize};
pub use jwt::{Claims, IssuedToken, SessionIssuer, TokenError, TokenType};
pub use middleware::{AuthState, require_basic, require_bearer, require_role};
pub use password::{Argon2Hasher, CredentialHasher};
pub use users::{NewUser, Profile, PublicUser, User, UserStore};

use keygate_core::{Role, ValidationError};
use thiserror::Error;

/// Why a credential was rejected.
///
/// Only ever logged; clients see one uniform message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No credential was presented.
    MissingCredential,
    /// The header was present but not in the expected scheme.
    MalformedHeader,
    /// The username is not registered.
    UnknownUser,
    /// The password did not match.
    WrongPassword,
    /// The token failed signature or structural checks.
    InvalidToken,
    /// The token is past its expiry.
    Expired,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::MissingCredential => "missing credential",
            Self::MalformedHeader => "malformed authorization header",
            Self::UnknownUser => "unknown user",
            Self::WrongPassword => "wrong password",
            Self::InvalidToken => "invalid token",
            Self::Expired => "token expired",
        };
        f.write_str(reason)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential missing or rejected. The reason is never shown to clients.
    #[error("Missing or invalid credential")]
    Unauthenticated(RejectReason),

    /// Authenticated, but the role is insufficient.
    #[error("Permission denied: {required} role required")]
    Forbidden {
        /// The role the resource demands.
        required: Role,
    },

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// User already exists.
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Password hashing failed.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Token encoding failed.
    #[error("Token error: {0}")]
    Token(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether this error is a client credential failure.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }
}
