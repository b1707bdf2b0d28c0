//! Role-based authorization.

use keygate_core::Role;

use super::AuthError;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The role satisfies the requirement.
    Allowed,
    /// The role is insufficient.
    Forbidden,
}

impl Decision {
    /// Convert into a `Result`, naming the missing role on denial.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when the decision is `Forbidden`.
    pub const fn into_result(self, required: Role) -> Result<(), AuthError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Forbidden => Err(AuthError::Forbidden { required }),
        }
    }
}

/// Decide whether `role` may access a resource requiring `required`.
///
/// Admin satisfies every requirement; user satisfies only user.
#[must_use]
pub fn authorize(role: Role, required: Role) -> Decision {
    if role.satisfies(required) {
        Decision::Allowed
    } else {
        tracing::debug!(%role, %required, "authorization denied");
        Decision::Forbidden
    }
}
