//! Password hashing.
//!
//! The credential store only ever sees hashes. The scheme sits behind
//! `CredentialHasher` so deployments can swap it; Argon2id is the default.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use super::AuthError;

/// One-way password hashing scheme.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the scheme fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check `password` against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for unusable
    /// hashes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the stored hash cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;

    /// Check that a stored hash is one this scheme can verify against.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` describing why the hash is unusable.
    fn check_hash(&self, hash: &str) -> Result<(), AuthError>;
}

/// Argon2id hasher producing PHC strings.
///
/// Verification reads the parameters embedded in the stored hash, so hashes
/// made with other cost settings still verify.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Create a hasher with the crate's default (OWASP) parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the parameters are out of range.
    pub fn with_params(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(m_cost_kib, t_cost, p_cost, None)
            .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(format!("Password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = parse_phc(hash)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(format!("Verification failed: {e}"))),
        }
    }

    fn check_hash(&self, hash: &str) -> Result<(), AuthError> {
        let parsed = parse_phc(hash)?;
        Algorithm::try_from(parsed.algorithm)
            .map(|_| ())
            .map_err(|e| AuthError::Hashing(format!("Not an Argon2 hash: {e}")))
    }
}

fn parse_phc(hash: &str) -> Result<PasswordHash<'_>, AuthError> {
    PasswordHash::new(hash).map_err(|e| AuthError::Hashing(format!("Invalid hash: {e}")))
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    // Minimum-cost parameters keep the suite fast.
    Argon2Hasher::with_params(8, 1, 1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("password", &hash).unwrap());
        assert!(!hasher.verify("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_salted() {
        let hasher = test_hasher();
        let a = hasher.hash("password").unwrap();
        let b = hasher.hash("password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cross_params_verify() {
        let hash = test_hasher().hash("password").unwrap();
        assert!(Argon2Hasher::new().verify("password", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash() {
        let result = test_hasher().verify("password", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn test_check_hash() {
        let hasher = test_hasher();
        assert!(hasher.check_hash(&hasher.hash("password").unwrap()).is_ok());
        assert!(matches!(
            hasher.check_hash("not-a-phc-hash"),
            Err(AuthError::Hashing(_))
        ));
        assert!(hasher.check_hash("$pbkdf2-sha256$i=1000$c2FsdA$aGFzaA").is_err());
    }

    #[test]
    fn test_invalid_params() {
        assert!(Argon2Hasher::with_params(0, 0, 0).is_err());
    }
}
