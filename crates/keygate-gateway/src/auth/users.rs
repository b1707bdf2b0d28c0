//! User model and storage.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, Utc};
use keygate_core::{Role, normalize_username};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::password::{Argon2Hasher, CredentialHasher};
use super::{AuthError, RejectReason};

/// Verified against when the username is unknown, so misses cost the same
/// as wrong passwords.
const DUMMY_PASSWORD: &str = "keygate-timing-equalizer";

/// Optional descriptive fields attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// City of residence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// User account.
#[derive(Clone)]
pub struct User {
    /// Normalized login name.
    pub username: String,
    /// PHC password hash. Never serialized.
    pub password_hash: String,
    /// Granted role.
    pub role: Role,
    /// Descriptive profile.
    pub profile: Profile,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a user from an already-computed hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the username is invalid.
    pub fn from_hash(
        username: &str,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            username: normalize_username(username)?,
            password_hash: password_hash.into(),
            role,
            profile: Profile::default(),
            created_at: Utc::now(),
        })
    }

    /// Create a safe version of user for API responses (no password hash).
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            username: self.username.clone(),
            role: self.role,
            profile: self.profile.clone(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Public user info (safe for API responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Login name.
    pub username: String,
    /// Granted role.
    pub role: Role,
    /// Profile fields, flattened into the object.
    #[serde(flatten)]
    pub profile: Profile,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A registration request that has not been hashed yet.
#[derive(Debug)]
pub struct NewUser {
    /// Requested login name (normalized on insert).
    pub username: String,
    /// Plaintext password, wiped on drop.
    pub password: Zeroizing<String>,
    /// Role to grant.
    pub role: Role,
    /// Profile fields.
    pub profile: Profile,
}

impl NewUser {
    /// Registration with default role and empty profile.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
            role: Role::User,
            profile: Profile::default(),
        }
    }

    /// Set the role.
    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the profile.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }
}

/// In-memory user storage.
///
/// Keys are normalized usernames. Readers run concurrently; inserts take the
/// write lock, so check-and-insert is atomic.
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_hash: OnceLock<String>,
}

impl UserStore {
    /// Create an empty store using the given hasher.
    #[must_use]
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            hasher,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Create an empty store hashing with Argon2id defaults.
    #[must_use]
    pub fn with_argon2() -> Self {
        Self::new(Arc::new(Argon2Hasher::new()))
    }

    /// The hasher used for this store.
    #[must_use]
    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.hasher.as_ref()
    }

    /// Look up a user by name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if absent, or a storage error if the
    /// lock is poisoned.
    pub fn lookup(&self, username: &str) -> Result<User, AuthError> {
        let key = normalize_username(username)
            .map_err(|_| AuthError::UserNotFound(username.to_string()))?;
        let users = self
            .users
            .read()
            .map_err(|e| AuthError::Storage(format!("Lock poisoned: {e}")))?;
        users
            .get(&key)
            .cloned()
            .ok_or(AuthError::UserNotFound(key))
    }

    /// Check whether a user exists.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lock is poisoned.
    pub fn contains(&self, username: &str) -> Result<bool, AuthError> {
        match self.lookup(username) {
            Ok(_) => Ok(true),
            Err(AuthError::UserNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Insert a user whose password is already hashed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the stored hash is unusable, or
    /// `AuthError::UserExists` if the name is taken.
    pub fn insert(&self, user: User) -> Result<(), AuthError> {
        self.hasher.check_hash(&user.password_hash).map_err(|e| {
            AuthError::Hashing(format!("User '{}' has an unusable hash: {e}", user.username))
        })?;

        let mut users = self
            .users
            .write()
            .map_err(|e| AuthError::Storage(format!("Lock poisoned: {e}")))?;

        match users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::UserExists(user.username)),
            Entry::Vacant(slot) => {
                tracing::info!(username = %user.username, role = %user.role, "user added");
                slot.insert(user);
                Ok(())
            }
        }
    }

    /// Hash a password and register a new user.
    ///
    /// Hashing runs before the write lock is taken.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad usernames, `AuthError::UserExists`
    /// if the name is taken, or a hashing error.
    pub fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        let username = normalize_username(&new_user.username)?;

        // Cheap pre-check; `insert` re-checks under the lock.
        if self.contains(&username)? {
            return Err(AuthError::UserExists(username));
        }

        let password_hash = self.hasher.hash(&new_user.password)?;
        let user = User {
            username,
            password_hash,
            role: new_user.role,
            profile: new_user.profile,
            created_at: Utc::now(),
        };
        self.insert(user.clone())?;
        Ok(user)
    }

    /// Verify a username/password pair.
    ///
    /// Unknown users still pay for one hash verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` on any mismatch.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = match self.lookup(username) {
            Ok(user) => user,
            Err(AuthError::UserNotFound(_)) => {
                self.burn_dummy_verification(password);
                return Err(AuthError::Unauthenticated(RejectReason::UnknownUser));
            }
            Err(e) => return Err(e),
        };

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AuthError::Unauthenticated(RejectReason::WrongPassword)),
            Err(e) => {
                tracing::error!(username = %user.username, error = %e, "stored hash failed to verify");
                Err(AuthError::Unauthenticated(RejectReason::WrongPassword))
            }
        }
    }

    fn burn_dummy_verification(&self, password: &str) {
        let hash = match self.dummy_hash.get() {
            Some(hash) => hash,
            None => match self.hasher.hash(DUMMY_PASSWORD) {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(_) => return,
            },
        };
        let _ = self.hasher.verify(password, hash);
    }

    /// All usernames, sorted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lock is poisoned.
    pub fn usernames(&self) -> Result<Vec<String>, AuthError> {
        let users = self
            .users
            .read()
            .map_err(|e| AuthError::Storage(format!("Lock poisoned: {e}")))?;
        let mut names: Vec<String> = users.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("user_count", &self.len())
            .finish_non_exhaustive()
    }
}
