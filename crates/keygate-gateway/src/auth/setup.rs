//! Populating the credential store at startup.

use keygate_core::{Role, SeedUser};
use rand::Rng;

use super::AuthError;
use super::users::{NewUser, User, UserStore};

/// Password shared by the demo accounts.
pub const DEMO_PASSWORD: &str = "password";

/// Insert users from configuration.
///
/// Returns how many were added.
///
/// # Errors
///
/// Returns error on invalid or duplicate usernames, or if hashing fails.
pub fn seed_users(store: &UserStore, seeds: &[SeedUser]) -> Result<usize, AuthError> {
    for seed in seeds {
        match (&seed.password_hash, &seed.password) {
            (Some(hash), _) => store.insert(User::from_hash(&seed.username, hash, seed.role)?)?,
            (None, Some(password)) => {
                tracing::warn!(
                    username = %seed.username,
                    "seed user has a plaintext password; use passwordHash outside development"
                );
                store.register(NewUser::new(&seed.username, password).with_role(seed.role))?;
            }
            (None, None) => {
                return Err(AuthError::Config(format!(
                    "Seed user '{}' has no password",
                    seed.username
                )));
            }
        }
    }

    if !seeds.is_empty() {
        tracing::info!(count = seeds.len(), "seeded users from config");
    }
    Ok(seeds.len())
}

/// Insert the demo accounts `user1` (user) and `admin1` (admin).
///
/// Accounts that already exist are left alone.
///
/// # Errors
///
/// Returns error if hashing fails.
pub fn seed_demo_users(store: &UserStore) -> Result<(), AuthError> {
    for (username, role) in [("user1", Role::User), ("admin1", Role::Admin)] {
        match store.register(NewUser::new(username, DEMO_PASSWORD).with_role(role)) {
            Ok(_) | Err(AuthError::UserExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    tracing::warn!("demo users seeded with a well-known password");
    Ok(())
}

/// Create an admin from `KEYGATE_ADMIN_USERNAME` / `KEYGATE_ADMIN_PASSWORD`.
///
/// Only runs when the store is empty.
///
/// # Errors
///
/// Returns error if user creation fails.
pub fn auto_setup_from_env(store: &UserStore) -> Result<Option<User>, AuthError> {
    bootstrap_admin(
        store,
        std::env::var("KEYGATE_ADMIN_USERNAME").ok(),
        std::env::var("KEYGATE_ADMIN_PASSWORD").ok(),
    )
}

fn bootstrap_admin(
    store: &UserStore,
    username: Option<String>,
    password: Option<String>,
) -> Result<Option<User>, AuthError> {
    if !store.is_empty() {
        return Ok(None);
    }

    let (Some(username), Some(password)) = (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        return Ok(None);
    };

    let admin = store.register(NewUser::new(username, password).with_role(Role::Admin))?;
    tracing::info!(
        username = %admin.username,
        "Admin user created from environment variables"
    );
    Ok(Some(admin))
}

/// Generate a random password.
#[must_use]
pub fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{CredentialHasher, test_hasher};
    use std::sync::Arc;

    fn store() -> UserStore {
        UserStore::new(Arc::new(test_hasher()))
    }

    fn seed(username: &str, role: Role, hash: Option<String>, password: Option<&str>) -> SeedUser {
        SeedUser {
            username: username.to_string(),
            role,
            password_hash: hash,
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_seed_from_hash_and_plaintext() {
        let store = store();
        let hash = test_hasher().hash("hunter22").unwrap();
        let seeds = vec![
            seed("admin1", Role::Admin, Some(hash), None),
            seed("user1", Role::User, None, Some("password")),
        ];

        assert_eq!(seed_users(&store, &seeds).unwrap(), 2);
        assert!(store.verify_password("admin1", "hunter22").is_ok());
        assert!(store.verify_password("user1", "password").is_ok());
        assert_eq!(store.lookup("admin1").unwrap().role, Role::Admin);
    }

    #[test]
    fn test_seed_duplicate_fails() {
        let store = store();
        let seeds = vec![
            seed("dup", Role::User, None, Some("password")),
            seed("dup", Role::User, None, Some("password")),
        ];
        assert!(matches!(
            seed_users(&store, &seeds),
            Err(AuthError::UserExists(_))
        ));
    }

    #[test]
    fn test_seed_without_password() {
        let store = store();
        let seeds = vec![seed("nopass", Role::User, None, None)];
        assert!(matches!(
            seed_users(&store, &seeds),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_demo_users() {
        let store = store();
        seed_demo_users(&store).unwrap();
        // Idempotent
        seed_demo_users(&store).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("admin1").unwrap().role, Role::Admin);
        assert_eq!(store.lookup("user1").unwrap().role, Role::User);
        assert!(store.verify_password("admin1", DEMO_PASSWORD).is_ok());
    }

    #[test]
    fn test_bootstrap_admin() {
        let store = store();
        let admin = bootstrap_admin(&store, Some("root".into()), Some("s3cret-pass".into()))
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(store.verify_password("root", "s3cret-pass").is_ok());
    }

    #[test]
    fn test_bootstrap_skipped() {
        let store = store();
        assert!(bootstrap_admin(&store, None, Some("x".into())).unwrap().is_none());
        assert!(bootstrap_admin(&store, Some(String::new()), Some("x".into())).unwrap().is_none());

        seed_demo_users(&store).unwrap();
        assert!(
            bootstrap_admin(&store, Some("root".into()), Some("pw".into()))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_generate_password() {
        let a = generate_password(24);
        let b = generate_password(24);
        assert_eq!(a.chars().count(), 24);
        assert_ne!(a, b);
    }
}
