//! Hash-password command - produce `passwordHash` values for seed config.

use anyhow::{Result, bail};
use keygate_core::validation::limits::MIN_PASSWORD_LENGTH;
use keygate_gateway::auth::{Argon2Hasher, CredentialHasher, setup::generate_password};

use crate::ui;

const GENERATED_LENGTH: usize = 20;

/// Hash a password given on the command line, generated, or prompted for.
///
/// # Errors
///
/// Returns error if the prompt fails, the password is too short, or hashing
/// fails.
pub fn run_hash_password(password: Option<String>, generate: bool) -> Result<()> {
    let password = if generate {
        let generated = generate_password(GENERATED_LENGTH);
        ui::kv("Password", &generated);
        generated
    } else if let Some(password) = password {
        password
    } else {
        ui::prompts::new_password("Password")?
    };

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        bail!("Password must be at least {MIN_PASSWORD_LENGTH} characters");
    }

    let hash = Argon2Hasher::new().hash(&password)?;
    ui::success("Use this as passwordHash in the users section of the config");
    println!("{hash}");
    Ok(())
}
