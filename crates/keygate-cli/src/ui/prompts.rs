//! Hidden-input prompts for credentials.

use dialoguer::{Password, theme::ColorfulTheme};
use keygate_core::validation::limits::MIN_PASSWORD_LENGTH;

/// Ask for an existing password.
pub fn password(prompt: &str) -> Result<String, dialoguer::Error> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
}

/// Ask for a new password twice, re-prompting until it is long enough.
pub fn new_password(prompt: &str) -> Result<String, dialoguer::Error> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .with_confirmation("Repeat password", "Passwords do not match")
        .validate_with(|input: &String| check_length(input))
        .interact()
}

fn check_length(input: &str) -> Result<(), String> {
    if input.chars().count() < MIN_PASSWORD_LENGTH {
        Err(format!("Use at least {MIN_PASSWORD_LENGTH} characters"))
    } else {
        Ok(())
    }
}
