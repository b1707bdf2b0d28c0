//! # Keygate Core
//!
//! Core types, configuration, and secrets for Keygate.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format)
//! - The `Role` type shared by the credential store and token claims
//! - Signing secret handling with zeroize-on-drop
//! - Username validation and normalization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;
pub mod types;
pub mod validation;

pub use config::{AuthConfig, Config, ConfigError, GatewayConfig, SeedUser};
pub use secrets::{SecretError, SigningSecret};
pub use types::Role;
pub use validation::{ValidationError, normalize_username};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AuthConfig, Config};
    pub use crate::secrets::SigningSecret;
    pub use crate::types::Role;
    pub use crate::validation::normalize_username;
}
