//! Configuration loading and validation.
//!
//! Config is JSON5. Default location: `~/.keygate/keygate.json`, or
//! `$KEYGATE_STATE_DIR/keygate.json` when that variable is set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::types::Role;
use crate::validation::normalize_username;

/// Default access token lifetime in seconds (15 minutes).
const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 15 * 60;
/// Longest accepted access token lifetime in seconds (30 days).
pub const MAX_TOKEN_EXPIRY_SECS: u64 = 30 * 24 * 60 * 60;
/// Largest accepted clock leeway in seconds.
pub const MAX_LEEWAY_SECS: u64 = 5 * 60;
/// Default HTTP Basic realm.
const DEFAULT_BASIC_REALM: &str = "Authentication Required";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Users seeded into the credential store at startup.
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), seeds = config.users.len(), "loaded config");
        Ok(config)
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("keygate.json")
    }

    /// Get the Keygate state directory.
    ///
    /// Uses `KEYGATE_STATE_DIR` env var if set, otherwise `~/.keygate`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("KEYGATE_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".keygate")
        } else {
            PathBuf::from(".keygate")
        }
    }

    /// Apply overrides from `lookup`, then validate the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the overridden config is invalid.
    pub fn resolve(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        self.auth = self.auth.with_overrides_from(lookup);
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::Validation(
                "Gateway port cannot be 0".to_string(),
            ));
        }

        self.auth.validate()?;

        let mut seen = HashSet::new();
        for seed in &self.users {
            let username = normalize_username(&seed.username).map_err(|e| {
                ConfigError::Validation(format!("Seed user '{}': {e}", seed.username))
            })?;

            if !seen.insert(username) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate seed user '{}'",
                    seed.username
                )));
            }

            match (&seed.password_hash, &seed.password) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "Seed user '{}' needs exactly one of passwordHash or password",
                        seed.username
                    )));
                }
            }
        }

        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            cors: true,
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Request timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Token signing secret (`hex:`-prefixed or raw). Generated if not set.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// Clock skew tolerated when checking `exp`/`nbf`.
    #[serde(default)]
    pub leeway_secs: u64,

    /// Realm advertised in `WWW-Authenticate: Basic` challenges.
    #[serde(default = "default_basic_realm")]
    pub basic_realm: String,

    /// Login attempts allowed per username per minute.
    #[serde(default = "default_login_attempts")]
    pub login_attempts_per_minute: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry_secs: default_token_expiry(),
            leeway_secs: 0,
            basic_realm: default_basic_realm(),
            login_attempts_per_minute: default_login_attempts(),
        }
    }
}

impl AuthConfig {
    /// Create a new auth config builder.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Get token expiry as Duration.
    #[must_use]
    pub const fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_secs)
    }

    /// Apply environment variable overrides.
    ///
    /// | Variable                    | Field               |
    /// |-----------------------------|---------------------|
    /// | `KEYGATE_JWT_SECRET`        | `jwt_secret`        |
    /// | `KEYGATE_TOKEN_EXPIRY_SECS` | `token_expiry_secs` |
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secret) = lookup("KEYGATE_JWT_SECRET") {
            if !secret.is_empty() {
                self.jwt_secret = Some(secret);
            }
        }

        if let Some(raw) = lookup("KEYGATE_TOKEN_EXPIRY_SECS") {
            match raw.parse() {
                Ok(secs) => self.token_expiry_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid KEYGATE_TOKEN_EXPIRY_SECS"),
            }
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_expiry_secs == 0 {
            return Err(ConfigError::Validation(
                "Token expiry cannot be 0".to_string(),
            ));
        }
        if self.token_expiry_secs > MAX_TOKEN_EXPIRY_SECS {
            return Err(ConfigError::Validation(format!(
                "Token expiry cannot exceed {MAX_TOKEN_EXPIRY_SECS} seconds"
            )));
        }
        if self.leeway_secs > MAX_LEEWAY_SECS {
            return Err(ConfigError::Validation(format!(
                "Leeway cannot exceed {MAX_LEEWAY_SECS} seconds"
            )));
        }
        if self.login_attempts_per_minute == 0 {
            return Err(ConfigError::Validation(
                "Login attempts per minute cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Set token expiry in seconds.
    #[must_use]
    pub const fn token_expiry_secs(mut self, secs: u64) -> Self {
        self.config.token_expiry_secs = secs;
        self
    }

    /// Set clock leeway in seconds.
    #[must_use]
    pub const fn leeway_secs(mut self, secs: u64) -> Self {
        self.config.leeway_secs = secs;
        self
    }

    /// Set the Basic auth realm.
    #[must_use]
    pub fn basic_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.basic_realm = realm.into();
        self
    }

    /// Set the per-username login quota.
    #[must_use]
    pub const fn login_attempts_per_minute(mut self, attempts: u32) -> Self {
        self.config.login_attempts_per_minute = attempts;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}

/// A user seeded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    /// Login name.
    pub username: String,

    /// Role granted to the user.
    #[serde(default)]
    pub role: Role,

    /// Pre-computed password hash (PHC string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Plaintext password, hashed at startup. Development only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    5000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_token_expiry() -> u64 {
    DEFAULT_TOKEN_EXPIRY_SECS
}

fn default_basic_realm() -> String {
    DEFAULT_BASIC_REALM.to_string()
}

fn default_login_attempts() -> u32 {
    30
}
