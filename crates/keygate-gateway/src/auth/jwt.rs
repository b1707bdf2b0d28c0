//! Session token issuance and validation.
//!
//! Tokens are HS256 JWTs. Only the signing secret is needed to check one;
//! nothing is stored server-side.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use keygate_core::{AuthConfig, Role, SigningSecret};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AuthError, RejectReason};

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,
    /// Role at issuance time.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Not valid before (Unix timestamp).
    pub nbf: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
    /// Token type.
    #[serde(rename = "type", default)]
    pub token_type: TokenType,
}

/// Token type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token for API calls.
    #[default]
    Access,
}

/// Token validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token was well-formed and signed but has expired.
    #[error("Token expired")]
    Expired,

    /// Bad signature, bad structure, or a rejected claim.
    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<TokenError> for RejectReason {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Expired,
            TokenError::Invalid(_) => Self::InvalidToken,
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,
    /// When it stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Creates and validates session tokens.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl SessionIssuer {
    /// Create an issuer from a signing secret.
    #[must_use]
    pub fn new(secret: &SigningSecret, expiry: Duration, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
            validation,
            expiry,
        }
    }

    /// Create an issuer from auth configuration.
    ///
    /// Without a configured secret a random one is generated; tokens then do
    /// not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the configured secret is unusable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = match &config.jwt_secret {
            Some(raw) => SigningSecret::parse(raw)
                .map_err(|e| AuthError::Config(format!("Invalid signing secret: {e}")))?,
            None => {
                tracing::warn!(
                    "No signing secret configured; generated an ephemeral one. \
                     Tokens will be invalidated on restart."
                );
                SigningSecret::generate()
            }
        };

        Ok(Self::new(&secret, config.token_expiry(), config.leeway_secs))
    }

    /// Token lifetime.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue a token for an authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn issue(&self, identity: &str, role: Role) -> Result<IssuedToken, AuthError> {
        self.issue_at(identity, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the expiry cannot be represented, or
    /// `AuthError::Token` if encoding fails.
    pub fn issue_at(
        &self,
        identity: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let lifetime = chrono::Duration::from_std(self.expiry)
            .map_err(|e| AuthError::Config(format!("Token expiry out of range: {e}")))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| AuthError::Config("Token expiry overflows the clock".to_string()))?;

        let claims = Claims {
            sub: identity.to_string(),
            role,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: generate_token_id(),
            token_type: TokenType::Access,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(format!("Encoding failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate and decode a token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for expired tokens and
    /// `TokenError::Invalid` for everything else that fails.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Extract token from Authorization header.
    ///
    /// Expects format: "Bearer <token>"
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("expiry", &self.expiry)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

fn generate_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
