//! Token signing secret handling.
//!
//! - `SigningSecret`: key bytes that are zeroized on drop and never logged
//! - `SigningSecret::parse`: accepts `hex:`-prefixed or raw text secrets

use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};
use thiserror::Error;

/// Minimum accepted secret length in bytes (HS256 key size).
pub const MIN_SECRET_LEN: usize = 32;

/// Prefix marking a hex-encoded secret.
const HEX_PREFIX: &str = "hex:";

/// Errors from secret parsing.
#[derive(Error, Debug)]
pub enum SecretError {
    /// Secret is shorter than `MIN_SECRET_LEN` bytes.
    #[error("Signing secret too short ({actual} bytes, need at least {MIN_SECRET_LEN})")]
    TooShort {
        /// Actual length in bytes.
        actual: usize,
    },

    /// Hex decoding failed.
    #[error("Invalid hex secret: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Process-wide token signing key.
///
/// The bytes are wrapped with `secrecy::SecretBox` so they are wiped on drop
/// and never show up in `Debug` output.
pub struct SigningSecret(SecretBox<Vec<u8>>);

impl SigningSecret {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::TooShort` if fewer than 32 bytes are given.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SecretError> {
        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                actual: bytes.len(),
            });
        }
        Ok(Self(SecretBox::new(Box::new(bytes))))
    }

    /// Parse a configured secret.
    ///
    /// `hex:<digits>` is decoded as hex, anything else is used as UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns error if hex decoding fails or the key is too short.
    pub fn parse(value: &str) -> Result<Self, SecretError> {
        let bytes = match value.strip_prefix(HEX_PREFIX) {
            Some(digits) => hex::decode(digits.trim())?,
            None => value.as_bytes().to_vec(),
        };
        Self::from_bytes(bytes)
    }

    /// Generate a random 256-bit secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; MIN_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(SecretBox::new(Box::new(bytes)))
    }

    /// Generate a random secret in the `hex:` config format.
    #[must_use]
    pub fn generate_config_value() -> String {
        let mut bytes = [0u8; MIN_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{HEX_PREFIX}{}", hex::encode(bytes))
    }

    /// Expose the key bytes for signing.
    ///
    /// Use sparingly - only when building signing keys.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}

impl std::fmt::Display for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw() {
        let secret = SigningSecret::parse("an-adequately-long-raw-text-secret!!").unwrap();
        assert_eq!(secret.expose(), b"an-adequately-long-raw-text-secret!!");
    }

    #[test]
    fn test_parse_hex() {
        let value = format!("hex:{}", "ab".repeat(32));
        let secret = SigningSecret::parse(&value).unwrap();
        assert_eq!(secret.expose(), &[0xab; 32][..]);
    }

    #[test]
    fn test_too_short() {
        let result = SigningSecret::parse("super-secret");
        assert!(matches!(result, Err(SecretError::TooShort { actual: 12 })));
    }

    #[test]
    fn test_bad_hex() {
        assert!(matches!(
            SigningSecret::parse("hex:zz"),
            Err(SecretError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_generate() {
        let a = SigningSecret::generate();
        let b = SigningSecret::generate();
        assert_eq!(a.expose().len(), MIN_SECRET_LEN);
        assert_ne!(a.expose(), b.expose());

        let value = SigningSecret::generate_config_value();
        assert!(SigningSecret::parse(&value).is_ok());
    }

    #[test]
    fn test_redacted() {
        let secret = SigningSecret::generate();
        assert_eq!(format!("{secret:?}"), "SigningSecret([REDACTED])");
        assert_eq!(secret.to_string(), "[REDACTED]");
    }
}
