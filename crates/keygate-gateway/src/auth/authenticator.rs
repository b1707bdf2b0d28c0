//! Turning presented credentials into an identity.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use keygate_core::Role;
use serde::Serialize;

use super::jwt::{Claims, SessionIssuer};
use super::users::{User, UserStore};
use super::{AuthError, RejectReason};

/// An authenticated caller, attached to requests that pass a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Authenticated username.
    pub username: String,
    /// Role used for authorization.
    pub role: Role,
    /// Token issue time (bearer auth only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    /// Token expiry (bearer auth only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Principal for a password-authenticated user.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            issued_at: None,
            expires_at: None,
        }
    }

    /// Principal for a token holder. The role comes from the token.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims.sub.clone(),
            role: claims.role,
            issued_at: DateTime::from_timestamp(claims.iat, 0),
            expires_at: DateTime::from_timestamp(claims.exp, 0),
        }
    }

    /// Check if user is admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Verifies passwords and tokens against a store and an issuer.
#[derive(Debug, Clone, Copy)]
pub struct Authenticator<'a> {
    users: &'a UserStore,
    issuer: &'a SessionIssuer,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator.
    #[must_use]
    pub const fn new(users: &'a UserStore, issuer: &'a SessionIssuer) -> Self {
        Self { users, issuer }
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the user is unknown or the
    /// password is wrong.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.users
            .verify_password(username, password)
            .inspect_err(|e| log_rejection("password", username, e))
    }

    /// Check an `Authorization: Basic` header value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the header is absent, malformed,
    /// or carries bad credentials.
    pub fn verify_basic(&self, header: Option<&str>) -> Result<User, AuthError> {
        let header = header.ok_or(AuthError::Unauthenticated(RejectReason::MissingCredential))?;
        let (username, password) = parse_basic_header(header)
            .ok_or(AuthError::Unauthenticated(RejectReason::MalformedHeader))
            .inspect_err(|e| log_rejection("basic", "-", e))?;
        self.verify_password(&username, &password)
    }

    /// Check a token string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token is invalid or expired.
    pub fn verify_token(&self, token: &str) -> Result<Principal, AuthError> {
        self.issuer
            .validate(token)
            .map(|claims| Principal::from_claims(&claims))
            .map_err(|e| AuthError::Unauthenticated(e.into()))
            .inspect_err(|e| log_rejection("bearer", "-", e))
    }

    /// Check an `Authorization: Bearer` header value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the header is absent, malformed,
    /// or carries a bad token.
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let header = header.ok_or(AuthError::Unauthenticated(RejectReason::MissingCredential))?;
        let token = SessionIssuer::extract_from_header(header)
            .ok_or(AuthError::Unauthenticated(RejectReason::MalformedHeader))
            .inspect_err(|e| log_rejection("bearer", "-", e))?;
        self.verify_token(token)
    }
}

fn log_rejection(scheme: &str, username: &str, err: &AuthError) {
    match err {
        AuthError::Unauthenticated(reason) => {
            tracing::debug!(scheme, username, %reason, "credential rejected");
        }
        other => tracing::error!(scheme, error = %other, "authentication failed"),
    }
}

/// Decode an `Authorization: Basic` header into username and password.
///
/// The password may contain `:`; the username may not.
#[must_use]
pub fn parse_basic_header(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use crate::auth::users::NewUser;
    use keygate_core::SigningSecret;
    use std::sync::Arc;
    use std::time::Duration;

    fn fixtures() -> (UserStore, SessionIssuer) {
        let store = UserStore::new(Arc::new(test_hasher()));
        store.register(NewUser::new("user1", "password")).unwrap();
        store
            .register(NewUser::new("admin1", "password").with_role(Role::Admin))
            .unwrap();
        let issuer = SessionIssuer::new(&SigningSecret::generate(), Duration::from_secs(60), 0);
        (store, issuer)
    }

    fn basic(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[test]
    fn test_parse_basic_header() {
        assert_eq!(
            parse_basic_header(&basic("user1:password")),
            Some(("user1".to_string(), "password".to_string()))
        );
        assert_eq!(
            parse_basic_header(&basic("user1:pa:ss")),
            Some(("user1".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(
            parse_basic_header(&format!("basic {}", STANDARD.encode("a:b"))),
            Some(("a".to_string(), "b".to_string()))
        );
        assert_eq!(parse_basic_header(&basic("no-colon")), None);
        assert_eq!(parse_basic_header("Basic !!!notbase64"), None);
        assert_eq!(parse_basic_header("Bearer abc"), None);
        assert_eq!(parse_basic_header("Basic"), None);
    }

    #[test]
    fn test_verify_password() {
        let (store, issuer) = fixtures();
        let auth = Authenticator::new(&store, &issuer);

        assert_eq!(auth.verify_password("user1", "password").unwrap().role, Role::User);
        assert!(auth.verify_password("user1", "nope").is_err());
        assert!(auth.verify_password("ghost", "password").is_err());
    }

    #[test]
    fn test_verify_basic() {
        let (store, issuer) = fixtures();
        let auth = Authenticator::new(&store, &issuer);

        let user = auth.verify_basic(Some(&basic("admin1:password"))).unwrap();
        assert_eq!(user.username, "admin1");

        assert!(matches!(
            auth.verify_basic(None),
            Err(AuthError::Unauthenticated(RejectReason::MissingCredential))
        ));
        assert!(matches!(
            auth.verify_basic(Some("Basic garbage")),
            Err(AuthError::Unauthenticated(RejectReason::MalformedHeader))
        ));
        assert!(matches!(
            auth.verify_basic(Some(&basic("admin1:wrong"))),
            Err(AuthError::Unauthenticated(RejectReason::WrongPassword))
        ));
    }

    #[test]
    fn test_verify_bearer() {
        let (store, issuer) = fixtures();
        let auth = Authenticator::new(&store, &issuer);
        let issued = issuer.issue("admin1", Role::Admin).unwrap();

        let principal = auth
            .verify_bearer(Some(&format!("Bearer {}", issued.token)))
            .unwrap();
        assert_eq!(principal.username, "admin1");
        assert!(principal.is_admin());
        assert_eq!(principal.expires_at.map(|t| t.timestamp()), Some(issued.expires_at.timestamp()));

        assert!(matches!(
            auth.verify_bearer(None),
            Err(AuthError::Unauthenticated(RejectReason::MissingCredential))
        ));
        assert!(matches!(
            auth.verify_bearer(Some(&issued.token)),
            Err(AuthError::Unauthenticated(RejectReason::MalformedHeader))
        ));
        assert!(matches!(
            auth.verify_bearer(Some("Bearer not.a.token")),
            Err(AuthError::Unauthenticated(RejectReason::InvalidToken))
        ));
    }

    #[test]
    fn test_expired_bearer() {
        let (store, issuer) = fixtures();
        let auth = Authenticator::new(&store, &issuer);
        let issued = issuer
            .issue_at("user1", Role::User, Utc::now() - chrono::Duration::hours(2))
            .unwrap();

        assert!(matches!(
            auth.verify_token(&issued.token),
            Err(AuthError::Unauthenticated(RejectReason::Expired))
        ));
    }

    #[test]
    fn test_principal_from_user() {
        let (store, _) = fixtures();
        let principal = Principal::from_user(&store.lookup("user1").unwrap());
        assert_eq!(principal.username, "user1");
        assert_eq!(principal.role, Role::User);
        assert!(principal.expires_at.is_none());
    }
}
