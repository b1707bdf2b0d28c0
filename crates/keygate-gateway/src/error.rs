//! HTTP error responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// Authentication scheme advertised on a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// `WWW-Authenticate: Basic realm="..."`.
    Basic {
        /// Protection space name.
        realm: String,
    },
    /// `WWW-Authenticate: Bearer`.
    Bearer,
    /// No challenge header (login endpoint).
    None,
}

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid request body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or rejected credential.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Client-facing message, uniform per scheme.
        message: &'static str,
        /// Challenge to send back.
        challenge: Challenge,
    },

    /// Authenticated but not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Anything else. The detail is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// 401 for a failed bearer check.
    #[must_use]
    pub const fn bearer() -> Self {
        Self::Unauthenticated {
            message: "Missing or invalid token",
            challenge: Challenge::Bearer,
        }
    }

    /// 401 for a failed HTTP Basic check.
    #[must_use]
    pub fn basic(realm: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: "Missing or invalid credentials",
            challenge: Challenge::Basic {
                realm: realm.into(),
            },
        }
    }

    /// 401 for a failed login.
    #[must_use]
    pub const fn invalid_login() -> Self {
        Self::Unauthenticated {
            message: "Invalid credentials",
            challenge: Challenge::None,
        }
    }

    /// Map an auth error, using `unauthenticated` for credential failures.
    #[must_use]
    pub fn from_auth(err: AuthError, unauthenticated: Self) -> Self {
        if err.is_unauthenticated() {
            unauthenticated
        } else {
            err.into()
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(_) => Self::bearer(),
            AuthError::Forbidden { required } => {
                Self::Forbidden(format!("{} access required", capitalize(required.as_str())))
            }
            AuthError::UserNotFound(_) => Self::NotFound("User not found".to_string()),
            AuthError::UserExists(_) => Self::Conflict("Username already exists".to_string()),
            AuthError::Validation(e) => Self::BadRequest(e.to_string()),
            AuthError::Hashing(_)
            | AuthError::Token(_)
            | AuthError::Storage(_)
            | AuthError::Config(_) => Self::Internal(err.to_string()),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::TooManyRequests(m) => m.as_str(),
            Self::Unauthenticated { message, .. } => *message,
            Self::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                "Internal server error"
            }
        };

        let mut response = (status, Json(ErrorBody { error: message })).into_response();

        if let Self::Unauthenticated { challenge, .. } = &self {
            let value = match challenge {
                Challenge::Basic { realm } => {
                    HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")).ok()
                }
                Challenge::Bearer => Some(HeaderValue::from_static("Bearer")),
                Challenge::None => None,
            };
            if let Some(value) = value {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RejectReason;
    use axum::body::to_bytes;
    use keygate_core::Role;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_challenge() {
        let response = ApiError::bearer().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
        assert_eq!(
            body_json(response).await["error"],
            "Missing or invalid token"
        );
    }

    #[tokio::test]
    async fn test_basic_challenge() {
        let response = ApiError::basic("keygate").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[WWW_AUTHENTICATE],
            "Basic realm=\"keygate\""
        );
    }

    #[tokio::test]
    async fn test_login_failure_has_no_challenge() {
        let response = ApiError::invalid_login().into_response();
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
        assert_eq!(body_json(response).await["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let response = ApiError::Internal("lock poisoned".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Internal server error");
    }

    #[test]
    fn test_auth_error_mapping() {
        let forbidden: ApiError = AuthError::Forbidden {
            required: Role::Admin,
        }
        .into();
        assert!(matches!(&forbidden, ApiError::Forbidden(m) if m == "Admin access required"));

        let conflict: ApiError = AuthError::UserExists("user1".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = AuthError::UserNotFound("ghost".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let storage: ApiError = AuthError::Storage("boom".into()).into();
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_auth_picks_scheme() {
        let err = ApiError::from_auth(
            AuthError::Unauthenticated(RejectReason::WrongPassword),
            ApiError::invalid_login(),
        );
        assert!(matches!(
            err,
            ApiError::Unauthenticated {
                challenge: Challenge::None,
                ..
            }
        ));

        let err = ApiError::from_auth(AuthError::UserExists("x".into()), ApiError::bearer());
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
