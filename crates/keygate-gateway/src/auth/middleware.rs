//! Authentication middleware for axum.
//!
//! Guards are plain `from_fn` middleware. Credential guards attach a
//! `Principal` to the request; the role guard reads it back.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use keygate_core::{AuthConfig, Role};

use super::authenticator::{Authenticator, Principal};
use super::authorizer::authorize;
use super::jwt::SessionIssuer;
use super::password::CredentialHasher;
use super::users::UserStore;
use super::AuthError;
use crate::error::ApiError;
use crate::middleware::LoginThrottle;

/// Shared authentication state.
pub struct AuthState {
    /// Auth configuration.
    pub config: AuthConfig,
    /// Token issuer.
    pub issuer: SessionIssuer,
    /// User store.
    pub users: UserStore,
    /// Login attempt limiter.
    pub throttle: LoginThrottle,
}

impl AuthState {
    /// Create a new auth state.
    #[must_use]
    pub fn new(config: AuthConfig, issuer: SessionIssuer, users: UserStore) -> Self {
        let throttle = LoginThrottle::new(config.login_attempts_per_minute);
        Self {
            config,
            issuer,
            users,
            throttle,
        }
    }

    /// Initialize auth state with an empty store.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret is unusable.
    pub fn initialize(
        config: AuthConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, AuthError> {
        let issuer = SessionIssuer::from_config(&config)?;
        let users = UserStore::new(hasher);
        Ok(Self::new(config, issuer, users))
    }

    /// Authenticator over this state's store and issuer.
    #[must_use]
    pub const fn authenticator(&self) -> Authenticator<'_> {
        Authenticator::new(&self.users, &self.issuer)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("issuer", &self.issuer)
            .field("user_count", &self.users.len())
            .finish_non_exhaustive()
    }
}

fn authorization_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Require HTTP Basic credentials.
///
/// # Errors
///
/// Rejects with 401 and a `Basic` challenge.
pub async fn require_basic(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = state
        .authenticator()
        .verify_basic(authorization_header(&request))
        .map_err(|e| ApiError::from_auth(e, ApiError::basic(state.config.basic_realm.as_str())))?;

    request.extensions_mut().insert(Principal::from_user(&user));
    Ok(next.run(request).await)
}

/// Require a valid bearer token.
///
/// # Errors
///
/// Rejects with 401 and a `Bearer` challenge.
pub async fn require_bearer(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state
        .authenticator()
        .verify_bearer(authorization_header(&request))
        .map_err(|e| ApiError::from_auth(e, ApiError::bearer()))?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Require the authenticated principal to hold `required`.
///
/// Must run after a credential guard.
///
/// # Errors
///
/// Rejects with 401 if no principal is attached, 403 if the role falls short.
pub async fn require_role(
    required: Role,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = request
        .extensions()
        .get::<Principal>()
        .map(|p| p.role)
        .ok_or_else(ApiError::bearer)?;

    authorize(role, required).into_result(required)?;
    Ok(next.run(request).await)
}

/// Handlers behind a credential guard can take the `Principal` directly.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(ApiError::bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use crate::auth::users::NewUser;
    use axum::{
        Router,
        body::Body,
        http::StatusCode,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use keygate_core::SigningSecret;
    use tower::ServiceExt;

    fn state() -> Arc<AuthState> {
        let config = AuthConfig::builder()
            .jwt_secret(SigningSecret::generate_config_value())
            .build();
        let state = AuthState::initialize(config, Arc::new(test_hasher())).unwrap();
        state.users.register(NewUser::new("user1", "password")).unwrap();
        state
            .users
            .register(NewUser::new("admin1", "password").with_role(Role::Admin))
            .unwrap();
        Arc::new(state)
    }

    async fn whoami(principal: Principal) -> String {
        principal.username
    }

    fn app(state: &Arc<AuthState>) -> Router {
        let basic = Router::new()
            .route("/basic", get(whoami))
            .route_layer(from_fn_with_state(Arc::clone(state), require_basic));
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn(|req: Request, next: Next| {
                require_role(Role::Admin, req, next)
            }))
            .route_layer(from_fn_with_state(Arc::clone(state), require_bearer));
        basic.merge(admin)
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_basic_guard() {
        let state = state();
        let ok = format!("Basic {}", STANDARD.encode("user1:password"));
        let bad = format!("Basic {}", STANDARD.encode("user1:nope"));

        let response = app(&state).oneshot(get_with("/basic", Some(&ok))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&state).oneshot(get_with("/basic", Some(&bad))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(&state).oneshot(get_with("/basic", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_guard_after_bearer() {
        let state = state();
        let admin = state.issuer.issue("admin1", Role::Admin).unwrap();
        let user = state.issuer.issue("user1", Role::User).unwrap();

        let response = app(&state)
            .oneshot(get_with("/admin", Some(&format!("Bearer {}", admin.token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&state)
            .oneshot(get_with("/admin", Some(&format!("Bearer {}", user.token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Unauthenticated wins over forbidden
        let response = app(&state).oneshot(get_with("/admin", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_guard_without_principal() {
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(from_fn(|req: Request, next: Next| {
                require_role(Role::Admin, req, next)
            }));

        let response = app.oneshot(get_with("/admin", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_auth_state_debug() {
        let state = state();
        let debug = format!("{state:?}");
        assert!(debug.contains("user_count: 2"));
        assert!(!debug.contains(state.config.jwt_secret.as_deref().unwrap()));
    }
}
