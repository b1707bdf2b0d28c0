//! Route handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

use keygate_core::normalize_username;

use crate::auth::{AuthState, Principal, PublicUser, RejectReason};
use crate::error::{ApiError, ApiResult};
use crate::schema::{AddUserRequest, AddUserResponse, Credentials, LoginResponse};

pub(crate) async fn welcome() -> &'static str {
    "Welcome to the Keygate API!"
}

pub(crate) async fn status() -> &'static str {
    "OK"
}

pub(crate) async fn list_usernames(
    State(state): State<Arc<AuthState>>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.users.usernames()?))
}

pub(crate) async fn get_user(
    State(state): State<Arc<AuthState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user = state.users.lookup(&username)?;
    Ok(Json(user.to_public()))
}

pub(crate) async fn add_user(
    State(state): State<Arc<AuthState>>,
    principal: Principal,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<AddUserResponse>)> {
    let request = AddUserRequest::from_json(&body)?;
    let user = state.users.register(request.into_new_user())?;

    tracing::info!(
        username = %user.username,
        role = %user.role,
        by = %principal.username,
        "user registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(AddUserResponse {
            message: "User added",
            user: user.to_public(),
        }),
    ))
}

pub(crate) async fn login(
    State(state): State<Arc<AuthState>>,
    body: Bytes,
) -> ApiResult<Json<LoginResponse>> {
    let credentials = Credentials::from_json(&body)?;

    // Unregistrable names never reach the throttle.
    let Ok(username) = normalize_username(&credentials.username) else {
        tracing::debug!(reason = %RejectReason::UnknownUser, "login rejected");
        return Err(ApiError::invalid_login());
    };

    if !state.throttle.check(&username) {
        return Err(ApiError::TooManyRequests(
            "Too many login attempts".to_string(),
        ));
    }

    let user = state
        .authenticator()
        .verify_password(&username, &credentials.password)
        .map_err(|e| ApiError::from_auth(e, ApiError::invalid_login()))?;

    let issued = state.issuer.issue(&user.username, user.role)?;
    tracing::info!(username = %user.username, role = %user.role, "login succeeded");

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
    }))
}

pub(crate) async fn basic_protected() -> &'static str {
    "Basic Auth: Access Granted"
}

pub(crate) async fn jwt_protected() -> &'static str {
    "JWT Auth: Access Granted"
}

pub(crate) async fn admin_only() -> &'static str {
    "Admin Access: Granted"
}

pub(crate) async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}
