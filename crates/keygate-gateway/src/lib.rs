//! # Keygate Gateway
//!
//! HTTP gateway over an in-memory user directory with HTTP Basic, bearer
//! token and role-based access control.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and authorization.
pub mod auth;
/// HTTP error responses.
pub mod error;
mod handlers;
mod middleware;
/// Request and response bodies.
pub mod schema;
mod server;

pub use auth::{AuthError, AuthState, Principal, SessionIssuer, User, UserStore};
pub use error::{ApiError, ApiResult};
pub use middleware::LoginThrottle;
pub use server::{Gateway, GatewayBuilder, router};

use keygate_core::Config;

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: Config, demo_users: bool) -> Result<(), GatewayError> {
    let gateway = Gateway::builder()
        .with_config(config)
        .with_demo_users(demo_users)
        .build()?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Auth setup error.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
