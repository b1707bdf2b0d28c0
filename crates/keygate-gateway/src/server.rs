//! Gateway server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{get, post},
};
use keygate_core::{Config, GatewayConfig, Role};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::GatewayError;
use crate::auth::{
    Argon2Hasher, AuthState, CredentialHasher, require_basic, require_bearer, require_role,
    setup::{auto_setup_from_env, seed_demo_users, seed_users},
};
use crate::handlers;

/// Build the HTTP router over shared auth state.
///
/// Guards are attached with `route_layer`; the layer added last runs first,
/// so credentials are checked before roles.
///
/// `/data` and `/users/{username}` are public and reveal which accounts
/// exist. Login timing equalization only hides existence from the login
/// route itself; deployments that need directory privacy must not expose
/// these two routes.
pub fn router(state: Arc<AuthState>, config: &GatewayConfig) -> Router {
    let public = Router::new()
        .route("/", get(handlers::welcome))
        .route("/status", get(handlers::status))
        .route("/data", get(handlers::list_usernames))
        .route("/users/{username}", get(handlers::get_user))
        .route("/login", post(handlers::login));

    let basic = Router::new()
        .route("/basic-protected", get(handlers::basic_protected))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_basic));

    let bearer = Router::new()
        .route("/jwt-protected", get(handlers::jwt_protected))
        .route("/me", get(handlers::me))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_bearer));

    let admin = Router::new()
        .route("/admin-only", get(handlers::admin_only))
        .route("/add_user", post(handlers::add_user))
        .route_layer(from_fn(|request: Request, next: Next| {
            require_role(Role::Admin, request, next)
        }))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_bearer));

    let mut app = Router::new()
        .merge(public)
        .merge(basic)
        .merge(bearer)
        .merge(admin)
        .with_state(state)
        .layer(TimeoutLayer::new(config.timeout()))
        .layer(TraceLayer::new_for_http());

    if config.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

/// Gateway server.
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<AuthState>,
}

/// Builder for constructing a Gateway with its dependencies.
pub struct GatewayBuilder {
    config: Config,
    hasher: Arc<dyn CredentialHasher>,
    demo_users: bool,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            hasher: Arc::new(Argon2Hasher::new()),
            demo_users: false,
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the password hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Seed the `user1`/`admin1` demo accounts.
    #[must_use]
    pub const fn with_demo_users(mut self, enabled: bool) -> Self {
        self.demo_users = enabled;
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid or seeding fails.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let config = self
            .config
            .resolve(|key| std::env::var(key).ok())
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let state = AuthState::initialize(config.auth, self.hasher)
            .map_err(|e| GatewayError::Config(format!("Auth init failed: {e}")))?;

        seed_users(&state.users, &config.users)?;
        if self.demo_users {
            seed_demo_users(&state.users)?;
        }

        // Auto-setup from environment if configured
        if let Err(e) = auto_setup_from_env(&state.users) {
            tracing::warn!("Auto-setup from env failed: {}", e);
        }

        if state.users.is_empty() {
            tracing::warn!("No users configured; every protected route will reject");
        }

        Ok(Gateway {
            config: config.gateway,
            state: Arc::new(state),
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Start building a gateway.
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Shared auth state.
    #[must_use]
    pub fn state(&self) -> Arc<AuthState> {
        Arc::clone(&self.state)
    }

    /// The router this gateway serves.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state(), &self.config)
    }

    /// Run the gateway server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound or serving fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid bind address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, users = self.state.users.len(), "gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
