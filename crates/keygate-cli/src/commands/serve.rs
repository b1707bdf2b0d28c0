//! Serve command - run the gateway.

use std::path::PathBuf;

use anyhow::{Context, Result};
use keygate_core::Config;

use crate::ui;

/// Serve command arguments.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    /// Port override.
    pub port: Option<u16>,
    /// Bind address override.
    pub bind: Option<String>,
    /// Explicit config path.
    pub config: Option<PathBuf>,
    /// Seed the demo accounts.
    pub demo_users: bool,
}

/// Run the gateway until Ctrl-C.
///
/// # Errors
///
/// Returns error if config is invalid or the server fails.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    if let Some(bind) = args.bind {
        config.gateway.bind_address = bind;
    }

    ui::header("Starting Keygate Gateway");
    ui::kv(
        "Address",
        &format!("{}:{}", config.gateway.bind_address, config.gateway.port),
    );
    ui::kv("Seed users", &config.users.len().to_string());
    ui::kv("Token expiry", &format!("{}s", config.auth.token_expiry_secs));
    if args.demo_users {
        ui::warning("Demo users enabled (user1/admin1, password \"password\")");
    }
    println!();
    ui::info("Press Ctrl+C to stop");

    keygate_gateway::start(config, args.demo_users).await?;
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default_path = Config::default_path();
            if !default_path.exists() {
                ui::warning("No configuration found, using defaults");
            }
            Config::load_default().context("Failed to load default config")
        }
    }
}
