//! Keygate CLI - run and talk to the Keygate gateway.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "Keygate - user directory with role-aware authentication")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// Config file (defaults to ~/.keygate/keygate.json)
        #[arg(short, long, env = "KEYGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Seed user1/admin1 with password "password"
        #[arg(long)]
        demo_users: bool,
    },

    /// Print an Argon2 hash for a seed user's passwordHash
    HashPassword {
        /// Password to hash (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Generate a random password
        #[arg(long, conflicts_with = "password")]
        generate: bool,
    },

    /// Print a random signing secret
    GenSecret,

    /// Log in and print an access token
    Login {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Gateway base URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Check whether the gateway is up
    Status {
        /// Gateway base URL
        #[arg(long)]
        url: Option<String>,
    },
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    if let Err(e) = run(cli.command).await {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            port,
            bind,
            config,
            demo_users,
        } => {
            let args = commands::serve::ServeArgs {
                port,
                bind,
                config,
                demo_users,
            };
            commands::run_serve(args).await?;
        }

        Commands::HashPassword { password, generate } => {
            commands::run_hash_password(password, generate)?;
        }

        Commands::GenSecret => commands::run_gen_secret(),

        Commands::Login {
            username,
            password,
            url,
        } => {
            commands::run_login(&username, password, url).await?;
        }

        Commands::Status { url } => {
            commands::run_status(url).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "keygate",
            "serve",
            "--port",
            "8080",
            "--bind",
            "0.0.0.0",
            "--demo-users",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                port,
                bind,
                demo_users,
                ..
            } => {
                assert_eq!(port, Some(8080));
                assert_eq!(bind.as_deref(), Some("0.0.0.0"));
                assert!(demo_users);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "keygate", "-v", "login", "-u", "admin1", "-p", "password", "--url", "http://h:1",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Login { ref username, .. } if username == "admin1"
        ));
    }

    #[test]
    fn test_hash_password_flags_conflict() {
        assert!(
            Cli::try_parse_from(["keygate", "hash-password", "--password", "x", "--generate"])
                .is_err()
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["keygate"]).is_err());
    }
}
