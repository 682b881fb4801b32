//! Command-line entry points for the `bitacora-api` binary.
//!
//! `serve` is the default when no subcommand is given. The remaining
//! subcommands are operator chores that share the same configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::database::Database;
use crate::services::{LogMailer, Mailer, SmtpMailer};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "bitacora-api")]
#[command(about = "Bitácora REST backend for plant operations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, env = "PORT", help = "Port to listen on (overrides config)")]
        port: Option<u16>,

        #[arg(long, help = "Apply pending migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Apply pending schema migrations and exit")]
    Migrate,

    #[command(about = "Print a bcrypt hash suitable for usuarios.password")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
    },

    #[command(about = "Validate and print the effective configuration (secrets omitted)")]
    Config,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        migrate: false,
    });

    match command {
        Commands::Serve { port, migrate } => serve(port, migrate).await,
        Commands::Migrate => {
            let config = load_config()?;
            let db = Database::connect(&config.database)
                .await
                .context("failed to connect to MySQL")?;
            db.migrate().await.context("failed to apply migrations")?;
            db.close().await;
            Ok(())
        }
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
        Commands::Config => {
            let config = load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn serve(port: Option<u16>, migrate: bool) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting Bitácora API in {:?} mode", config.environment);

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to MySQL")?;
    db.health_check().await.context("database health check failed")?;

    if migrate || config.database.run_migrations {
        db.migrate().await.context("failed to apply migrations")?;
    }

    let mailer: Arc<dyn Mailer> = match config.mail.host.clone() {
        Some(host) => Arc::new(
            SmtpMailer::from_config(&config.mail, &host).context("invalid mail configuration")?,
        ),
        None => {
            warn!("MAIL_HOST not set; meeting notifications will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState::new(config, db.clone(), mailer);
    state
        .storage
        .ensure_root()
        .await
        .with_context(|| format!("cannot create uploads directory {}", state.storage.root().display()))?;

    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Bitácora API listening on http://{}", bind_addr);

    axum::serve(listener, crate::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["bitacora-api"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_serve_flags() {
        let cli = Cli::try_parse_from(["bitacora-api", "serve", "--port", "8081", "--migrate"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, migrate }) => {
                assert_eq!(port, Some(8081));
                assert!(migrate);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn hash_password_requires_argument() {
        assert!(Cli::try_parse_from(["bitacora-api", "hash-password"]).is_err());
    }
}
