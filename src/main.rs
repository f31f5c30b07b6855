use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cat_agency::api::{self, AppState};
use cat_agency::config::{AppConfig, Environment};
use cat_agency::db::{self, Database};
use cat_agency::store::MemoryStore;

#[derive(Parser)]
#[command(name = "cat-agency")]
#[command(about = "Mission, target and operative records for the Spy Cat Agency")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Keep all records in memory instead of SQLite
        #[arg(long)]
        memory: bool,
    },
    /// Apply database migrations and exit
    Migrate,
}

fn init_tracing(environment: Environment) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "cat_agency=debug,tower_http=debug".into()),
    );

    match environment {
        Environment::Production => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        Environment::Local => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    let path = match &config.database.path {
        Some(path) => path.clone(),
        None => db::default_path()?,
    };
    tracing::info!("Opening database at {}", path.display());

    let db = Database::open(path)?;
    db.migrate().context("Failed to run migrations")?;
    Ok(db)
}

async fn serve(config: AppConfig, memory: bool) -> anyhow::Result<()> {
    let breeds = config.breed_validator()?;
    let state = if memory {
        tracing::warn!("Using in-memory storage; records are lost on shutdown");
        AppState::new(Arc::new(MemoryStore::new()), breeds)
    } else {
        AppState::new(Arc::new(open_database(&config)?), breeds)
    };

    let app = api::create_router_with_timeout(state, config.request_timeout());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Cat agency listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    init_tracing(config.environment);

    match cli.command {
        Some(Commands::Serve { port, host, memory }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            serve(config, memory).await?;
        }
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Migrations applied");
        }
        None => serve(config, false).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn shutdown_waits_for_a_signal() {
        let waited = tokio::time::timeout(Duration::from_millis(100), shutdown_signal()).await;
        assert!(waited.is_err(), "shutdown resolved without a signal");
    }
}
