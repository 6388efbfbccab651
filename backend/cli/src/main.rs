mod client;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderName;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use heartlog_core::EventStore;
use heartlog_gateway::{
    build_router, serve, AppState, HeaderIdentity, IdentityResolver, PeerAddressIdentity,
};
use heartlog_logging::init_logger;
use heartlog_store::SqliteEventStore;

use client::ServerClient;
use config::Config;

#[derive(Parser)]
#[command(name = "heartlog")]
#[command(about = "heartlog: private event log and heartbeat monitor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the heartlog server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
        /// SQLite database path
        #[arg(long)]
        db: Option<String>,
    },
    /// Show health of a running server
    Status {
        #[arg(long)]
        server: Option<String>,
    },
    /// Record an event; reads the message from stdin when omitted
    Log {
        #[arg(short, long)]
        origin: String,
        message: Option<String>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Record a heartbeat
    Ping {
        #[arg(short, long)]
        origin: String,
        #[arg(long)]
        server: Option<String>,
    },
    /// Delete every stored event and heartbeat
    Clear {
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    let client_for = |server: Option<String>| {
        ServerClient::new(&server.unwrap_or_else(|| config.local_url()))
    };

    match cli.command {
        Commands::Serve { port, bind, db } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                bind_address: bind.unwrap_or_else(|| config.bind_address.clone()),
                db_path: db.unwrap_or_else(|| config.db_path.clone()),
                ..config.clone()
            };
            init_logger(&config.logging());
            run_server(config).await?;
        }
        Commands::Status { server } => client_for(server)?.status().await?,
        Commands::Log {
            origin,
            message,
            server,
        } => client_for(server)?.log(&origin, message).await?,
        Commands::Ping { origin, server } => client_for(server)?.ping(&origin).await?,
        Commands::Clear { server } => client_for(server)?.clear().await?,
    }

    Ok(())
}

fn identity_resolver(config: &Config) -> Result<Arc<dyn IdentityResolver>> {
    match &config.identity_header {
        Some(name) => {
            let header = HeaderName::from_bytes(name.trim().as_bytes())
                .with_context(|| format!("Invalid identity header name: {name}"))?;
            info!(header = %header, "Resolving owners from trusted header");
            Ok(Arc::new(HeaderIdentity::new(header)))
        }
        None => Ok(Arc::new(PeerAddressIdentity)),
    }
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        "Starting heartlog"
    );

    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::open(&config.db_path)?);
    let state = AppState::new(store, identity_resolver(&config)?, config.gateway());

    let app = build_router(state.clone()).layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, app, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let args = ["heartlog", "serve", "-p", "9000", "--db", ":memory:"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Serve { port, bind, db } => {
                assert_eq!(port, Some(9000));
                assert!(bind.is_none());
                assert_eq!(db.as_deref(), Some(":memory:"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_log_without_message() {
        let cli = Cli::try_parse_from(["heartlog", "log", "--origin", "backup"]).unwrap();
        match cli.command {
            Commands::Log {
                origin,
                message,
                server,
            } => {
                assert_eq!(origin, "backup");
                assert!(message.is_none());
                assert!(server.is_none());
            }
            _ => panic!("expected log"),
        }
    }

    #[test]
    fn test_ping_requires_origin() {
        assert!(Cli::try_parse_from(["heartlog", "ping"]).is_err());
    }

    #[test]
    fn test_identity_resolver_rejects_bad_header() {
        let config = Config {
            identity_header: Some("bad header".into()),
            ..Config::default()
        };
        assert!(identity_resolver(&config).is_err());

        let config = Config {
            identity_header: Some("Tailscale-User-Login".into()),
            ..Config::default()
        };
        assert!(identity_resolver(&config).is_ok());
    }
}
