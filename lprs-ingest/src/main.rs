//! lprs-ingest - license plate recognition event ingestion service
//!
//! Receives LPR sensor reports over HTTP, stores them in SQLite with
//! on-disk copies of payloads and images, and serves the read side used
//! by archive review and compare tooling.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lprs_common::config::{resolve_root_folder, ServiceConfig, TomlConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lprs_ingest::AppState;

/// Command-line arguments for lprs-ingest
#[derive(Parser, Debug)]
#[command(name = "lprs-ingest")]
#[command(about = "License plate recognition event ingestion service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and data directory
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "LPRS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "LPRS_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "LPRS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before the global subscriber exists (it carries the
    // log level), so its messages go through a temporary one.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .finish();
    let toml = tracing::subscriber::with_default(bootstrap, || {
        TomlConfig::load_or_default(args.config.as_deref())
    });

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml);
    let mut config = ServiceConfig::from_toml(root_folder, &toml);
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lprs-ingest v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());

    let state = AppState::open(&config)
        .await
        .context("Failed to initialize storage")?;
    info!("Database connection established");

    let app = lprs_ingest::build_router(state, config.max_body_bytes);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Ingestion endpoint: http://{}/api", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
