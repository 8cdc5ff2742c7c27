//! dbmon binary entry point.
//!
//! Core functionality is provided by the `dbmon` library crate.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbmon::cache::ResultCache;
use dbmon::config::AppConfig;
use dbmon::database::{Database, PostgresDatabase, SqliteDatabase};
use dbmon::probe::ProbeEngine;
use dbmon::server::{AppState, create_router};

/// dbmon - Database Health Monitor
#[derive(Parser, Debug)]
#[command(name = "dbmon", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", env = "DBMON_CONFIG")]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "DBMON_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "DBMON_SERVER_PORT")]
    server_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run probes and serve results over HTTP
    Serve,
    /// Run probes and log results, without the HTTP server
    Local,
    /// Create the test table on all configured targets
    Setup,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dbmon=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("dbmon - Database Health Monitor");

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }

    let targets = build_targets(&config);
    if targets.is_empty() {
        tracing::warn!("No database targets configured");
    }
    let engine = ProbeEngine::new(&config.monitor, targets);

    match cli.command {
        Command::Serve => serve(config, engine).await,
        Command::Local => local(engine).await,
        Command::Setup => {
            engine.setup().await?;
            tracing::info!("Setup complete");
            Ok(())
        }
    }
}

/// Build the probe target set from configuration.
fn build_targets(config: &AppConfig) -> Vec<Arc<dyn Database>> {
    let mut targets: Vec<Arc<dyn Database>> = Vec::new();
    for pg in &config.databases.postgres {
        targets.push(Arc::new(PostgresDatabase::new(pg.clone())));
    }
    for sq in &config.databases.sqlite {
        targets.push(Arc::new(SqliteDatabase::new(sq.clone())));
    }
    targets
}

/// Run the probe engine and serve cached results over HTTP.
async fn serve(config: AppConfig, engine: ProbeEngine) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    let rx = engine.run(cancel.clone());
    let cache = ResultCache::new(config.monitor.invalidation_time);
    let collector = {
        let cache = cache.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { cache.collect(rx, cancel).await })
    };

    let app = create_router(AppState { cache });
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    collector.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run the probe engine and log each result to the console.
async fn local(engine: ProbeEngine) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let mut rx = engine.run(cancel.clone());

    tokio::spawn(shutdown_signal(cancel));

    while let Some(result) = rx.recv().await {
        tracing::info!(
            database = %result.database,
            connectable = result.connectable,
            readable = result.readable,
            writable = result.writable,
            connection_time = ?result.connection_time,
            read_time = ?result.read_time,
            write_time = ?result.write_time,
            "Probe result"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    cancel.cancel();
}
