//! # talos-audit CLI
//!
//! Binary entry point: parses configuration, builds the store adapter and
//! the in-process [`talos_audit_core::AuditService`], and serves the HTTP
//! surface. `bootstrap` is the composition root — the single function that
//! chooses concrete adapters and wires them together; there is no global
//! container or lazily-initialized singleton anywhere in this crate.

mod config;

use axum_server::Handle;
use clap::{Parser, Subcommand};
use config::{ServiceConfig, StorageKind};
use std::sync::Arc;
use std::time::Duration;
use talos_audit_core::broadcaster::Broadcaster;
use talos_audit_core::store::AuditStore;
use talos_audit_core::AuditService;
use talos_audit_http::{router, AppState};
use talos_audit_store_memory::InMemoryStore;
use talos_audit_store_postgres::PgStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "talos-audit", about = "Tamper-evident audit log service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Load and validate configuration, then exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Check => {
            let config = ServiceConfig::from_env()?;
            info!(bind_addr = %config.server.bind_addr, storage = ?config.storage.kind, "configuration is valid");
            Ok(())
        }
        Commands::Serve => serve().await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    let bind_addr = config.server.bind_addr;
    let state = bootstrap(&config).await?;
    let app = router(state);

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!(addr = %bind_addr, "starting talos-audit-service");
    axum_server::bind(bind_addr).handle(handle).serve(app.into_make_service()).await?;
    Ok(())
}

/// Composition root: chooses the store adapter per `TALOS_STORAGE_TYPE`,
/// constructs the broadcaster and orchestrator (which performs startup
/// recovery), and returns the resulting [`AppState`] for the HTTP router.
async fn bootstrap(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn AuditStore> = match config.storage.kind {
        StorageKind::Memory => Arc::new(InMemoryStore::new()),
        StorageKind::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .expect("TALOS_DATABASE_URL presence validated in ServiceConfig::from_env");
            Arc::new(PgStore::connect(url).await?)
        }
    };

    let broadcaster = Broadcaster::new(config.broadcast.queue_capacity);
    let service = Arc::new(AuditService::new(store, Some(broadcaster)).await?);

    Ok(AppState {
        service,
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("TALOS_GIT_SHA").unwrap_or("unknown"),
        default_list_limit: config.list.default_limit,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received, draining connections");
}
