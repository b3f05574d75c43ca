use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use launchpad::auth::{Revocations, TokenService};
use launchpad::config::{Cli, Config, default_config_dir, default_config_path};
use launchpad::db::Database;
use launchpad::handler::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("launchpad.svc starting");

    // --config wins; otherwise ~/.launchpad/config.yaml if present, else env vars.
    // The database file lives next to whichever config was chosen.
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (Some(path), dir)
        }
        None => {
            let path = default_config_path();
            (path.exists().then_some(path), default_config_dir())
        }
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let cfg = match &config_path {
        Some(path) => Config::new(&path.to_string_lossy()),
        None => {
            tracing::info!("no config file found, reading configuration from environment");
            Config::from_env()
        }
    }
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config");
        std::process::exit(1);
    });

    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    let tokens = Arc::new(TokenService::new(&cfg.auth));

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();

    // Revocations only matter until the token would have expired anyway.
    let purge_db = db.clone();
    let purge_token = cancellation_token.clone();
    let purge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match Revocations::new(&purge_db).purge_expired(Utc::now().timestamp()).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "purged expired token revocations"),
                        Err(e) => tracing::warn!("Failed to purge token revocations: {}", e),
                    }
                }
                _ = purge_token.cancelled() => {
                    tracing::info!("revocation purge task shutting down");
                    break;
                }
            }
        }
    });

    let app = launchpad::app(AppState { db: db.clone(), tokens });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("launchpad.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server stopped unexpectedly");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            cancellation_token.cancel();
        }
    }

    let _ = purge_task.await;
    if let Err(e) = db.sync().await {
        tracing::warn!("final replica sync failed: {}", e);
    }
    tracing::info!("launchpad.svc going off, graceful shutdown complete");
}
