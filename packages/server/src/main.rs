use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use common::storage::FilesystemBlobStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::images::{ImageService, SeaOrmMetadataStore};
use server::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "server", version, about = "Image upload service")]
struct Args {
    /// Configuration file. The extension selects the format; without one,
    /// `config/config.{toml,yaml,json}` is tried.
    #[arg(long, env = "IMAGE_SERVICE_CONFIG")]
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args = Args::parse();
    let config =
        AppConfig::load(args.config_path.as_deref()).context("Failed to load configuration")?;
    info!(env = %config.server.env, "Configuration loaded");

    let db = server::database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection pool established");

    let blobs = FilesystemBlobStore::open(config.storage.upload_dir.clone())
        .await
        .context("Failed to prepare upload directory")?;
    info!(upload_dir = %config.storage.upload_dir.display(), "Blob store ready");

    let images = ImageService::from_config(
        &config,
        Arc::new(SeaOrmMetadataStore::new(db)),
        Arc::new(blobs),
    );
    let state = AppState {
        config: config.clone(),
        images,
    };
    let app = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    let token = CancellationToken::new();
    let serve = axum::serve(listener, app).with_graceful_shutdown(token.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { serve.await });

    tokio::select! {
        result = &mut server => {
            result.context("Server task failed")??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    info!(grace_secs = grace.as_secs(), "Shutdown signal received, draining in-flight requests");
    token.cancel();

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.context("Server task failed")??,
        Err(_) => warn!("Grace period elapsed with requests still in flight"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
}
