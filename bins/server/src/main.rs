//! Prism API Server
//!
//! Main entry point for the image upload and transformation service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prism_api::{AppState, create_router};
use prism_core::image::{ImageService, ImageServiceConfig};
use prism_core::storage::{StorageConfig, StorageService};
use prism_core::MemoryTransformCache;
use prism_db::{ImageRepository, connect_with_config};
use prism_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prism=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with_config(&config.database).await?;
    info!("Connected to database");

    // Object storage
    let storage_config = StorageConfig::from_settings(&config.storage)?;
    let storage = StorageService::from_config(storage_config)?;
    info!(
        provider = storage.provider_name(),
        public_base_url = %storage.config().public_base_url,
        "Object storage configured"
    );

    // Transform cache
    let cache = MemoryTransformCache::new(config.cache.max_capacity);
    info!(
        max_capacity = config.cache.max_capacity,
        ttl_secs = config.cache.ttl_secs,
        "Transform cache configured"
    );

    let images = ImageService::new(
        Arc::new(storage),
        Arc::new(ImageRepository::new(db.clone())),
        Arc::new(cache),
        ImageServiceConfig {
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            max_file_size: config.storage.max_file_size,
            ..ImageServiceConfig::default()
        },
    );

    // Create router
    let app = create_router(AppState::new(images), &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;
    info!("Server stopped");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
