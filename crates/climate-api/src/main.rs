//! # Climate Indicator API Server
//!
//! Binary entry point for the HTTP API service.

use std::sync::Arc;

use climate_analytics::{ProfileBuilder, SnapshotStore};
use climate_api::{AppState, Config, build_router};
use climate_domain::Catalog;
use climate_store::{Collector, DiskCache, RawSource, WorldBankClient, WorldBankConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = climate_api::VERSION,
        "Starting Climate Indicator API"
    );

    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    tracing::info!(indicators = catalog.len(), "Indicator catalog loaded");

    let upstream = &config.upstream;
    let client = WorldBankClient::new(WorldBankConfig {
        base_url: upstream.base_url.clone(),
        timeout: upstream.timeout,
        ..WorldBankConfig::default()
    })?;
    let source: Arc<dyn RawSource> = Arc::new(
        Collector::new(client)
            .with_cache(DiskCache::new(&upstream.data_dir, upstream.cache_max_age()))
            .offline(upstream.offline),
    );
    tracing::info!(
        data_dir = %upstream.data_dir.display(),
        cache_hours = upstream.cache_hours,
        offline = upstream.offline,
        "Raw source configured"
    );

    let snapshots = Arc::new(SnapshotStore::new(
        Arc::new(catalog),
        ProfileBuilder::default(),
    ));

    // An empty generation-zero snapshot keeps serving if the first build fails.
    match snapshots.refresh(source.as_ref()).await {
        Ok(snapshot) => tracing::info!(
            generation = snapshot.generation(),
            countries = snapshot.len(),
            "Initial snapshot ready"
        ),
        Err(e) => tracing::error!(error = %e, "Initial snapshot build failed"),
    }

    let addr = config.server_addr;
    let app = build_router(AppState::new(snapshots, source, config));

    tracing::info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
