mod config;
mod db;
mod errors;
mod google;
mod history;
mod models;
mod resources;
mod routes;
mod state;
mod sync;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::google::{ApiEndpoints, GoogleClient, TokenSource};
use crate::routes::build_router;
use crate::state::AppState;
use crate::sync::scheduler::spawn_sync_loop;
use crate::sync::{SyncJob, SyncSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ClubCal API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Google client (Sheets + Drive + Calendar share one token source)
    let google = Arc::new(GoogleClient::new(
        TokenSource::from_credentials(&config.google),
        ApiEndpoints::default(),
        config.google_timeout,
    )?);
    info!("Google client initialized");

    let sync = Arc::new(SyncJob::new(
        google.clone(),
        google.clone(),
        SyncSettings::from_config(&config.sync),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_loop = if config.sync.enabled {
        Some(spawn_sync_loop(sync.clone(), config.sync.interval, shutdown_rx))
    } else {
        info!("Sheet sync disabled (SYNC_ENABLED=false)");
        None
    };

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        calendar: google,
        sync,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the admin front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Let an in-flight cycle finish before exiting.
    shutdown_tx.send_replace(true);
    if let Some(handle) = sync_loop {
        handle.await?;
    }

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
