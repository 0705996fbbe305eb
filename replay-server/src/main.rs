//! Ride Replay Server
//!
//! Serves ride tracks and replay sessions over a REST API with SSE frames

use anyhow::Result;
use replay_server::{api, config::ServerConfig, state};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Ride Replay Server");

    let config = ServerConfig::load()?;

    // Create application state
    let state = state::AppState::new(Arc::new(config.build_source()), config.replay.clone());

    // Build the router
    let app = api::create_router(state.clone());

    // Start server
    info!("Server listening on http://{}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the sessions cancels any running playback timers
    state.close_all_sessions().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
