//! Hive Server - mesh coordination backend for drone hives

use anyhow::Result;
use axum::routing::get;
use hive_server::{api, config::Config, state::AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hive_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Hive Server...");

    let config = Config::from_env();
    let port = config.server_port;
    match config.drone_callback_url.as_deref() {
        Some(url) => tracing::info!("Interference callbacks go to {}", url),
        None => tracing::info!("Interference announcements are queued for polling"),
    }
    if let Some(seed) = config.topology_seed {
        tracing::info!("Topology jitter seeded with {}", seed);
    }
    let state = Arc::new(AppState::new(config));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
