mod config;
mod engine;
mod handlers;
mod state;
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::handlers::{get_logs, health_check};
use crate::state::FloorState;
use crate::websocket::ws_handler;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::try_from(cli)?;
    info!(
        listen_addr = %config.listen_addr,
        symbols = %config.symbols.join(","),
        tick_ms = config.tick_ms,
        "starting pit-floor"
    );

    let state = Arc::new(FloorState::new(&config.symbols));

    // The value engine: walk the grid and broadcast on a fixed cadence.
    let engine_state = state.clone();
    let tick_period = Duration::from_millis(config.tick_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_period);
        loop {
            ticker.tick().await;
            let update = engine_state.tick();
            engine_state.broadcast(&update);
        }
    });

    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/logs", get(get_logs))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("failed to bind listener")?;
    info!("pit-floor listening on {}", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown with error")?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
