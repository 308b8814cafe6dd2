//! roomcast gateway
//!
//! - WebSocket endpoint: /v1/ws?sid=...&uid=...
//! - Session registry restored from the snapshot before binding
//! - Graceful shutdown on Ctrl-C, then the snapshot is written

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use roomcast_core::error::{Result, RoomcastError};
use roomcast_gateway::{app_state::AppState, config, router};

const CONFIG_ENV: &str = "ROOMCAST_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "roomcast.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse().map_err(|e| {
        RoomcastError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
    })?;

    let state = AppState::new(cfg);
    let app = router::build_router(state.clone());

    tracing::info!(
        %listen,
        sessions = state.registry().len(),
        snapshot = %state.registry().snapshot_path().display(),
        "roomcast-gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RoomcastError::Internal(format!("failed to bind: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|e| RoomcastError::Internal(format!("server failed: {e}")))?;

    // best-effort; failures are already logged
    let _ = state.registry().shutdown();
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
    }
    state.set_draining();
    tracing::info!("draining, no longer accepting connections");
}
