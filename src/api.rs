use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{LogEntry, MonitorState};

/// Latest tick, or `null` until the first one completes.
pub async fn get_results(State(state): State<Arc<Mutex<MonitorState>>>) -> Json<Option<LogEntry>> {
    let state = state.lock().await;
    Json(state.latest.clone())
}

pub fn create_router(state: Arc<Mutex<MonitorState>>) -> Router {
    Router::new()
        .route("/api/results", get(get_results))
        .with_state(state)
}

pub async fn start_server(port: u16, state: Arc<Mutex<MonitorState>>) -> Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind results API on {}", addr))?;
    info!("Results API: http://localhost:{}/api/results", addr.port());
    axum::serve(listener, app).await.context("Results API stopped")?;
    Ok(())
}
