//! HTTP gateway for plancanvas.
//!
//! Exposes the streaming chat endpoint, session canvas inspection and a
//! health check. Built on Axum.

pub mod chat;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    response::Json,
    routing::{delete, get, post},
};
use plancanvas_config::AppConfig;
use plancanvas_core::provider::Provider;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub use sessions::{SessionHandle, SessionStore};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub sessions: SessionStore,
}

impl GatewayState {
    pub fn new(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        let sessions = SessionStore::from_config(&config.sessions);
        Self {
            config,
            provider,
            sessions,
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/sessions/{id}", delete(chat::delete_session_handler))
        .route("/api/sessions/{id}/canvas", get(chat::session_canvas_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        tracing::warn!("No API key configured; requests to the reasoning service will likely fail");
    }

    let router = plancanvas_providers::build_from_config(&config);
    let provider = router
        .default()
        .ok_or("No default provider configured")?;

    let state = Arc::new(GatewayState::new(config, provider));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
