//! Sentinel ingestion and query service.
//!
//! An axum HTTP server exposing the audit pipeline's wire contract:
//!
//! - `POST /v1/events` — validate and idempotently store a single event
//! - `GET /v1/agents/{agentId}/events` — events for one agent, newest first
//! - `GET /` — health check
//!
//! Validation authority lives here: enum closure, UUID version, length caps,
//! and timestamp syntax are all enforced before anything touches storage.

pub mod api_events;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use sentinel_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Maximum request body size (1 MiB). Protects against OOM from oversized
/// payloads; a single audit event is a few KiB at most.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Health check handler.
///
/// Returns `200 OK` with service identity, status, and version. Used by load
/// balancers, monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "service": "sentinel-api",
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/v1/events", post(api_events::create_event_handler))
        .route(
            "/v1/agents/{agentId}/events",
            get(api_events::get_agent_events_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
