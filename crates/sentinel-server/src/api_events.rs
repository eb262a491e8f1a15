//! Event ingestion and query handlers.
//!
//! Provides:
//! - `POST /v1/events` — validate and idempotently store a single event
//! - `GET /v1/agents/{agentId}/events` — paginated per-agent retrieval

use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_db::{count_for_agent, events_for_agent, insert_event};
use sentinel_types::AuditEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Default number of events returned by the query path.
const DEFAULT_LIMIT: i64 = 100;

/// Hard cap on the query path's `limit` parameter.
const MAX_LIMIT: i64 = 1000;

fn validation_failure(detail: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}

/// Internal detail goes to the log, never into the response body.
fn storage_failure(context: &str, error: impl std::fmt::Display, detail: &str) -> Response {
    tracing::error!(context, %error, "storage operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response()
}

/// Handler for `POST /v1/events`.
///
/// The body is read as raw JSON so unknown top-level fields are tolerated
/// (and dropped at the storage boundary); the typed deserialization step
/// enforces enum closure and timestamp syntax, and `validate()` covers the
/// rest. Storage is an idempotent upsert keyed by `event_id`: a retried
/// delivery of an already-stored event is acknowledged with `201` without
/// creating a second row.
pub async fn create_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Response {
    let event: AuditEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(e) => return validation_failure(format!("invalid audit event: {e}")),
    };

    if let Err(e) = event.validate() {
        return validation_failure(e.to_string());
    }

    let event_id = event.event_id.clone();
    let agent_instance_id = event.agent_instance_id.clone();
    let pool = state.pool.clone();

    let inserted = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        insert_event(&conn, &event).map_err(|e| e.to_string())
    })
    .await;

    match inserted {
        Ok(Ok(inserted)) => {
            if inserted {
                tracing::info!(event_id, agent_instance_id, "event captured");
            } else {
                tracing::debug!(event_id, "duplicate event_id, already stored");
            }
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "event_id": event_id, "status": "captured" })),
            )
                .into_response()
        }
        Ok(Err(e)) => storage_failure("insert_event", e, "failed to capture event"),
        Err(e) => storage_failure("insert_event", e, "failed to capture event"),
    }
}

/// Query parameters for `GET /v1/agents/{agentId}/events`.
#[derive(Debug, Deserialize)]
pub struct AgentEventsQuery {
    /// Maximum number of events to return (default: 100, max: 1000).
    pub limit: Option<i64>,
}

/// Response wrapper for per-agent event retrieval.
#[derive(Debug, Serialize)]
pub struct AgentEventsResponse {
    /// Matching events, most recent first.
    pub events: Vec<AuditEvent>,
    /// Total stored events for this agent, ignoring `limit`.
    pub total: i64,
    /// The agent instance the query was scoped to.
    pub agent_instance_id: String,
}

/// Handler for `GET /v1/agents/{agentId}/events`.
///
/// Returns events whose `agent_instance_id` matches the path parameter,
/// ordered by `timestamp` descending. An unknown agent yields an empty list,
/// not an error.
pub async fn get_agent_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(params): Query<AgentEventsQuery>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let pool = state.pool.clone();
    let agent = agent_id.clone();

    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let events = events_for_agent(&conn, &agent, limit).map_err(|e| e.to_string())?;
        let total = count_for_agent(&conn, &agent).map_err(|e| e.to_string())?;
        Ok::<_, String>((events, total))
    })
    .await;

    match result {
        Ok(Ok((events, total))) => {
            tracing::debug!(
                agent_instance_id = agent_id,
                returned = events.len(),
                total,
                "retrieved agent events"
            );
            Json(AgentEventsResponse {
                events,
                total,
                agent_instance_id: agent_id,
            })
            .into_response()
        }
        Ok(Err(e)) => storage_failure("events_for_agent", e, "failed to retrieve events"),
        Err(e) => storage_failure("events_for_agent", e, "failed to retrieve events"),
    }
}
