//! Ingestion triggers pushed by agents.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use serde::Deserialize;
use tracing::{debug, info};

use heartlog_core::EventType;
use heartlog_logging::preview;

use crate::error::ApiError;
use crate::identity::Owner;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct OriginQuery {
    #[serde(default)]
    pub origin: String,
}

/// Handler for `POST /.log?origin=...`. The raw body becomes the event body.
pub async fn log_event(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OriginQuery>,
    Owner(owner): Owner,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let body = String::from_utf8_lossy(&body);
    debug!(origin = %query.origin, owner = %owner, body = %preview(&body), "Log received");

    state
        .dispatcher
        .ingest(&query.origin, EventType::Event, &body, &owner)?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /.monitor?origin=...`. Heartbeats carry no body.
pub async fn monitor_ping(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OriginQuery>,
    Owner(owner): Owner,
) -> Result<StatusCode, ApiError> {
    debug!(origin = %query.origin, owner = %owner, "Heartbeat received");

    state
        .dispatcher
        .ingest(&query.origin, EventType::Monitor, "", &owner)?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /.clear`. Redirects back to the events dashboard.
pub async fn clear_events(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    state.dispatcher.clear_all()?;
    info!("All events cleared");
    Ok(Redirect::to("/"))
}
