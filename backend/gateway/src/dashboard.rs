//! Dashboard pages.

use std::sync::Arc;

use axum::{extract::State, response::Html};
use chrono::Utc;

use heartlog_core::{timelines, EventType};

use crate::error::ApiError;
use crate::render;
use crate::server::AppState;

/// Handler for `GET /`
pub async fn events_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let events = state.dispatcher.find(EventType::Event)?;
    Ok(Html(render::events_page(&events)))
}

/// Handler for `GET /monitor`
pub async fn monitor_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let events = state.dispatcher.find(EventType::Monitor)?;
    let hours = state.config.monitor_hours;
    let groups = timelines(Utc::now(), &events, hours);
    Ok(Html(render::monitor_page(&groups, hours)))
}
