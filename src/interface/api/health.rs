//! Health endpoint

use super::app_state::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub observers: usize,
    pub uptime_seconds: i64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_sessions: state.sessions.active_count().await,
        observers: state.registry.subscriber_count().await,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}
