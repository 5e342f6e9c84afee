//! Health check endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::state::ApiState;

/// GET /api/v1/health
///
/// Returns a simple health check response
pub async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "monitor_running": state.supervisor.is_running(),
    }))
}
