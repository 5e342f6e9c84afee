//! Group status and connector listing endpoints

use axum::{Json, extract::State};

use crate::{ConnectorInfo, GroupStatus, actors::monitor::known_connectors, api::state::ApiState};

/// GET /api/v1/status
///
/// Probe every group now
pub async fn get_status(State(state): State<ApiState>) -> Json<GroupStatus> {
    Json(state.prober.full_status_update().await)
}

/// GET /api/v1/connectors
///
/// Discovered connectors, sorted by name
pub async fn list_connectors(State(state): State<ApiState>) -> Json<Vec<ConnectorInfo>> {
    Json(known_connectors(&state.prober))
}
