//! Metric history endpoint

use axum::{Json, extract::State};

use crate::{
    HistoryLog,
    api::{error::ApiResult, state::ApiState},
};

/// GET /api/v1/history
///
/// The full persisted history, oldest first
pub async fn get_history(State(state): State<ApiState>) -> ApiResult<Json<HistoryLog>> {
    let store = state.history.clone();
    let history = tokio::task::spawn_blocking(move || store.query_all()).await?;
    Ok(Json(history))
}
