//! Compose descriptor read/write endpoints
//!
//! Saving is refused while the group is running, and the previous file is
//! kept as `<descriptor>.bak`.

use std::path::PathBuf;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ComponentGroup, GroupState,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
    },
    monitors::compose::{DESCRIPTOR_FILE_NAMES, find_descriptor},
    util::is_safe_component_name,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct DescriptorResponse {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DescriptorUpdate {
    pub content: String,
}

fn connector(state: &ApiState, name: &str) -> ApiResult<ComponentGroup> {
    if !is_safe_component_name(name) {
        return Err(ApiError::InvalidRequest(format!(
            "invalid connector name: {name}"
        )));
    }
    Ok(state.prober.connector_group(name))
}

async fn read_descriptor(group: ComponentGroup) -> ApiResult<Json<DescriptorResponse>> {
    let path = find_descriptor(&group.path).ok_or_else(|| {
        ApiError::NotFound(format!("no compose descriptor for {}", group.name))
    })?;

    let content = tokio::fs::read_to_string(&path).await?;

    Ok(Json(DescriptorResponse {
        path: path.display().to_string(),
        content,
    }))
}

async fn write_descriptor(
    state: &ApiState,
    group: ComponentGroup,
    update: DescriptorUpdate,
) -> ApiResult<Json<DescriptorResponse>> {
    if !group.path.is_dir() {
        return Err(ApiError::NotFound(format!(
            "group directory {} does not exist",
            group.path.display()
        )));
    }

    if state.prober.probe_group(&group.path).await == GroupState::Running {
        return Err(ApiError::Conflict(format!(
            "{} is running, stop it before editing its descriptor",
            group.name
        )));
    }

    let path = find_descriptor(&group.path)
        .unwrap_or_else(|| group.path.join(DESCRIPTOR_FILE_NAMES[0]));

    if path.is_file() {
        let backup = backup_path(&path);
        tokio::fs::copy(&path, &backup).await?;
        info!("backed up {} to {}", path.display(), backup.display());
    }

    tokio::fs::write(&path, &update.content).await?;
    info!("saved descriptor {}", path.display());

    Ok(Json(DescriptorResponse {
        path: path.display().to_string(),
        content: update.content,
    }))
}

fn backup_path(path: &std::path::Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

/// GET /api/v1/groups/core/descriptor
pub async fn get_core_descriptor(
    State(state): State<ApiState>,
) -> ApiResult<Json<DescriptorResponse>> {
    read_descriptor(state.prober.core_group()).await
}

/// PUT /api/v1/groups/core/descriptor
pub async fn save_core_descriptor(
    State(state): State<ApiState>,
    Json(update): Json<DescriptorUpdate>,
) -> ApiResult<Json<DescriptorResponse>> {
    let group = state.prober.core_group();
    write_descriptor(&state, group, update).await
}

/// GET /api/v1/groups/connector/:name/descriptor
pub async fn get_connector_descriptor(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<DescriptorResponse>> {
    read_descriptor(connector(&state, &name)?).await
}

/// PUT /api/v1/groups/connector/:name/descriptor
pub async fn save_connector_descriptor(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(update): Json<DescriptorUpdate>,
) -> ApiResult<Json<DescriptorResponse>> {
    let group = connector(&state, &name)?;
    write_descriptor(&state, group, update).await
}
