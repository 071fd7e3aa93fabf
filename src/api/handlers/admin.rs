use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub schema_version: u64,
    pub subscriptions: usize,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub users_deleted: u64,
    pub subjects_deleted: u64,
    pub files_deleted: u64,
    pub blobs_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<HealthResponse>>, ApiError> {
    let store = state.library.store();
    Ok(JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: store.schema_version()?,
        subscriptions: store.registry().len(),
    }))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state.library.store().purge_all()?;

    tracing::warn!(
        users = stats.users,
        subjects = stats.subjects,
        files = stats.files,
        blobs = stats.blobs,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        users_deleted: stats.users,
        subjects_deleted: stats.subjects,
        files_deleted: stats.files,
        blobs_deleted: stats.blobs,
    }))
}
