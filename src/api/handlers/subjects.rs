use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::library::LibraryStats;
use crate::storage::models::Subject;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

pub async fn list_subjects(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<JSend<Vec<Subject>>>, ApiError> {
    let subjects = state.library.store().list_subjects(&user_id)?;
    Ok(JSend::success(subjects))
}

pub async fn create_subject(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<CreateSubjectRequest>,
) -> Result<Json<JSend<Subject>>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let subject = state
        .library
        .store()
        .create_subject(&user_id, name, req.color.as_deref())?;

    tracing::debug!(subject_id = %subject.id, "Created subject");
    Ok(JSend::success(subject))
}

/// Deletes the subject along with its files and their content.
pub async fn delete_subject(
    State(state): State<Arc<AppState>>,
    Path((user_id, subject_id)): Path<(String, String)>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.library.delete_subject(&user_id, &subject_id).await?;
    Ok(JSend::success(()))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<JSend<LibraryStats>>, ApiError> {
    Ok(JSend::success(state.library.stats(&user_id)?))
}
