use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination};
use crate::library::{filter_by_name, Upload, DEFAULT_RECENT_LIMIT};
use crate::storage::models::{FileMetadata, FilePatch};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_starred: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub starred: Option<bool>,
    /// Case-insensitive name search
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path((user_id, subject_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileMetadata>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file_data = Some(data);
            }
            "name" => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid name: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let name = name
        .or(file_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("a file name is required"))?;

    let subject = state
        .library
        .store()
        .get_subject(&subject_id)?
        .filter(|s| s.user_id == user_id)
        .ok_or_else(|| ApiError::not_found("Subject not found"))?;

    let upload = Upload {
        name,
        content_type: file_content_type,
        content: file_data,
    };
    let file = state
        .library
        .upload_pdf(&user_id, &subject.id, upload, None)
        .await?;

    Ok(JSend::success(file))
}

pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpdateFileRequest>,
) -> Result<Json<JSend<FileMetadata>>, ApiError> {
    let patch = FilePatch {
        name: req.name.map(|n| n.trim().to_string()),
        is_starred: req.is_starred,
        ..Default::default()
    };
    if patch.is_empty() {
        return Err(ApiError::bad_request(
            "at least one field (name, is_starred) must be provided",
        ));
    }
    if patch.name.as_deref() == Some("") {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    state.library.owned_file(&user_id, &file_id)?;
    let file = state.library.store().update_file(&file_id, &patch)?;

    Ok(JSend::success(file))
}

pub async fn toggle_star(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_id)): Path<(String, String)>,
) -> Result<Json<JSend<FileMetadata>>, ApiError> {
    state.library.owned_file(&user_id, &file_id)?;
    let file = state.library.store().toggle_star(&file_id)?;
    Ok(JSend::success(file))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_id)): Path<(String, String)>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.library.delete_file(&user_id, &file_id).await?;
    Ok(JSend::success(()))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileMetadata>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let store = state.library.store();
    let mut files = match params.subject_id {
        Some(ref subject_id) => store.list_files_in_subject(&user_id, subject_id)?,
        None => store.list_files(&user_id)?,
    };
    if let Some(starred) = params.starred {
        files.retain(|f| f.is_starred == starred);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        files = filter_by_name(files, q);
    }

    let total = files.len() as u64;
    let items: Vec<FileMetadata> = files
        .into_iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .collect();

    Ok(JSend::page(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

/// Newest files across all subjects.
/// Route: GET /users/:user_id/recent
pub async fn recent_files(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppQuery(params): AppQuery<RecentParams>,
) -> Result<Json<JSend<Vec<FileMetadata>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(JSend::success(state.library.recent(&user_id, limit)?))
}

/// Route: GET /users/:user_id/favorites
pub async fn favorite_files(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<JSend<Vec<FileMetadata>>>, ApiError> {
    Ok(JSend::success(state.library.favorites(&user_id)?))
}
