use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::AppState;

/// Serve a file's PDF bytes for inline viewing.
/// Route: GET /users/:user_id/files/:file_id/content
pub async fn serve_content(
    State(state): State<Arc<AppState>>,
    Path((user_id, file_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (file, data) = state.library.read_content(&user_id, &file_id).await?;

    // Build response with appropriate headers
    let length = data.len() as u64;
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        file.mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/pdf")),
    );

    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(length));

    // Quotes and control characters would break the header value
    let filename: String = file
        .name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Content never changes under a storage path; metadata lives elsewhere
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}
