use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::storage::models::UserProfile;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<Json<JSend<UserProfile>>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("password must not be empty"));
    }

    // Hashing is CPU-bound; keep it off the async workers.
    let store = state.library.store().clone();
    let email = email.to_string();
    let display_name = req
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    let user = tokio::task::spawn_blocking(move || {
        store.signup(&email, &req.password, &display_name)
    })
    .await
    .map_err(|e| ApiError::internal(format!("signup task failed: {e}")))??;

    tracing::info!(uid = %user.uid, "User signed up");
    Ok(JSend::success(user))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<UserProfile>>, ApiError> {
    let store = state.library.store().clone();
    let user = tokio::task::spawn_blocking(move || store.login(req.email.trim(), &req.password))
        .await
        .map_err(|e| ApiError::internal(format!("login task failed: {e}")))??;

    Ok(JSend::success(user))
}
