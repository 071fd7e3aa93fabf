use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the HTTP API.
///
/// Routes trust the `:user_id` path segment as given. Owner scoping keeps one user's records
/// out of another user's listings; it is not access control. The server is meant for local
/// use only and binds to 127.0.0.1 unless configured otherwise.
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize + MULTIPART_OVERHEAD;

    let mut router = Router::new()
        // Auth
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        // Subjects
        .route("/users/:user_id/subjects", get(handlers::list_subjects))
        .route("/users/:user_id/subjects", post(handlers::create_subject))
        .route(
            "/users/:user_id/subjects/:subject_id",
            delete(handlers::delete_subject),
        )
        // Files
        .route("/users/:user_id/files", get(handlers::list_files))
        .route(
            "/users/:user_id/subjects/:subject_id/files",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/:user_id/files/:file_id", patch(handlers::update_file))
        .route("/users/:user_id/files/:file_id", delete(handlers::delete_file))
        .route(
            "/users/:user_id/files/:file_id/star",
            post(handlers::toggle_star),
        )
        .route(
            "/users/:user_id/files/:file_id/content",
            get(handlers::serve_content),
        )
        .route("/users/:user_id/recent", get(handlers::recent_files))
        .route("/users/:user_id/favorites", get(handlers::favorite_files))
        .route("/users/:user_id/stats", get(handlers::stats))
        // Live views
        .route("/users/:user_id/events/files", get(handlers::file_events))
        .route("/users/:user_id/events/subjects", get(handlers::subject_events))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled: purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
