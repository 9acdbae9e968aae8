use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Uploads arrive base64-encoded, a third larger than the decoded limit
    let upload_limit = (state.config.max_upload_size as usize).saturating_mul(4) / 3 + 1024;

    let mut router = Router::new()
        // Users & sessions
        .route("/users", post(handlers::create_user))
        .route("/users/me", get(handlers::get_me))
        .route("/connect", get(handlers::connect))
        .route("/disconnect", get(handlers::disconnect))
        // Files
        .route("/files", get(handlers::list_files))
        .route(
            "/files",
            post(handlers::create_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id/data", get(handlers::get_file_data))
        .route("/files/:id/publish", put(handlers::publish_file))
        .route("/files/:id/unpublish", put(handlers::unpublish_file))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .route("/_internal/stats", get(handlers::stats));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
