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
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub files: u64,
    pub pending_jobs: u64,
    pub users: u64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub files_deleted: u64,
    pub jobs_deleted: u64,
    pub users_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<StatsResponse>>, ApiError> {
    let (users, files) = state
        .db
        .counts()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let pending_jobs = state
        .db
        .job_count()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(StatsResponse {
        files,
        pending_jobs,
        users,
    }))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::warn!(
        files = stats.files,
        users = stats.users,
        jobs = stats.jobs,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        files_deleted: stats.files,
        jobs_deleted: stats.jobs,
        users_deleted: stats.users,
    }))
}
