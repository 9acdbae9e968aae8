use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::requestor;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination};
use crate::catalog::{NewFile, PAGE_SIZE};
use crate::storage::models::{FileRecord, FileType};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    pub is_public: bool,
    pub name: String,
    /// `"0"` for files at the root
    pub parent_id: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    /// Accepts both `0` and string ids
    #[serde(default)]
    pub parent_id: Option<serde_json::Value>,
    #[serde(default)]
    pub is_public: bool,
    /// Base64-encoded content
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesParams {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct FileDataParams {
    #[serde(default)]
    pub size: Option<u32>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(req): AppJson<CreateFileRequest>,
) -> Result<(StatusCode, Json<JSend<FileResponse>>), ApiError> {
    let requestor = requestor(&state, &headers)?;
    let owner = requestor.require_user()?;

    let data = match req.data {
        Some(encoded) => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|_| ApiError::bad_request("data must be base64-encoded"))?;
            if decoded.len() as u64 > state.config.max_upload_size {
                return Err(ApiError::payload_too_large(format!(
                    "File exceeds maximum upload size of {} bytes",
                    state.config.max_upload_size
                )));
            }
            Some(Bytes::from(decoded))
        }
        None => None,
    };

    let parent_id = match req.parent_id {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let file = state
        .catalog
        .upload(
            owner,
            NewFile {
                name: req.name,
                file_type: req.file_type,
                parent_id,
                is_public: req.is_public,
                data,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, JSend::success(file_to_response(&file))))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let file = state.catalog.show(requestor.require_user()?, &id)?;
    Ok(JSend::success(file_to_response(&file)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let files = state.catalog.list(
        requestor.require_user()?,
        params.parent_id.as_deref(),
        params.page,
    )?;

    Ok(JSendPaginated::success(
        files.iter().map(file_to_response).collect(),
        Pagination {
            page: params.page,
            page_size: PAGE_SIZE,
        },
    ))
}

pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let file = state.catalog.publish(requestor.require_user()?, &id)?;
    Ok(JSend::success(file_to_response(&file)))
}

pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let file = state.catalog.unpublish(requestor.require_user()?, &id)?;
    Ok(JSend::success(file_to_response(&file)))
}

/// Serve file content, or one of its thumbnails with `?size=`.
/// Anonymous callers are allowed; the access gate decides.
pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<FileDataParams>,
) -> Result<Response, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let content = state.access.open(&requestor, &id, params.size).await?;

    let mut response = (StatusCode::OK, content.data).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        content
            .mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    // Visibility can be revoked at any time
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, no-cache"),
    );

    Ok(response)
}

// ============================================================================
// Helpers
// ============================================================================

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        id: file.id.clone(),
        is_public: file.is_public,
        name: file.name.clone(),
        parent_id: file.parent_id.clone().unwrap_or_else(|| "0".to_string()),
        file_type: file.file_type,
        user_id: file.user_id.clone(),
    }
}
