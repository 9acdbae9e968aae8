use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{requestor, token};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::storage::models::UserRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<JSend<UserResponse>>), ApiError> {
    let user = state
        .auth
        .register(req.email.as_deref(), req.password.as_deref())?;
    Ok((StatusCode::CREATED, JSend::success(user_to_response(&user))))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<UserResponse>>, ApiError> {
    let requestor = requestor(&state, &headers)?;
    let user = requestor.require_user()?;
    Ok(JSend::success(user_to_response(user)))
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<TokenResponse>>, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = state.auth.connect(authorization)?;
    Ok(JSend::success(TokenResponse { token }))
}

pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.auth.disconnect(token(&headers))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

fn user_to_response(user: &UserRecord) -> UserResponse {
    UserResponse {
        email: user.email.clone(),
        id: user.id.clone(),
    }
}
