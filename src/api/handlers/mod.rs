mod admin;
mod files;
mod users;

use axum::http::HeaderMap;

use crate::api::response::ApiError;
use crate::auth::Requestor;
use crate::AppState;

pub use admin::{admin_purge, health, stats};
pub use files::{create_file, get_file, get_file_data, list_files, publish_file, unpublish_file};
pub use users::{connect, create_user, disconnect, get_me};

/// Session token sent by clients
const TOKEN_HEADER: &str = "x-token";

fn token(headers: &HeaderMap) -> Option<&str> {
    headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok())
}

/// Identify the caller from the `X-Token` header.
fn requestor(state: &AppState, headers: &HeaderMap) -> Result<Requestor, ApiError> {
    Ok(state.auth.identify(token(headers))?)
}
