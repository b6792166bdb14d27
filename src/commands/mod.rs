//! HTTP command modules.
//!
//! Each submodule holds the handlers for one area of the API; `build_router`
//! mounts them under the paths the web client calls. Failures are reported
//! as `{message, error}` where `error` is the stable code from
//! [`RelayError::error_code`].

pub mod auth;
pub mod browser;
pub mod files;
pub mod tokens;
pub mod upload;

use std::sync::Arc;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use crate::api_contracts::ErrorBody;
use crate::error::RelayError;
use crate::state::AppStateManager;

/// Error response for every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                message: message.to_string(),
                error: "NOT_FOUND".to_string(),
            },
        }
    }
}

fn status_for(err: &RelayError) -> StatusCode {
    if err.requires_reauthorization() {
        return StatusCode::UNAUTHORIZED;
    }
    match err {
        RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody {
                message: err.to_string(),
                error: err.error_code().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn build_router(state: Arc<AppStateManager>) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/api/youtube/connect-drive", post(auth::connect_drive))
        .route("/api/youtube/callback", get(auth::oauth_callback))
        .route("/api/youtube/auth/status", get(tokens::auth_status))
        .route("/api/youtube/auth/token", post(tokens::ensure_token))
        .route("/api/youtube/drive-files", get(files::drive_files))
        .route("/api/youtube/upload", post(upload::submit_upload))
        .route("/api/youtube/history", get(upload::upload_history))
        .route("/api/youtube/uploads/{upload_id}", get(upload::get_upload))
        .with_state(state)
}

async fn health_live() -> impl IntoResponse {
    Json(json!({
        "status": "live",
        "timestamp": Utc::now().to_rfc3339()
    }))
}
