//! Upload submission and status queries.

use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, warn};
use crate::api_contracts::{
    SubmitUploadRequest, SubmitUploadResponse, UploadHistoryEntry, UploadHistoryResponse,
};
use crate::error::RelayError;
use crate::state::AppStateManager;
use crate::upload_manager::{VideoMetadata, Visibility};
use super::ApiError;

/// Queue a Drive → YouTube upload and return its id immediately
pub async fn submit_upload(
    State(state_manager): State<Arc<AppStateManager>>,
    payload: Result<Json<SubmitUploadRequest>, JsonRejection>,
) -> Result<Json<SubmitUploadResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Malformed upload request");
        RelayError::InvalidRequest(rejection.body_text())
    })?;

    let visibility = request
        .privacy_status
        .as_deref()
        .map(str::parse::<Visibility>)
        .transpose()?
        .unwrap_or_default();

    let metadata = VideoMetadata::new(
        &request.title,
        request.description,
        request.tags.unwrap_or_default(),
        visibility,
    );

    match state_manager.uploads.submit(&request.drive_file_id, metadata) {
        // The background task is detached; progress is observed by polling
        Ok(submitted) => Ok(Json(SubmitUploadResponse {
            success: true,
            upload_id: submitted.id,
            video_id: None,
        })),
        Err(e) => {
            warn!(error = %e, "Upload submission rejected");
            Err(e.into())
        }
    }
}

/// Most recent uploads, newest first
pub async fn upload_history(
    State(state_manager): State<Arc<AppStateManager>>,
) -> Result<Json<UploadHistoryResponse>, ApiError> {
    let jobs = state_manager.uploads.history()?;
    debug!(count = jobs.len(), "Loaded upload history");
    Ok(Json(UploadHistoryResponse {
        uploads: jobs.iter().map(UploadHistoryEntry::from).collect(),
    }))
}

/// A single upload, for polling
pub async fn get_upload(
    State(state_manager): State<Arc<AppStateManager>>,
    Path(upload_id): Path<String>,
) -> Result<Json<UploadHistoryEntry>, ApiError> {
    match state_manager.uploads.get_job(&upload_id)? {
        Some(job) => Ok(Json(UploadHistoryEntry::from(&job))),
        None => Err(ApiError::not_found("Upload not found")),
    }
}
