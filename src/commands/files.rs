//! Drive file listing.

use std::sync::Arc;
use axum::extract::State;
use axum::Json;
use tracing::{error, info};
use crate::api_contracts::DriveFilesResponse;
use crate::state::AppStateManager;
use super::ApiError;

/// List candidate video files from Drive
pub async fn drive_files(
    State(state_manager): State<Arc<AppStateManager>>,
) -> Result<Json<DriveFilesResponse>, ApiError> {
    let access_token = state_manager.credentials.acquire_token().await?;

    match state_manager.source.list_videos(&access_token).await {
        Ok(files) => {
            info!(count = files.len(), "Listed Drive videos");
            Ok(Json(DriveFilesResponse { files }))
        }
        Err(e) => {
            error!(error = %e, "Failed to list Drive videos");
            Err(e.into())
        }
    }
}
