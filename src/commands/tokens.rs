//! Credential status and on-demand refresh.

use std::sync::Arc;
use axum::extract::State;
use axum::Json;
use tracing::{debug, error};
use crate::api_contracts::TokenStatusResponse;
use crate::state::AppStateManager;
use crate::types::ConnectionState;
use super::ApiError;

/// Report the stored credential's state without calling Google
pub async fn auth_status(
    State(state_manager): State<Arc<AppStateManager>>,
) -> Result<Json<ConnectionState>, ApiError> {
    let status = state_manager.credentials.status()?;
    debug!(status = ?status, "credential status");
    Ok(Json(status))
}

/// Make sure a usable access token exists now, refreshing if needed
pub async fn ensure_token(
    State(state_manager): State<Arc<AppStateManager>>,
) -> Result<Json<TokenStatusResponse>, ApiError> {
    match state_manager.credentials.acquire_token().await {
        Ok(_) => {
            let expires_at = state_manager.credentials.current()?.map(|r| r.expiry);
            Ok(Json(TokenStatusResponse {
                connected: true,
                expires_at,
            }))
        }
        Err(e) => {
            error!(error = %e, "Failed to obtain a valid access token");
            Err(e.into())
        }
    }
}
