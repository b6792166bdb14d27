//! Google consent flow: issue the consent URL and receive the callback.

use std::sync::Arc;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use tracing::{debug, error, info, warn};
use crate::api_contracts::{CallbackQuery, ConnectResponse};
use crate::error::RelayError;
use crate::state::AppStateManager;
use super::ApiError;

/// Start the consent flow
pub async fn connect_drive(
    State(state_manager): State<Arc<AppStateManager>>,
) -> Result<Json<ConnectResponse>, ApiError> {
    info!("Generating Google consent URL");
    match state_manager.begin_authorization() {
        Ok(response) => {
            debug!(state = %response.state, "consent URL issued");
            Ok(Json(response))
        }
        Err(e) => {
            error!(error = %e, "Failed to build consent URL");
            Err(e.into())
        }
    }
}

/// Redirect target registered with Google
pub async fn oauth_callback(
    State(state_manager): State<Arc<AppStateManager>>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    match complete_authorization(&state_manager, query).await {
        Ok(()) => {
            info!("Google account connected");
            Redirect::to("/?oauth_success=true")
        }
        Err(reason) => {
            warn!(reason = %reason, "OAuth callback rejected");
            Redirect::to(&format!("/?oauth_error={}", reason))
        }
    }
}

/// Returns the `oauth_error` reason on failure.
async fn complete_authorization(
    state_manager: &AppStateManager,
    query: CallbackQuery,
) -> Result<(), String> {
    if let Some(provider_error) = query.error.filter(|e| !e.is_empty()) {
        return Err(sanitize_reason(&provider_error));
    }

    let code = match query.code.filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => return Err("no_code".to_string()),
    };

    let state_ok = query
        .state
        .as_deref()
        .is_some_and(|state| state_manager.pending_authorizations.redeem(state));
    if !state_ok {
        return Err("invalid_state".to_string());
    }

    let grant = state_manager
        .credentials
        .authorizer()
        .exchange_code(&code)
        .await
        .map_err(|e| {
            error!(error = %e, "Authorization code exchange failed");
            match e {
                RelayError::ConfigMissing(_) => "credentials_missing".to_string(),
                _ => "callback_failed".to_string(),
            }
        })?;

    state_manager
        .credentials
        .store_credential(grant)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store Google credential");
            "callback_failed".to_string()
        })?;

    Ok(())
}

/// Keep only characters that are safe to echo in a query string.
fn sanitize_reason(reason: &str) -> String {
    let cleaned: String = reason
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "callback_failed".to_string()
    } else {
        cleaned
    }
}
