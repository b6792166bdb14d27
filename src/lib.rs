pub mod api_contracts;
pub mod commands;
pub mod config_utils;
pub mod credential_manager;
pub mod drive_client;
pub mod error;
pub mod google_auth;
pub mod logging;
pub mod providers;
pub mod services;
pub mod state;
pub mod store;
pub mod types;
pub mod upload_manager;
pub mod youtube_client;

#[cfg(test)]
mod test_harness;

use std::sync::Arc;
use tracing::{error, info, warn};
use crate::config_utils::RelayConfig;
use crate::error::RelayError;
use crate::types::ConnectionState;

/// Load configuration, wire the relay over the JSON-file store and serve the
/// HTTP API until Ctrl-C.
///
/// In-flight uploads are not awaited on shutdown; their records keep the
/// last persisted checkpoint.
pub async fn run() -> Result<(), RelayError> {
    let config = RelayConfig::load()?;
    let _log_guard = logging::init_logging(config.log_json)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting DriveTube uploader");

    let data_dir = config.resolve_data_dir()?;
    let store = Arc::new(store::JsonFileStore::open(&data_dir)?);
    info!(dir = %data_dir.display(), "Record store opened");

    let bind_addr = config.bind_addr.clone();
    let open_browser = config.open_browser;
    let state = Arc::new(state::AppStateManager::from_config(
        config,
        store.clone(),
        store,
    ));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Listening");

    match state.credentials.status() {
        Ok(ConnectionState::Connected { expires_at, can_refresh }) => {
            info!(expires_at = %expires_at, can_refresh, "Google account connected");
        }
        Ok(ConnectionState::Expired) => {
            warn!("Stored Google credential expired and cannot be refreshed; reconnect required");
        }
        Ok(ConnectionState::NotConnected) => {
            info!("No Google account connected yet");
            if open_browser {
                match state.begin_authorization() {
                    Ok(connect) => {
                        if let Err(e) = commands::browser::open_browser(&connect.auth_url) {
                            warn!(error = %e, "Could not open the consent page");
                        }
                    }
                    Err(e) => warn!(error = %e, "Consent URL unavailable"),
                }
            }
        }
        Err(e) => error!(error = %e, "Failed to read stored credential"),
    }

    axum::serve(listener, commands::build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
