//! Application state manager shared by all HTTP handlers.

use super::PendingAuthorizations;
use crate::api_contracts::ConnectResponse;
use crate::config_utils::RelayConfig;
use crate::credential_manager::CredentialManager;
use crate::drive_client::DriveClient;
use crate::error::RelayError;
use crate::google_auth::GoogleAuthClient;
use crate::providers::{PublishProvider, SourceProvider};
use crate::services::UploadExecutor;
use crate::store::{CredentialStore, JobStore};
use crate::types::DEFAULT_USER_ID;
use crate::upload_manager::UploadManager;
use crate::youtube_client::YouTubeClient;
use std::sync::Arc;

/// Manages the application state and provides access to shared resources
pub struct AppStateManager {
    /// Single stored Google credential
    pub credentials: Arc<CredentialManager>,
    /// Drive, for listing candidate files
    pub source: Arc<dyn SourceProvider>,
    /// Job submission and history
    pub uploads: UploadManager,
    /// Consent-flow `state` values awaiting their callback
    pub pending_authorizations: PendingAuthorizations,
}

impl AppStateManager {
    pub fn new(
        credentials: Arc<CredentialManager>,
        source: Arc<dyn SourceProvider>,
        uploads: UploadManager,
    ) -> Self {
        Self {
            credentials,
            source,
            uploads,
            pending_authorizations: PendingAuthorizations::default(),
        }
    }

    /// Wire the Google clients, the credential manager and the upload
    /// pipeline together over the given stores.
    pub fn from_config(
        config: RelayConfig,
        credential_store: Arc<dyn CredentialStore>,
        job_store: Arc<dyn JobStore>,
    ) -> Self {
        let authorizer = Arc::new(GoogleAuthClient::new(&config));
        let credentials = Arc::new(CredentialManager::new(
            DEFAULT_USER_ID,
            credential_store,
            authorizer,
        ));

        let source: Arc<dyn SourceProvider> = Arc::new(DriveClient::new(&config.google_api_host));
        let publisher: Arc<dyn PublishProvider> =
            Arc::new(YouTubeClient::new(&config.google_api_host));

        let executor = UploadExecutor::new(
            Arc::clone(&job_store),
            Arc::clone(&credentials),
            Arc::clone(&source),
            publisher,
        )
        .with_timeouts(config.download_timeout(), config.upload_timeout())
        .with_max_concurrent(config.max_concurrent_transfers);

        let uploads = UploadManager::new(
            DEFAULT_USER_ID,
            job_store,
            Arc::new(executor),
            config.history_limit,
        );

        Self::new(credentials, source, uploads)
    }

    /// Issue a `state` and build the consent URL carrying it.
    pub fn begin_authorization(&self) -> Result<ConnectResponse, RelayError> {
        let state = self.pending_authorizations.issue();
        let auth_url = self.credentials.authorizer().consent_url(&state)?;
        Ok(ConnectResponse { auth_url, state })
    }
}
