//! Credential Manager
//!
//! Owns the single stored Google credential and hands out access tokens
//! that are valid for at least the refresh margin. Refreshes are
//! single-flight: concurrent callers that all find the token stale wait on
//! one guard, and everyone after the first re-reads the refreshed record
//! instead of calling the token endpoint again.

use crate::error::RelayError;
use crate::logging::token_preview;
use crate::providers::AuthorizationProvider;
use crate::store::CredentialStore;
use crate::types::{ConnectionState, CredentialRecord, TokenGrant};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct CredentialManager {
    user_id: String,
    store: Arc<dyn CredentialStore>,
    authorizer: Arc<dyn AuthorizationProvider>,
    refresh_guard: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        user_id: &str,
        store: Arc<dyn CredentialStore>,
        authorizer: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            store,
            authorizer,
            refresh_guard: Mutex::new(()),
        }
    }

    /// Return an access token that is not within the refresh margin of its
    /// expiry, refreshing and persisting it first when needed.
    pub async fn acquire_token(&self) -> Result<String, RelayError> {
        let record = self.store.get(&self.user_id)?.ok_or(RelayError::NotAuthorized)?;
        if !record.needs_refresh(Utc::now()) {
            return Ok(record.access_token);
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited
        let record = self.store.get(&self.user_id)?.ok_or(RelayError::NotAuthorized)?;
        if !record.needs_refresh(Utc::now()) {
            debug!("token refreshed by a concurrent caller");
            return Ok(record.access_token);
        }

        let refresh_token = match record.refresh_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                warn!("access token expired and no refresh token is stored");
                return Err(RelayError::RefreshUnavailable);
            }
        };

        info!(expired_at = %record.expiry, "refreshing Google access token");
        let grant = self.authorizer.refresh(&refresh_token).await.map_err(|e| {
            warn!(error = %e, "token refresh failed");
            e
        })?;

        let refreshed = CredentialRecord {
            access_token: grant.access_token.clone(),
            expiry: grant.expiry_or_default(Utc::now()),
            // Google rarely rotates the refresh token; keep ours unless it does
            refresh_token: grant.refresh_token.or(Some(refresh_token)),
        };
        self.store.put(&self.user_id, refreshed.clone())?;

        debug!(
            token = %token_preview(&refreshed.access_token),
            expires_at = %refreshed.expiry,
            "token refreshed"
        );
        Ok(refreshed.access_token)
    }

    /// Upsert the credential after a successful authorization exchange.
    ///
    /// A grant without a refresh token keeps the one already stored. Waits
    /// for an in-flight refresh so its result cannot overwrite this one.
    pub async fn store_credential(&self, grant: TokenGrant) -> Result<CredentialRecord, RelayError> {
        if grant.access_token.trim().is_empty() {
            return Err(RelayError::InvalidRequest(
                "authorization returned an empty access token".to_string(),
            ));
        }

        let _guard = self.refresh_guard.lock().await;

        let previous_refresh = self
            .store
            .get(&self.user_id)?
            .and_then(|existing| existing.refresh_token)
            .filter(|token| !token.is_empty());

        let record = CredentialRecord {
            expiry: grant.expiry_or_default(Utc::now()),
            refresh_token: grant
                .refresh_token
                .filter(|token| !token.is_empty())
                .or(previous_refresh),
            access_token: grant.access_token,
        };
        self.store.put(&self.user_id, record.clone())?;

        info!(
            expires_at = %record.expiry,
            has_refresh_token = record.refresh_token.is_some(),
            "Google credential stored"
        );
        Ok(record)
    }

    /// Connection state derived from the stored record alone.
    pub fn status(&self) -> Result<ConnectionState, RelayError> {
        let record = self.store.get(&self.user_id)?;
        Ok(ConnectionState::from_record(record.as_ref(), Utc::now()))
    }

    /// The stored record after a successful `acquire_token`; used to report
    /// the expiry without exposing the token.
    pub fn current(&self) -> Result<Option<CredentialRecord>, RelayError> {
        self.store.get(&self.user_id)
    }

    pub fn authorizer(&self) -> &Arc<dyn AuthorizationProvider> {
        &self.authorizer
    }
}
