//! Core types for the stored Google credential.
//!
//! There is exactly one credential record, keyed by [`DEFAULT_USER_ID`].
//! It is created by the OAuth callback and rewritten on every refresh.

use chrono::{DateTime, Duration, Utc};

/// Fixed key for the single stored credential and for upload history
pub const DEFAULT_USER_ID: &str = "default-user";

/// Tokens are treated as expired this long before their actual expiry
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Lifetime assumed when the authorization server omits one
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Stored OAuth credential for the Google account
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl CredentialRecord {
    /// Whether the access token must not be used at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry - Duration::seconds(REFRESH_MARGIN_SECS)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Token material returned by a code exchange or a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenGrant {
    /// Expiry to persist, falling back to one hour from `now`.
    pub fn expiry_or_default(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expiry
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
    }
}

/// What the stored credential allows right now, without calling Google
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    NotConnected,
    #[serde(rename_all = "camelCase")]
    Connected {
        expires_at: DateTime<Utc>,
        /// False when the access token is the last one we will get
        can_refresh: bool,
    },
    /// Access token expired and nothing to refresh it with
    Expired,
}

impl ConnectionState {
    pub fn from_record(record: Option<&CredentialRecord>, now: DateTime<Utc>) -> Self {
        match record {
            None => ConnectionState::NotConnected,
            Some(r) if r.needs_refresh(now) && !r.can_refresh() => ConnectionState::Expired,
            Some(r) => ConnectionState::Connected {
                expires_at: r.expiry,
                can_refresh: r.can_refresh(),
            },
        }
    }
}
