//! Error taxonomy shared by the credential manager, the upload pipeline and
//! the HTTP surface.

use thiserror::Error;

/// Marker returned to callers whenever the fix is to reconnect the Google account.
pub const AUTH_EXPIRED: &str = "AUTH_EXPIRED";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("No OAuth token found. Please connect your Google account.")]
    NotAuthorized,

    #[error("Access token expired and no refresh token is stored. Please reconnect your Google account.")]
    RefreshUnavailable,

    #[error("Token refresh failed: {message}")]
    RefreshFailed { status: Option<u16>, message: String },

    #[error("Authorization code exchange failed: {0}")]
    CodeExchangeFailed(String),

    #[error("Failed to read from Google Drive: {message}")]
    SourceReadFailed { status: Option<u16>, message: String },

    #[error("YouTube rejected the upload: {message}")]
    PublishRejected { status: Option<u16>, message: String },

    #[error("Google OAuth credentials not configured: missing {0}")]
    ConfigMissing(&'static str),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{phase} timed out after {seconds}s")]
    Timeout { phase: &'static str, seconds: u64 },

    #[error("illegal job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unknown(String),
}

impl RelayError {
    /// True when the caller should be sent back through the consent flow
    /// instead of being shown a generic failure.
    pub fn requires_reauthorization(&self) -> bool {
        match self {
            RelayError::NotAuthorized | RelayError::RefreshUnavailable => true,
            RelayError::RefreshFailed { status, .. } => matches!(status, Some(400) | Some(401)),
            RelayError::SourceReadFailed { status, .. }
            | RelayError::PublishRejected { status, .. } => {
                matches!(status, Some(401) | Some(403))
            }
            _ => false,
        }
    }

    /// Stable machine-readable code for the HTTP surface.
    pub fn error_code(&self) -> &'static str {
        if self.requires_reauthorization() {
            return AUTH_EXPIRED;
        }
        match self {
            RelayError::InvalidRequest(_) => "INVALID_REQUEST",
            RelayError::RefreshFailed { .. } => "REFRESH_FAILED",
            RelayError::CodeExchangeFailed(_) => "CODE_EXCHANGE_FAILED",
            RelayError::SourceReadFailed { .. } => "SOURCE_READ_FAILED",
            RelayError::PublishRejected { .. } => "PUBLISH_REJECTED",
            RelayError::ConfigMissing(_) => "CREDENTIALS_MISSING",
            RelayError::Storage(_) | RelayError::Io(_) => "STORAGE_ERROR",
            RelayError::Timeout { .. } => "TIMEOUT",
            RelayError::InvalidTransition { .. } => "INVALID_TRANSITION",
            _ => "UNKNOWN",
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Storage(format!("JSON error: {}", e))
    }
}
