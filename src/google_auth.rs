use crate::api_contracts::{OAuthErrorResponse, TokenResponse};
use crate::config_utils::RelayConfig;
use crate::error::RelayError;
use crate::providers::AuthorizationProvider;
use crate::types::TokenGrant;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Url;

const SCOPES: &str = "https://www.googleapis.com/auth/youtube.upload https://www.googleapis.com/auth/drive.readonly";

/// OAuth client for the Google account used on both sides of the relay
pub struct GoogleAuthClient {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    consent_url: String,
    token_url: String,
    client: reqwest::Client,
}

impl GoogleAuthClient {
    pub fn new(config: &RelayConfig) -> Self {
        let user_agent = format!("DriveTubeUploader/{}", env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            consent_url: config.oauth_consent_url.clone(),
            token_url: config.oauth_token_url.clone(),
            client,
        }
    }

    fn client_id(&self) -> Result<&str, RelayError> {
        self.client_id.as_deref().ok_or(RelayError::ConfigMissing("GOOGLE_CLIENT_ID"))
    }

    fn client_secret(&self) -> Result<&str, RelayError> {
        self.client_secret
            .as_deref()
            .ok_or(RelayError::ConfigMissing("GOOGLE_CLIENT_SECRET"))
    }

    fn redirect_uri(&self) -> Result<&str, RelayError> {
        self.redirect_uri
            .as_deref()
            .ok_or(RelayError::ConfigMissing("GOOGLE_REDIRECT_URI"))
    }

    /// POST a form to the token endpoint.
    ///
    /// Returns the HTTP status alongside the error message so callers can
    /// tell a revoked grant (400/401) from a transient failure.
    async fn token_request(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, (Option<u16>, String)> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| (None, format!("Network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<OAuthErrorResponse>(&error_text) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("Server error ({}): {}", status, error_text),
            };
            return Err((Some(status.as_u16()), message));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| (None, format!("Failed to parse response: {}", e)))?;

        let expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
            expiry,
        })
    }
}

#[async_trait]
impl AuthorizationProvider for GoogleAuthClient {
    fn consent_url(&self, state: &str) -> Result<String, RelayError> {
        let mut url = Url::parse(&self.consent_url)
            .map_err(|e| RelayError::Unknown(format!("Invalid consent URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", self.client_id()?)
            .append_pair("redirect_uri", self.redirect_uri()?)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, RelayError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id()?),
            ("client_secret", self.client_secret()?),
            ("redirect_uri", self.redirect_uri()?),
        ];

        self.token_request(&form)
            .await
            .map_err(|(_, message)| RelayError::CodeExchangeFailed(message))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RelayError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id()?),
            ("client_secret", self.client_secret()?),
        ];

        self.token_request(&form)
            .await
            .map_err(|(status, message)| RelayError::RefreshFailed { status, message })
    }
}
