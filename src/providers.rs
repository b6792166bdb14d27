//! Seams to the three Google collaborators.
//!
//! The concrete clients live in `google_auth`, `drive_client` and
//! `youtube_client`; tests substitute their own implementations.

use crate::api_contracts::SourceFile;
use crate::error::RelayError;
use crate::types::TokenGrant;
use crate::upload_manager::VideoMetadata;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Body of a source file, delivered chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Bytes, RelayError>>;

#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Consent URL requesting offline access with a forced consent prompt.
    fn consent_url(&self, state: &str) -> Result<String, RelayError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, RelayError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RelayError>;
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Candidate video files, newest first.
    async fn list_videos(&self, access_token: &str) -> Result<Vec<SourceFile>, RelayError>;

    async fn fetch_content(&self, access_token: &str, file_id: &str) -> Result<ByteStream, RelayError>;
}

#[async_trait]
pub trait PublishProvider: Send + Sync {
    /// Publish the video and return the id assigned by the target service.
    async fn publish(
        &self,
        access_token: &str,
        video: Vec<u8>,
        metadata: &VideoMetadata,
    ) -> Result<String, RelayError>;
}
