use crate::api_contracts::{google_error_message, DriveFileList, SourceFile};
use crate::error::RelayError;
use crate::logging::token_preview;
use crate::providers::{ByteStream, SourceProvider};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Url;
use tracing::debug;

const VIDEO_QUERY: &str = "mimeType contains 'video/'";
const LIST_FIELDS: &str = "files(id,name,size,modifiedTime,mimeType,thumbnailLink)";
const PAGE_SIZE: &str = "50";

/// Google Drive v3 client, read-only
pub struct DriveClient {
    base_url: String,
    client: reqwest::Client,
}

impl DriveClient {
    pub fn new(base_url: &str) -> Self {
        // No overall timeout: content downloads are bounded per phase by the executor
        let user_agent = format!("DriveTubeUploader/{}", env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }

    /// Content URL for one file. The id is pushed as a single encoded path
    /// segment so it can never address another resource.
    fn file_url(&self, file_id: &str) -> Result<Url, RelayError> {
        let id = file_id.trim();
        if id.is_empty() || id == "." || id == ".." {
            return Err(RelayError::InvalidRequest(format!(
                "invalid Drive file id: {:?}",
                file_id
            )));
        }

        let invalid_base = || RelayError::SourceReadFailed {
            status: None,
            message: format!("invalid Google API host: {}", self.base_url),
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid_base())?;
        url.path_segments_mut()
            .map_err(|_| invalid_base())?
            .pop_if_empty()
            .extend(["drive", "v3", "files"])
            .push(id);
        Ok(url)
    }
}

async fn read_failure(response: reqwest::Response) -> RelayError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    RelayError::SourceReadFailed {
        status: Some(status.as_u16()),
        message: format!("{} ({})", google_error_message(&error_text), status),
    }
}

fn network_failure(e: reqwest::Error) -> RelayError {
    RelayError::SourceReadFailed {
        status: e.status().map(|s| s.as_u16()),
        message: format!("Network error: {}", e),
    }
}

#[async_trait]
impl SourceProvider for DriveClient {
    async fn list_videos(&self, access_token: &str) -> Result<Vec<SourceFile>, RelayError> {
        debug!(token = %token_preview(access_token), "listing Drive videos");

        let response = self
            .client
            .get(self.files_url())
            .bearer_auth(access_token)
            .query(&[
                ("q", VIDEO_QUERY),
                ("fields", LIST_FIELDS),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", PAGE_SIZE),
            ])
            .send()
            .await
            .map_err(network_failure)?;

        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let list: DriveFileList = response.json().await.map_err(|e| RelayError::SourceReadFailed {
            status: None,
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(list.files.into_iter().map(SourceFile::from).collect())
    }

    async fn fetch_content(&self, access_token: &str, file_id: &str) -> Result<ByteStream, RelayError> {
        let response = self
            .client
            .get(self.file_url(file_id)?)
            .bearer_auth(access_token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(network_failure)?;

        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        Ok(Box::pin(response.bytes_stream().map_err(network_failure)))
    }
}
