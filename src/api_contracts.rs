/**
 * API Contract Types for DriveTube Uploader
 *
 * Two groups of types live here:
 * - the Google wire formats we consume (OAuth token endpoint, Drive v3,
 *   YouTube Data v3)
 * - the JSON contract of our own HTTP surface, which keeps the camelCase
 *   field names the web client already uses
 *
 * Principles:
 * - Use explicit Option<T> for fields Google may omit
 * - Use serde attributes to match JSON format exactly
 */

use crate::upload_manager::{JobStatus, TransferJob, Visibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Google OAuth token endpoint
// =============================================================================

/// Response from the token endpoint for both code exchange and refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// Error body from the token endpoint (e.g. `invalid_grant`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

// =============================================================================
// Google Drive v3
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// File resource as returned by `files.list` (only the requested fields)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub size: Option<String>,       // Drive sends int64 as a decimal string
    pub mime_type: Option<String>,
    pub thumbnail_link: Option<String>,
    pub modified_time: Option<String>, // RFC 3339
}

/// Candidate video file offered to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub thumbnail_url: Option<String>,
    pub modified_time: String,
}

impl From<DriveFile> for SourceFile {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id.unwrap_or_default(),
            name: file.name.unwrap_or_default(),
            size: file.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            mime_type: file.mime_type.unwrap_or_default(),
            thumbnail_url: file.thumbnail_link,
            modified_time: file
                .modified_time
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        }
    }
}

// =============================================================================
// YouTube Data v3
// =============================================================================

/// Video resource sent as the metadata part of `videos.insert`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResource {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: Visibility,
    pub self_declared_made_for_kids: bool,
}

/// The part of the inserted video resource we use
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoInsertResponse {
    pub id: String,
}

/// Standard Google API error envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleErrorBody {
    pub code: Option<u16>,
    pub message: String,
}

/// Best-effort human-readable message from a Google error body.
pub fn google_error_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

// =============================================================================
// HTTP surface
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub auth_url: String,
    pub state: String,
}

/// Query string Google appends to the redirect URI
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveFilesResponse {
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitUploadRequest {
    /// Missing fields decode as empty and are rejected by validation
    #[serde(default)]
    pub drive_file_id: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Parsed leniently so a bad value becomes a 400 rather than a body rejection
    pub privacy_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitUploadResponse {
    pub success: bool,
    pub upload_id: String,
    /// Always null at submission; the id is only known once the job completes
    pub video_id: Option<String>,
}

/// One row of upload history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadHistoryEntry {
    pub id: String,
    pub youtube_video_id: Option<String>,
    pub title: String,
    pub status: JobStatus,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
    pub error_message: Option<String>,
    pub privacy_status: Visibility,
}

impl From<&TransferJob> for UploadHistoryEntry {
    fn from(job: &TransferJob) -> Self {
        Self {
            id: job.id.clone(),
            youtube_video_id: job.result_id.clone(),
            title: job.metadata.title.clone(),
            status: job.status,
            progress: job.progress,
            timestamp: job.created_at,
            error_message: job.error_detail.clone(),
            privacy_status: job.metadata.visibility,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadHistoryResponse {
    pub uploads: Vec<UploadHistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatusResponse {
    pub connected: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Error body for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    pub error: String,
}

// =============================================================================
// Tests
// =============================================================================
