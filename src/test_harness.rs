//! Integration test harness for mock Google servers
//!
//! One mockito server stands in for the token endpoint, Drive and YouTube;
//! `config()` points a `RelayConfig` at it. `RecordingJobStore` keeps every
//! job snapshot written so tests can check the state-machine invariants
//! over a job's whole history.

use crate::config_utils::RelayConfig;
use crate::error::RelayError;
use crate::store::{JobStore, MemoryStore};
use crate::types::CredentialRecord;
use crate::upload_manager::{JobStatus, TransferJob};
use chrono::{Duration, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Mutex;

/// A test harness that sets up a mock Google server
pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Relay configuration with every Google endpoint on the mock server
    pub fn config(&self) -> RelayConfig {
        RelayConfig {
            google_client_id: Some("test-client.apps.googleusercontent.com".to_string()),
            google_client_secret: Some("test-secret".to_string()),
            google_redirect_uri: Some("http://127.0.0.1/api/youtube/callback".to_string()),
            google_api_host: self.url(),
            oauth_token_url: format!("{}/token", self.url()),
            max_concurrent_transfers: 0,
            ..RelayConfig::default()
        }
    }

    /// Mock the token endpoint for a code exchange or a refresh, expecting `hits` calls
    pub async fn mock_token(
        &mut self,
        access_token: &str,
        refresh_token: Option<&str>,
        hits: usize,
    ) -> Mock {
        let mut body = json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer"
        });
        if let Some(refresh) = refresh_token {
            body["refresh_token"] = json!(refresh);
        }

        self.server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Mock the Drive `files.list` endpoint
    pub async fn mock_drive_list(&mut self, files: Vec<serde_json::Value>) -> Mock {
        self.server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "files": files }).to_string())
            .create_async()
            .await
    }

    /// Mock a Drive `alt=media` download
    pub async fn mock_drive_content(&mut self, file_id: &str, content: &[u8]) -> Mock {
        self.server
            .mock("GET", format!("/drive/v3/files/{}", file_id).as_str())
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body(content)
            .create_async()
            .await
    }

    /// Mock a failing Drive download
    pub async fn mock_drive_content_failure(&mut self, file_id: &str, status: usize) -> Mock {
        self.server
            .mock("GET", format!("/drive/v3/files/{}", file_id).as_str())
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": { "code": status, "message": "Backend Error" } }).to_string())
            .create_async()
            .await
    }

    /// Mock a successful `videos.insert` whose metadata part contains `title`
    pub async fn mock_publish_success(&mut self, video_id: &str, title: &str) -> Mock {
        self.server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .match_body(Matcher::Regex(format!(r#""title":"{}""#, title)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "kind": "youtube#video", "id": video_id }).to_string())
            .create_async()
            .await
    }

    /// Mock a successful `videos.insert` whose body matches every pattern
    pub async fn mock_publish_matching(&mut self, video_id: &str, patterns: &[&str]) -> Mock {
        let body = patterns
            .iter()
            .map(|p| Matcher::Regex(p.to_string()))
            .collect();
        self.server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .match_body(Matcher::AllOf(body))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "kind": "youtube#video", "id": video_id }).to_string())
            .create_async()
            .await
    }

    /// Mock a rejected `videos.insert`
    pub async fn mock_publish_failure(&mut self, status: usize, message: &str) -> Mock {
        self.server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": { "code": status, "message": message } }).to_string())
            .create_async()
            .await
    }
}

/// A credential valid for another hour
pub fn valid_credential(access_token: &str) -> CredentialRecord {
    CredentialRecord {
        access_token: access_token.to_string(),
        refresh_token: Some("1//test-refresh".to_string()),
        expiry: Utc::now() + Duration::hours(1),
    }
}

/// Job store that remembers every snapshot it was asked to write
#[derive(Default)]
pub struct RecordingJobStore {
    inner: MemoryStore,
    snapshots: Mutex<Vec<TransferJob>>,
}

impl RecordingJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, job: &TransferJob) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(job.clone());
        }
    }

    /// Every persisted state of one job, in write order
    pub fn snapshots_for(&self, id: &str) -> Vec<TransferJob> {
        self.snapshots
            .lock()
            .map(|s| s.iter().filter(|j| j.id == id).cloned().collect())
            .unwrap_or_default()
    }
}

impl JobStore for RecordingJobStore {
    fn insert(&self, job: &TransferJob) -> Result<(), RelayError> {
        self.inner.insert(job)?;
        self.record(job);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<TransferJob>, RelayError> {
        JobStore::get(&self.inner, id)
    }

    fn update(&self, job: &TransferJob) -> Result<(), RelayError> {
        self.inner.update(job)?;
        self.record(job);
        Ok(())
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<TransferJob>, RelayError> {
        self.inner.list_for_user(user_id, limit)
    }
}

/// Check the per-snapshot and whole-history job invariants.
pub fn assert_job_history_consistent(history: &[TransferJob]) {
    assert!(!history.is_empty(), "job was never persisted");
    assert_eq!(history[0].status, JobStatus::Queued);
    assert_eq!(history[0].progress, 0);

    for snapshot in history {
        assert_eq!(
            snapshot.result_id.is_some(),
            snapshot.status == JobStatus::Completed,
            "resultId must be present iff completed: {:?}",
            snapshot
        );
        assert_eq!(
            snapshot.error_detail.is_some(),
            snapshot.status == JobStatus::Error,
            "errorDetail must be present iff error: {:?}",
            snapshot
        );
    }

    for pair in history.windows(2) {
        assert!(
            pair[1].progress >= pair[0].progress,
            "progress went backwards: {} -> {}",
            pair[0].progress,
            pair[1].progress
        );
        assert!(!pair[0].status.is_terminal(), "terminal job was written again");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppStateManager;
    use crate::store::CredentialStore;
    use crate::upload_manager::{VideoMetadata, Visibility};
    use std::sync::Arc;

    struct Relay {
        state: AppStateManager,
        jobs: Arc<RecordingJobStore>,
    }

    fn relay(harness: &TestHarness, connected: bool) -> Relay {
        let credentials = Arc::new(MemoryStore::new());
        if connected {
            credentials
                .put("default-user", valid_credential("ya29.harness"))
                .unwrap();
        }
        let jobs = Arc::new(RecordingJobStore::new());
        let state = AppStateManager::from_config(harness.config(), credentials, jobs.clone());
        Relay { state, jobs }
    }

    #[tokio::test]
    async fn test_drive_to_youtube_end_to_end() {
        let mut harness = TestHarness::new().await;
        let download = harness.mock_drive_content("f1", b"\x00\x00\x00\x18ftypmp42").await;
        let publish = harness
            .mock_publish_matching(
                "yt-video-1",
                &[
                    r#""title":"Trip""#,
                    r#""description":"""#,
                    r#""tags":\[\]"#,
                    r#""categoryId":"22""#,
                    r#""privacyStatus":"private""#,
                    r#""selfDeclaredMadeForKids":false"#,
                    "ftypmp42",
                ],
            )
            .await;
        let relay = relay(&harness, true);

        let submitted = relay
            .state
            .uploads
            .submit("f1", VideoMetadata::new("Trip", None, vec![], Visibility::default()))
            .unwrap();
        let id = submitted.id.clone();

        // Submission returns before any network work has been observed
        let queued = relay.state.uploads.get_job(&id).unwrap().unwrap();
        assert_eq!(queued.metadata.visibility, Visibility::Private);
        assert!(queued.metadata.tags.is_empty());

        submitted.finished().await;

        let job = relay.state.uploads.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result_id.as_deref(), Some("yt-video-1"));
        assert!(job.error_detail.is_none());

        assert_job_history_consistent(&relay.jobs.snapshots_for(&id));
        download.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn test_source_failure_ends_in_error_at_pre_failure_progress() {
        let mut harness = TestHarness::new().await;
        let _download = harness.mock_drive_content_failure("f1", 503).await;
        let publish = harness
            .server
            .mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let relay = relay(&harness, true);

        let submitted = relay
            .state
            .uploads
            .submit("f1", VideoMetadata::new("Trip", None, vec![], Visibility::Public))
            .unwrap();
        let id = submitted.id.clone();
        submitted.finished().await;

        let job = relay.state.uploads.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 20);
        assert!(job.result_id.is_none());
        assert!(job.error_detail.as_deref().unwrap().contains("Backend Error"));

        assert_job_history_consistent(&relay.jobs.snapshots_for(&id));
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_rejection_recorded_on_job() {
        let mut harness = TestHarness::new().await;
        let _download = harness.mock_drive_content("f2", b"video").await;
        let _publish = harness
            .mock_publish_failure(403, "The caller does not have permission")
            .await;
        let relay = relay(&harness, true);

        let submitted = relay
            .state
            .uploads
            .submit("f2", VideoMetadata::new("Clip", None, vec![], Visibility::Private))
            .unwrap();
        let id = submitted.id.clone();
        submitted.finished().await;

        let job = relay.state.uploads.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 50);
        assert!(job.error_detail.unwrap().contains("does not have permission"));
    }

    #[tokio::test]
    async fn test_expired_credential_refreshed_during_job() {
        let mut harness = TestHarness::new().await;
        let refresh = harness.mock_token("ya29.refreshed", None, 1).await;
        let _download = harness.mock_drive_content("f3", b"video").await;
        let _publish = harness.mock_publish_success("yt-3", "Refreshed").await;

        let credentials = Arc::new(MemoryStore::new());
        credentials
            .put(
                "default-user",
                CredentialRecord {
                    access_token: "ya29.stale".to_string(),
                    refresh_token: Some("1//keep-me".to_string()),
                    expiry: Utc::now() - Duration::minutes(1),
                },
            )
            .unwrap();
        let jobs = Arc::new(RecordingJobStore::new());
        let state = AppStateManager::from_config(harness.config(), credentials.clone(), jobs);

        let submitted = state
            .uploads
            .submit("f3", VideoMetadata::new("Refreshed", None, vec![], Visibility::Unlisted))
            .unwrap();
        let id = submitted.id.clone();
        submitted.finished().await;

        let job = state.uploads.get_job(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let stored = CredentialStore::get(&*credentials, "default-user").unwrap().unwrap();
        assert_eq!(stored.access_token, "ya29.refreshed");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//keep-me"));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_with_empty_title_creates_no_job() {
        let harness = TestHarness::new().await;
        let relay = relay(&harness, true);

        let err = relay
            .state
            .uploads
            .submit("f1", VideoMetadata::new("   ", None, vec![], Visibility::Private))
            .unwrap_err();

        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert!(relay.state.uploads.history().unwrap().is_empty());
    }
}
