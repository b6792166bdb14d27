use crate::error::RelayError;
use crate::services::UploadExecutor;
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Publication scope of the uploaded video
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Unlisted => "unlisted",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "unlisted" => Ok(Visibility::Unlisted),
            "public" => Ok(Visibility::Public),
            other => Err(RelayError::InvalidRequest(format!(
                "unknown privacy status '{}' (expected private, unlisted or public)",
                other
            ))),
        }
    }
}

/// Lifecycle of a transfer job. Variants are declared in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Uploading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Downloading => 1,
            JobStatus::Uploading => 2,
            JobStatus::Completed => 3,
            JobStatus::Error => 4,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to publish the video as
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

impl VideoMetadata {
    /// Normalize caller input: title and tags are trimmed, empty tags and
    /// duplicates are dropped, and a blank description counts as absent.
    pub fn new(
        title: &str,
        description: Option<String>,
        tags: Vec<String>,
        visibility: Visibility,
    ) -> Self {
        let mut unique_tags: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !unique_tags.iter().any(|t| t == tag) {
                unique_tags.push(tag.to_string());
            }
        }

        Self {
            title: title.trim().to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            tags: unique_tags,
            visibility,
        }
    }
}

/// One tracked attempt to move one Drive file to YouTube
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransferJob {
    pub id: String,
    pub user_id: String,
    pub source_ref: String,
    pub metadata: VideoMetadata,
    pub status: JobStatus,
    pub progress: u8,
    pub result_id: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferJob {
    pub fn new(user_id: &str, source_ref: &str, metadata: VideoMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source_ref: source_ref.trim().to_string(),
            metadata,
            status: JobStatus::Queued,
            progress: 0,
            result_id: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition_error(&self, to: JobStatus) -> RelayError {
        RelayError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Record a non-terminal checkpoint. Status only moves forward and
    /// progress never decreases; 100 is reserved for completion.
    pub fn checkpoint(&mut self, status: JobStatus, progress: u8) -> Result<(), RelayError> {
        if self.status.is_terminal() || status.is_terminal() || status.rank() < self.status.rank() {
            return Err(self.transition_error(status));
        }
        self.status = status;
        self.progress = self.progress.max(progress.min(99));
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self, result_id: String) -> Result<(), RelayError> {
        if self.status != JobStatus::Uploading {
            return Err(self.transition_error(JobStatus::Completed));
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result_id = Some(result_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Terminate the job. Progress stays at its last value.
    pub fn fail(&mut self, detail: &str) -> Result<(), RelayError> {
        if self.status.is_terminal() {
            return Err(self.transition_error(JobStatus::Error));
        }
        let detail = detail.trim();
        self.status = JobStatus::Error;
        self.error_detail = Some(if detail.is_empty() {
            "Unknown error occurred".to_string()
        } else {
            detail.to_string()
        });
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A job that has been persisted and handed to the background executor
#[derive(Debug)]
pub struct SubmittedUpload {
    pub id: String,
    handle: JoinHandle<()>,
}

impl SubmittedUpload {
    /// Wait for the background run to finish. Dropping instead detaches it.
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(job_id = %self.id, error = %e, "upload task panicked");
        }
    }
}

/// Accepts uploads and answers status queries; the transfer itself runs in
/// the [`UploadExecutor`].
pub struct UploadManager {
    user_id: String,
    jobs: Arc<dyn JobStore>,
    executor: Arc<UploadExecutor>,
    history_limit: usize,
}

impl UploadManager {
    pub fn new(
        user_id: &str,
        jobs: Arc<dyn JobStore>,
        executor: Arc<UploadExecutor>,
        history_limit: usize,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            jobs,
            executor,
            history_limit,
        }
    }

    /// Validate, persist a `queued` job and start it in the background.
    ///
    /// Returns as soon as the record is written; must be called from within
    /// a Tokio runtime.
    pub fn submit(
        &self,
        source_ref: &str,
        metadata: VideoMetadata,
    ) -> Result<SubmittedUpload, RelayError> {
        if source_ref.trim().is_empty() || metadata.title.trim().is_empty() {
            return Err(RelayError::InvalidRequest(
                "Drive file ID and title are required".to_string(),
            ));
        }

        let job = TransferJob::new(&self.user_id, source_ref, metadata);
        self.jobs.insert(&job)?;

        info!(
            job_id = %job.id,
            source = %job.source_ref,
            visibility = %job.metadata.visibility,
            "upload queued"
        );

        let id = job.id.clone();
        let executor = Arc::clone(&self.executor);
        let handle = tokio::spawn(async move {
            executor.run(job).await;
        });

        Ok(SubmittedUpload { id, handle })
    }

    /// Upload history for the fixed user, newest first.
    pub fn history(&self) -> Result<Vec<TransferJob>, RelayError> {
        self.jobs.list_for_user(&self.user_id, self.history_limit)
    }

    pub fn get_job(&self, id: &str) -> Result<Option<TransferJob>, RelayError> {
        Ok(self.jobs.get(id)?.filter(|job| job.user_id == self.user_id))
    }
}
