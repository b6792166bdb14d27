//! Upload execution service
//!
//! Runs one transfer job to a terminal state: token for Drive, download and
//! buffer the file, token for YouTube, publish. Each phase boundary is a
//! persisted checkpoint so pollers see the job move
//! `queued → downloading → uploading → completed`. Any failure ends the job
//! in `error` with the failure message; nothing is returned to the caller.

use crate::credential_manager::CredentialManager;
use crate::error::RelayError;
use crate::providers::{PublishProvider, SourceProvider};
use crate::store::JobStore;
use crate::upload_manager::{JobStatus, TransferJob};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Progress checkpoints
const PROGRESS_STARTED: u8 = 10;
const PROGRESS_SOURCE_AUTHORIZED: u8 = 20;
const PROGRESS_DOWNLOADED: u8 = 40;
const PROGRESS_UPLOAD_STARTED: u8 = 50;

const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(900);
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(1800);

/// Service for executing Drive → YouTube transfers
pub struct UploadExecutor {
    jobs: Arc<dyn JobStore>,
    credentials: Arc<CredentialManager>,
    source: Arc<dyn SourceProvider>,
    publisher: Arc<dyn PublishProvider>,
    download_timeout: Duration,
    upload_timeout: Duration,
    /// None when transfers are unbounded
    permits: Option<Arc<Semaphore>>,
}

impl UploadExecutor {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        credentials: Arc<CredentialManager>,
        source: Arc<dyn SourceProvider>,
        publisher: Arc<dyn PublishProvider>,
    ) -> Self {
        Self {
            jobs,
            credentials,
            source,
            publisher,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            permits: None,
        }
    }

    pub fn with_timeouts(mut self, download: Duration, upload: Duration) -> Self {
        self.download_timeout = download;
        self.upload_timeout = upload;
        self
    }

    /// Limit how many jobs transfer at once; 0 means no limit.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.permits = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Drive `job` to `completed` or `error`.
    ///
    /// Never returns an error: failures are recorded on the job, and a
    /// failure to record them is logged.
    pub async fn run(&self, mut job: TransferJob) {
        // Wait in `queued` until a slot frees up
        let _permit = match &self.permits {
            Some(permits) => match Arc::clone(permits).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "admission semaphore closed, running unbounded");
                    None
                }
            },
            None => None,
        };

        match self.transfer(&mut job).await {
            Ok(video_id) => {
                info!(job_id = %job.id, video_id = %video_id, "upload completed");
            }
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    status = %job.status,
                    progress = job.progress,
                    error = %e,
                    "upload failed"
                );
                if let Err(transition) = job.fail(&e.to_string()) {
                    error!(job_id = %job.id, error = %transition, "could not mark job as failed");
                    return;
                }
                if let Err(store_err) = self.jobs.update(&job) {
                    error!(job_id = %job.id, error = %store_err, "failed to persist job failure");
                }
            }
        }
    }

    async fn transfer(&self, job: &mut TransferJob) -> Result<String, RelayError> {
        self.advance(job, JobStatus::Downloading, PROGRESS_STARTED)?;

        let source_token = self.credentials.acquire_token().await?;
        self.advance(job, JobStatus::Downloading, PROGRESS_SOURCE_AUTHORIZED)?;

        let video = self.download(&source_token, &job.source_ref).await?;
        debug!(job_id = %job.id, bytes = video.len(), "source file buffered");
        self.advance(job, JobStatus::Downloading, PROGRESS_DOWNLOADED)?;

        // Fresh lookup: the download may have outlived the first token
        let target_token = self.credentials.acquire_token().await?;
        self.advance(job, JobStatus::Uploading, PROGRESS_UPLOAD_STARTED)?;

        let video_id = timeout(
            self.upload_timeout,
            self.publisher.publish(&target_token, video, &job.metadata),
        )
        .await
        .map_err(|_| RelayError::Timeout {
            phase: "upload",
            seconds: self.upload_timeout.as_secs(),
        })??;

        job.complete(video_id.clone())?;
        self.jobs.update(job)?;
        Ok(video_id)
    }

    fn advance(&self, job: &mut TransferJob, status: JobStatus, progress: u8) -> Result<(), RelayError> {
        job.checkpoint(status, progress)?;
        self.jobs.update(job)?;
        debug!(job_id = %job.id, status = %job.status, progress = job.progress, "checkpoint");
        Ok(())
    }

    /// Buffer the whole source file in memory.
    async fn download(&self, access_token: &str, file_id: &str) -> Result<Vec<u8>, RelayError> {
        let fetch = async {
            let mut stream = self.source.fetch_content(access_token, file_id).await?;
            let mut buffer = Vec::new();
            while let Some(chunk) = stream.try_next().await? {
                buffer.extend_from_slice(&chunk);
            }
            Ok::<_, RelayError>(buffer)
        };

        timeout(self.download_timeout, fetch)
            .await
            .map_err(|_| RelayError::Timeout {
                phase: "download",
                seconds: self.download_timeout.as_secs(),
            })?
    }
}
