//! Record storage: the singleton credential and the upload jobs.
//!
//! Both stores are plain key lookups. `MemoryStore` keeps everything in
//! process; `JsonFileStore` mirrors each collection to a JSON file in the
//! data directory and rewrites it atomically on every mutation.

use crate::error::RelayError;
use crate::types::CredentialRecord;
use crate::upload_manager::TransferJob;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

const CREDENTIALS_FILE: &str = "credentials.json";
const UPLOADS_FILE: &str = "uploads.json";

pub trait CredentialStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, RelayError>;

    /// Insert or fully replace the record for `user_id`.
    fn put(&self, user_id: &str, record: CredentialRecord) -> Result<(), RelayError>;
}

pub trait JobStore: Send + Sync {
    fn insert(&self, job: &TransferJob) -> Result<(), RelayError>;

    fn get(&self, id: &str) -> Result<Option<TransferJob>, RelayError>;

    /// Replace an existing job record. Unknown ids are an error.
    fn update(&self, job: &TransferJob) -> Result<(), RelayError>;

    /// Jobs for `user_id`, newest first, at most `limit`.
    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<TransferJob>, RelayError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RelayError> {
    mutex
        .lock()
        .map_err(|_| RelayError::Storage("store mutex poisoned".to_string()))
}

fn insert_job(jobs: &mut Vec<TransferJob>, job: &TransferJob) -> Result<(), RelayError> {
    if jobs.iter().any(|j| j.id == job.id) {
        return Err(RelayError::Storage(format!("job {} already exists", job.id)));
    }
    jobs.push(job.clone());
    Ok(())
}

fn update_job(jobs: &mut [TransferJob], job: &TransferJob) -> Result<(), RelayError> {
    match jobs.iter_mut().find(|j| j.id == job.id) {
        Some(existing) => {
            *existing = job.clone();
            Ok(())
        }
        None => Err(RelayError::Storage(format!("job {} not found", job.id))),
    }
}

/// Newest first. `jobs` is in insertion order, so walking it backwards and
/// then stable-sorting keeps later inserts ahead on timestamp ties.
fn newest_first(jobs: &[TransferJob], user_id: &str, limit: usize) -> Vec<TransferJob> {
    let mut selected: Vec<TransferJob> = jobs
        .iter()
        .rev()
        .filter(|j| j.user_id == user_id)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected.truncate(limit);
    selected
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<HashMap<String, CredentialRecord>>,
    jobs: Mutex<Vec<TransferJob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, RelayError> {
        Ok(lock(&self.credentials)?.get(user_id).cloned())
    }

    fn put(&self, user_id: &str, record: CredentialRecord) -> Result<(), RelayError> {
        lock(&self.credentials)?.insert(user_id.to_string(), record);
        Ok(())
    }
}

impl JobStore for MemoryStore {
    fn insert(&self, job: &TransferJob) -> Result<(), RelayError> {
        let mut jobs = lock(&self.jobs)?;
        insert_job(&mut jobs, job)
    }

    fn get(&self, id: &str) -> Result<Option<TransferJob>, RelayError> {
        Ok(lock(&self.jobs)?.iter().find(|j| j.id == id).cloned())
    }

    fn update(&self, job: &TransferJob) -> Result<(), RelayError> {
        let mut jobs = lock(&self.jobs)?;
        update_job(&mut jobs, job)
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<TransferJob>, RelayError> {
        let jobs = lock(&self.jobs)?;
        Ok(newest_first(&jobs, user_id, limit))
    }
}

/// Load a JSON file, falling back to the default when it is missing or corrupted.
fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, RelayError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let contents = fs::read_to_string(path)?;
    match serde_json::from_str::<T>(&contents) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "store file corrupted, starting fresh");
            Ok(T::default())
        }
    }
}

/// Write `value` to `path` using an atomic write (temp file + rename).
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RelayError> {
    let tmp_file = path.with_file_name(format!(
        "{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("store.json")
    ));
    let contents = serde_json::to_string_pretty(value)?;

    let mut tmp = fs::File::create(&tmp_file)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.sync_all()?;
    drop(tmp);

    fs::rename(&tmp_file, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_file); // best-effort cleanup of orphaned tmp
        RelayError::Storage(format!("Failed to replace {}: {}", path.display(), e))
    })
}

/// Store persisted as `credentials.json` and `uploads.json`
pub struct JsonFileStore {
    credentials_path: PathBuf,
    uploads_path: PathBuf,
    credentials: Mutex<HashMap<String, CredentialRecord>>,
    jobs: Mutex<Vec<TransferJob>>,
}

impl JsonFileStore {
    /// Open (or create) the store inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, RelayError> {
        fs::create_dir_all(dir)?;
        let credentials_path = dir.join(CREDENTIALS_FILE);
        let uploads_path = dir.join(UPLOADS_FILE);

        let credentials = load_json(&credentials_path)?;
        let jobs = load_json(&uploads_path)?;

        Ok(Self {
            credentials_path,
            uploads_path,
            credentials: Mutex::new(credentials),
            jobs: Mutex::new(jobs),
        })
    }
}

impl CredentialStore for JsonFileStore {
    fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, RelayError> {
        Ok(lock(&self.credentials)?.get(user_id).cloned())
    }

    fn put(&self, user_id: &str, record: CredentialRecord) -> Result<(), RelayError> {
        let mut credentials = lock(&self.credentials)?;
        let mut next = credentials.clone();
        next.insert(user_id.to_string(), record);
        save_json(&self.credentials_path, &next)?;
        *credentials = next;
        Ok(())
    }
}

impl JobStore for JsonFileStore {
    fn insert(&self, job: &TransferJob) -> Result<(), RelayError> {
        let mut jobs = lock(&self.jobs)?;
        let mut next = jobs.clone();
        insert_job(&mut next, job)?;
        save_json(&self.uploads_path, &next)?;
        *jobs = next;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<TransferJob>, RelayError> {
        Ok(lock(&self.jobs)?.iter().find(|j| j.id == id).cloned())
    }

    fn update(&self, job: &TransferJob) -> Result<(), RelayError> {
        let mut jobs = lock(&self.jobs)?;
        let mut next = jobs.clone();
        update_job(&mut next, job)?;
        save_json(&self.uploads_path, &next)?;
        *jobs = next;
        Ok(())
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<TransferJob>, RelayError> {
        let jobs = lock(&self.jobs)?;
        Ok(newest_first(&jobs, user_id, limit))
    }
}
