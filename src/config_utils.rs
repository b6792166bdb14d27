//! Configuration file utilities
//!
//! Provides the runtime configuration and the helpers for locating and
//! reading app files. All config files are stored in the platform-specific
//! config directory under "drivetube-uploader/".

use crate::error::RelayError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR_NAME: &str = "drivetube-uploader";
const CONFIG_FILE_NAME: &str = "config.json";

/// Get the app's config directory path.
///
/// Returns: `~/.config/drivetube-uploader` (Linux)
///          `~/Library/Application Support/drivetube-uploader` (macOS)
///          `C:\Users\<User>\AppData\Roaming\drivetube-uploader` (Windows)
pub fn get_config_dir() -> Result<PathBuf, RelayError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| RelayError::Storage("Could not find config directory".to_string()))?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Get the directory where log files are written.
///
/// Returns: `~/.drivetube-uploader/logs`
pub fn get_logs_dir() -> Result<PathBuf, RelayError> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| RelayError::Storage("Could not find home directory".to_string()))?;
    Ok(home_dir.join(format!(".{}", APP_DIR_NAME)).join("logs"))
}

/// Get the full path to a config file.
pub fn config_file_path(filename: &str) -> Result<PathBuf, RelayError> {
    Ok(get_config_dir()?.join(filename))
}

/// Load data from a config file.
///
/// # Returns
/// * `Ok(Some(data))` if file exists and was parsed successfully
/// * `Ok(None)` if file doesn't exist
/// * `Err(...)` if file exists but couldn't be read/parsed
pub fn load_config_file<T: DeserializeOwned>(filename: &str) -> Result<Option<T>, RelayError> {
    let config_file = config_file_path(filename)?;

    if !config_file.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&config_file)?;
    let data = serde_json::from_str(&contents)
        .map_err(|e| RelayError::Storage(format!("Failed to parse config file: {}", e)))?;

    Ok(Some(data))
}

/// Runtime configuration.
///
/// Priority: environment variable > `config.json` > built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
    /// Base for both the Drive and the YouTube upload endpoints
    pub google_api_host: String,
    pub oauth_token_url: String,
    pub oauth_consent_url: String,
    pub bind_addr: String,
    /// Where credentials.json and uploads.json live; defaults to the config dir
    pub data_dir: Option<PathBuf>,
    pub download_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    /// 0 disables admission control
    pub max_concurrent_transfers: usize,
    pub history_limit: usize,
    pub open_browser: bool,
    pub log_json: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_client_secret: None,
            google_redirect_uri: None,
            google_api_host: "https://www.googleapis.com".to_string(),
            oauth_token_url: "https://oauth2.googleapis.com/token".to_string(),
            oauth_consent_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            data_dir: None,
            download_timeout_secs: 900,
            upload_timeout_secs: 1800,
            max_concurrent_transfers: 4,
            history_limit: 50,
            open_browser: false,
            log_json: false,
        }
    }
}

impl RelayConfig {
    /// Load `config.json` (if any) and apply environment overrides on top.
    pub fn load() -> Result<Self, RelayError> {
        let file_config = load_config_file::<RelayConfig>(CONFIG_FILE_NAME)?;
        let mut config = file_config.unwrap_or_default();
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GOOGLE_CLIENT_ID") {
            self.google_client_id = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_CLIENT_SECRET") {
            self.google_client_secret = Some(v);
        }
        if let Some(v) = non_empty("GOOGLE_REDIRECT_URI") {
            self.google_redirect_uri = Some(v);
        }
        if let Some(v) = non_empty("DRIVETUBE_GOOGLE_API_HOST") {
            self.google_api_host = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("DRIVETUBE_OAUTH_TOKEN_URL") {
            self.oauth_token_url = v;
        }
        if let Some(v) = non_empty("DRIVETUBE_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = non_empty("DRIVETUBE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(n) = non_empty("DRIVETUBE_MAX_TRANSFERS").and_then(|v| v.parse().ok()) {
            self.max_concurrent_transfers = n;
        }
        if let Some(b) = non_empty("DRIVETUBE_OPEN_BROWSER").map(|v| parse_flag(&v)) {
            self.open_browser = b;
        }
        if let Some(b) = non_empty("DRIVETUBE_LOG_JSON").map(|v| parse_flag(&v)) {
            self.log_json = b;
        }
    }

    /// Directory holding the credential and upload records.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, RelayError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_config_dir(),
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
