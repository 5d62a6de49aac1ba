//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use studyai_auth::RetryPolicy;

use crate::error::CoreError;
use crate::Result;

pub const API_URL_VAR: &str = "STUDYAI_API_URL";
pub const DB_PATH_VAR: &str = "STUDYAI_DB_PATH";
pub const TIMEOUT_VAR: &str = "STUDYAI_TIMEOUT_SECS";
pub const MAX_RETRIES_VAR: &str = "STUDYAI_MAX_RETRIES";

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the StudyAI API
    pub api_base_url: String,
    /// SQLite file holding the persistent token region
    pub database_path: PathBuf,
    /// Per-attempt timeout for API requests
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for auth requests
    pub max_retries: u32,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            database_path: data_dir.join("studyai.db"),
            request_timeout_secs: 10,
            max_retries: 3,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("StudyAI"))
            .unwrap_or_else(|| PathBuf::from(".studyai"))
    }

    /// Defaults overridden by `STUDYAI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(path) = lookup(DB_PATH_VAR) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup(TIMEOUT_VAR) {
            config.request_timeout_secs = parse_var(TIMEOUT_VAR, &secs)?;
        }
        if let Some(retries) = lookup(MAX_RETRIES_VAR) {
            config.max_retries = parse_var(MAX_RETRIES_VAR, &retries)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.api_url()?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "API URL must be http or https, got {url}"
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            attempt_timeout: self.request_timeout(),
            ..RetryPolicy::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            CoreError::Config(format!("{name} must be a non-negative integer, got {value:?}"))
        })
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
