use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::challenges::pipeline::DEFAULT_VERIFY_PATH;
use crate::modules::guard::DEFAULT_MIN_WRITE_INTERVAL_SECS;
use crate::modules::state::MAX_PENDING_AGE_SECS;
use crate::tools::DEFAULT_WRITE_TOOLS;

pub const DEFAULT_BASE_URL: &str = "https://www.moltbook.com/api/v1";
pub const DEFAULT_STATE_PATH: &str = ".writeguard/state.json";
pub const DEFAULT_STATUS_TOOL: &str = "account_status";
pub const DEFAULT_USER_AGENT: &str = concat!("writeguard-rs/", env!("CARGO_PKG_VERSION"));

pub const ENV_BASE_URL: &str = "WRITEGUARD_BASE_URL";
pub const ENV_API_KEY: &str = "WRITEGUARD_API_KEY";
pub const ENV_STATE_PATH: &str = "WRITEGUARD_STATE_PATH";
pub const ENV_VERIFY_PATH: &str = "WRITEGUARD_VERIFY_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Guarded client settings.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub base_url: String,
    /// Bearer token attached to every request.
    pub api_key: Option<String>,
    pub state_path: PathBuf,
    pub verify_path: String,
    /// Tool whose successful, suspension-free response clears a stale suspension.
    pub status_tool: String,
    pub write_tools: Vec<String>,
    pub min_write_interval_secs: u64,
    pub max_pending_age_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            status_tool: DEFAULT_STATUS_TOOL.to_string(),
            write_tools: DEFAULT_WRITE_TOOLS.iter().map(|tool| tool.to_string()).collect(),
            min_write_interval_secs: DEFAULT_MIN_WRITE_INTERVAL_SECS,
            max_pending_age_secs: MAX_PENDING_AGE_SECS as u64,
            request_timeout_secs: Some(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GuardConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `WRITEGUARD_*` environment overrides.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = get(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(api_key) = get(ENV_API_KEY) {
            self.api_key = Some(api_key);
        }
        if let Some(state_path) = get(ENV_STATE_PATH) {
            self.state_path = PathBuf::from(state_path);
        }
        if let Some(verify_path) = get(ENV_VERIFY_PATH) {
            self.verify_path = verify_path;
        }
        self
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
