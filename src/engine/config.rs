use crate::engine::error::{FormflowError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Placeholder substituted with the task id in status paths
pub const TASK_ID_PLACEHOLDER: &str = "{task_id}";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormflowConfig {
    pub client: ClientConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

impl FormflowConfig {
    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::from_json(&json_str)
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.poll.validate()
    }
}

/// Settings of the REST backend client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that request paths are joined onto
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Header carrying the organization slug
    #[serde(default = "default_org_header")]
    pub org_header: String,
    /// Status endpoint path, `{task_id}` is replaced by the task id
    #[serde(default = "default_status_path")]
    pub status_path: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_org_header() -> String {
    "x-dalgo-org".to_string()
}

fn default_status_path() -> String {
    format!("tasks/{TASK_ID_PLACEHOLDER}")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002/api".to_string(),
            timeout_secs: default_timeout_secs(),
            org_header: default_org_header(),
            status_path: default_status_path(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FormflowError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if !self.status_path.contains(TASK_ID_PLACEHOLDER) {
            return Err(FormflowError::Config(format!(
                "status_path must contain {TASK_ID_PLACEHOLDER}"
            )));
        }
        Ok(())
    }

    /// Join a relative path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Status endpoint URL; the task id is percent-encoded as a single path segment
    pub fn status_url(&self, task_id: &str) -> String {
        let encoded = urlencoding::encode(task_id);
        self.url(&self.status_path.replace(TASK_ID_PLACEHOLDER, &encoded))
    }
}

/// Per-user session passed explicitly to every backend call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    /// Bearer token
    pub token: String,
    /// Organization the requests are scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_slug: Option<String>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            org_slug: None,
        }
    }

    pub fn with_org(mut self, org_slug: impl Into<String>) -> Self {
        self.org_slug = Some(org_slug.into());
        self
    }
}

/// Polling cadence and optional limits.
///
/// Without `max_attempts` or `timeout_ms` a poll chain runs until the task
/// reaches a terminal status or its cancellation token fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// Delay between status checks in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of status fetches
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Maximum elapsed time for the whole chain in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    3000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
            timeout_ms: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(FormflowError::Config(
                "poll interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(FormflowError::Config(
                "poll max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
