//! Configuration structures
//!
//! Loaded by the infra config loader from environment variables or a
//! JSON/TOML file. Every section has defaults so a file only needs to name
//! what it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_PREFIX, DEFAULT_BASE_URL, DEFAULT_BATCH_PATH, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_PAGES, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    DEFAULT_WAIT_SECS,
};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project used when an operation does not name one.
    pub project_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Config {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api: ApiConfig::default(),
            jobs: JobsConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host, e.g. `https://bigquery.googleapis.com`.
    pub base_url: String,
    /// Path prefix of the JSON API, e.g. `/bigquery/v2`.
    pub api_prefix: String,
    /// Path of the composite batch endpoint.
    pub batch_path: String,
    pub timeout_seconds: u64,
    /// Total attempts per physical request (initial try + retries).
    pub max_attempts: usize,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            batch_path: DEFAULT_BATCH_PATH.to_string(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub poll_interval_ms: u64,
    pub default_wait_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_wait_seconds: DEFAULT_WAIT_SECS,
        }
    }
}

impl JobsConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn default_wait(&self) -> Duration {
        Duration::from_secs(self.default_wait_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Upper bound on pages followed by one listing call.
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: DEFAULT_MAX_PAGES }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"project_id": "demo"}"#).unwrap();
        assert_eq!(config.project_id, "demo");
        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.jobs.poll_interval(), Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(config.pagination.max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_partial_toml_section() {
        let config: Config = toml::from_str(
            r#"
project_id = "demo"

[jobs]
poll_interval_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.jobs.poll_interval_ms, 250);
        assert_eq!(config.jobs.default_wait_seconds, DEFAULT_WAIT_SECS);
    }
}
