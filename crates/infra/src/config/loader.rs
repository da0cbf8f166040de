//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `TABULA_PROJECT_ID` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TABULA_PROJECT_ID`: Default project (required)
//! - `TABULA_API_BASE_URL`: Scheme and host of the service
//! - `TABULA_API_PREFIX`: Path prefix of the JSON API
//! - `TABULA_BATCH_PATH`: Path of the composite batch endpoint
//! - `TABULA_REQUEST_TIMEOUT`: Per-request timeout in seconds
//! - `TABULA_MAX_ATTEMPTS`: Attempts per physical request
//! - `TABULA_USER_AGENT`: User agent header
//! - `TABULA_JOB_POLL_INTERVAL_MS`: Poll interval while waiting for jobs
//! - `TABULA_JOB_WAIT_SECONDS`: Default wait for `wait_job`
//! - `TABULA_MAX_PAGES`: Page limit for listing calls
//!
//! Unset optional variables keep their defaults.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./tabula.json` or `./tabula.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tabula_domain::{Config, Result, TabulaError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the project is not
/// set there, falls back to a config file.
///
/// # Errors
/// Returns `TabulaError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `TabulaError::Config` if `TABULA_PROJECT_ID` is missing or an
/// optional variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::new(env_var("TABULA_PROJECT_ID")?);

    if let Some(base_url) = env_opt("TABULA_API_BASE_URL") {
        config.api.base_url = base_url;
    }
    if let Some(prefix) = env_opt("TABULA_API_PREFIX") {
        config.api.api_prefix = prefix;
    }
    if let Some(batch_path) = env_opt("TABULA_BATCH_PATH") {
        config.api.batch_path = batch_path;
    }
    if let Some(agent) = env_opt("TABULA_USER_AGENT") {
        config.api.user_agent = agent;
    }
    if let Some(timeout) = env_parse("TABULA_REQUEST_TIMEOUT", "request timeout")? {
        config.api.timeout_seconds = timeout;
    }
    if let Some(attempts) = env_parse("TABULA_MAX_ATTEMPTS", "max attempts")? {
        config.api.max_attempts = attempts;
    }
    if let Some(interval) = env_parse("TABULA_JOB_POLL_INTERVAL_MS", "poll interval")? {
        config.jobs.poll_interval_ms = interval;
    }
    if let Some(wait) = env_parse("TABULA_JOB_WAIT_SECONDS", "job wait")? {
        config.jobs.default_wait_seconds = wait;
    }
    if let Some(pages) = env_parse("TABULA_MAX_PAGES", "max pages")? {
        config.pagination.max_pages = pages;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TabulaError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TabulaError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TabulaError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TabulaError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TabulaError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TabulaError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(TabulaError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./tabula.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("tabula.json"),
        dir.join("tabula.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `TabulaError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        TabulaError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty environment variable, if set.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TabulaError::Config(format!("Invalid {what} in {key}: {e}")))
        })
        .transpose()
}
