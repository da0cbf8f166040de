//! Client constants
//!
//! Centralized location for endpoint defaults and protocol limits.

// Endpoints
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_API_PREFIX: &str = "/bigquery/v2";
pub const DEFAULT_BATCH_PATH: &str = "/batch/bigquery/v2";
pub const DEFAULT_USER_AGENT: &str = concat!("tabula/", env!("CARGO_PKG_VERSION"));

// Transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: usize = 1;

// Job waiting
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_WAIT_SECS: u64 = 300;
pub const MIN_POLL_INTERVAL_MS: u64 = 1;
/// The poll interval is kept at least this many times shorter than the wait.
pub const POLL_INTERVAL_DIVISOR: u32 = 10;

// Pagination
pub const DEFAULT_MAX_PAGES: usize = 10_000;
pub const PAGE_TOKEN_PARAM: &str = "pageToken";
