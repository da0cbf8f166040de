//! Error types used throughout the client
//!
//! Two layers:
//! - [`ApiError`]: a condition reported by the warehouse service, always
//!   carrying a machine-readable [`Reason`].
//! - [`TabulaError`]: everything a client operation can fail with, including
//!   transport failures, client-side wait timeouts and malformed responses.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::JobReference;

/// Reason code reported by the service.
///
/// The service vocabulary is open-ended. The variants below are the reasons
/// the client branches on; anything else is kept verbatim in
/// [`Reason::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Reason {
    /// Resource does not exist.
    NotFound,
    /// Request was rejected as malformed or semantically invalid.
    Invalid,
    /// Resource already exists.
    Duplicate,
    /// Job was stopped, typically after a cancel request.
    Stopped,
    /// Service-side failure.
    Internal,
    /// Caller lacks permission.
    AccessDenied,
    /// Quota or rate limit hit.
    RateLimitExceeded,
    /// Transient backend failure.
    BackendError,
    /// Any reason string not in the recognised set.
    Unrecognized(String),
}

impl Reason {
    /// Parse a raw reason string. Unknown values are preserved.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "notFound" => Self::NotFound,
            "invalid" => Self::Invalid,
            "duplicate" => Self::Duplicate,
            "stopped" => Self::Stopped,
            "internal" => Self::Internal,
            "accessDenied" => Self::AccessDenied,
            "rateLimitExceeded" => Self::RateLimitExceeded,
            "backendError" => Self::BackendError,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Reason derived from an HTTP status when the body carries none.
    pub const fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            400..=499 => Self::Invalid,
            _ => Self::Internal,
        }
    }

    /// Wire spelling of the reason.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotFound => "notFound",
            Self::Invalid => "invalid",
            Self::Duplicate => "duplicate",
            Self::Stopped => "stopped",
            Self::Internal => "internal",
            Self::AccessDenied => "accessDenied",
            Self::RateLimitExceeded => "rateLimitExceeded",
            Self::BackendError => "backendError",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Whether the request itself was rejected, `invalidQuery` included.
    pub fn is_invalid(&self) -> bool {
        match self {
            Self::Invalid => true,
            Self::Unrecognized(raw) => raw == "invalidQuery",
            _ => false,
        }
    }

    /// Whether a caller may reasonably retry after this reason.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Internal | Self::BackendError | Self::RateLimitExceeded => true,
            Self::Unrecognized(raw) => raw == "internalError",
            _ => false,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Reason {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for Reason {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<Reason> for String {
    fn from(reason: Reason) -> Self {
        reason.as_str().to_string()
    }
}

/// Structured error reported by the warehouse service.
///
/// `reason` is for programmatic branching; `message` is for diagnostics only
/// and may embed the offending identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}: {message}")]
pub struct ApiError {
    /// Machine-readable reason code.
    pub reason: Reason,
    /// Human-readable message.
    pub message: String,
    /// Request path the error originated from.
    pub origin: String,
    /// HTTP status, when the error came from an HTTP response.
    pub status: Option<u16>,
}

impl ApiError {
    /// Create an API error without an HTTP status.
    pub fn new(reason: Reason, message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self { reason, message: message.into(), origin: origin.into(), status: None }
    }

    /// Attach the HTTP status the error was derived from.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.reason == Reason::NotFound
    }
}

/// Main error type for Tabula
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    /// Connection, DNS, TLS or credential failure. Never classified by reason.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service rejected the call or reported a failure.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The client stopped waiting for a job. The job keeps running server-side.
    #[error("Timed out after {waited:?} waiting for job {job}")]
    Timeout {
        /// Job that was being waited on.
        job: JobReference,
        /// Time spent waiting.
        waited: Duration,
    },

    /// A response could not be parsed into the expected shape or framing.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A batch was opened while another batch on the same client was active.
    #[error("A batch is already active on this client")]
    BatchAlreadyActive,

    /// The batch body failed, so queued calls were never sent.
    #[error("Batch aborted before it was sent")]
    BatchAborted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TabulaError {
    /// Reason code, when this is a service-reported error.
    pub const fn reason(&self) -> Option<&Reason> {
        match self {
            Self::Api(err) => Some(&err.reason),
            _ => None,
        }
    }

    /// Service-reported error, if any.
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }

    /// Whether the client gave up waiting (as opposed to the service failing).
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether a caller-level retry is reasonable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Api(err) => err.reason.is_transient(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;
