//! # Tabula Core
//!
//! Request batching and job lifecycle logic - no HTTP client code.
//!
//! This crate contains:
//! - The transport and credential ports (traits)
//! - Error classification and response interpretation
//! - Token-based pagination
//! - The request multiplexer and its `multipart/mixed` codec
//! - The job controller (submit, poll, cancel, wait, list)
//!
//! ## Architecture Principles
//! - Only depends on `tabula-domain`
//! - No sockets, TLS or credentials; all I/O goes through [`Transport`]
//! - Time is read from `tokio::time`, so waits are testable with a paused clock

pub mod batch;
pub mod classifier;
pub mod executor;
pub mod jobs;
pub mod pagination;
pub mod routes;

// Infrastructure ports
pub mod transport_ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use batch::{ApiCall, BatchScope, BatchSummary, Multiplexer, ResponseCallback};
pub use classifier::{classify, classify_job_error};
pub use executor::{decode, interpret_response, ApiExecutor};
pub use jobs::{effective_poll_interval, job_outcome, JobController};
pub use pagination::Paginator;
pub use routes::ApiRoutes;
pub use transport_ports::{
    credential_error, AccessTokenProvider, HttpMethod, RequestBody, Transport, TransportRequest,
    TransportResponse,
};
