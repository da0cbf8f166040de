//! # Tabula Infrastructure
//!
//! Infrastructure implementations of the core ports, plus the client facade.
//!
//! This crate contains:
//! - The reqwest HTTP client and the [`HttpTransport`] adapter
//! - Access token providers
//! - Configuration loading (environment and files)
//! - Logging setup
//! - [`WarehouseClient`], the project-scoped facade with batching
//!
//! ## Architecture
//! - Implements traits defined in `tabula-core`
//! - Depends on `tabula-domain` and `tabula-core`
//! - Contains all "impure" code (network, environment, files)

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use auth::{EnvTokenProvider, StaticTokenProvider, ACCESS_TOKEN_ENV};
pub use client::{Deferred, IntoDataset, IntoJob, IntoTable, PreparedCall, WarehouseBatch, WarehouseClient};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpTransport, RetryPolicy};
pub use observability::{init_tracing, LogFormat};
