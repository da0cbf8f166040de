//! HTTP client and the transport adapter built on it.

pub mod client;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
pub use transport::HttpTransport;
