//! Transport port for talking to the warehouse service.
//!
//! The core never opens a connection itself. Everything it sends goes through
//! a [`Transport`], which infra implements on top of an HTTP client and tests
//! replace with a scripted double.
//!
//! # Example
//!
//! ```no_run
//! use tabula_core::{Transport, TransportRequest};
//!
//! async fn fetch(transport: &impl Transport) -> tabula_domain::Result<u16> {
//!     let response = transport
//!         .execute(TransportRequest::get("/bigquery/v2/projects/p/datasets"))
//!         .await?;
//!     Ok(response.status)
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tabula_domain::{Result, TabulaError};

/// HTTP verb of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as `application/json`.
    Json(Value),
    /// Pre-encoded payload, e.g. a multipart composite.
    Raw { content_type: String, bytes: Vec<u8> },
}

impl RequestBody {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A single logical API call.
///
/// `path` is absolute from the service host (it already carries the API
/// prefix), so the same request can be sent directly or embedded in a
/// composite batch unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: RequestBody::Empty }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_json(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path).with_json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only when a value is present.
    #[must_use]
    pub fn with_optional_query<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Path plus encoded query string, as it appears on a request line.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// Raw response to a single physical (or embedded) request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// JSON response with a matching content type.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Port for executing requests against the service.
///
/// Implementations return `Ok` for every response the service produced,
/// whatever its status. `Err` is reserved for failures where no response
/// exists: connection, TLS, DNS or credential acquisition.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Port for obtaining bearer tokens.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// Convert a credential failure into the transport error space.
pub fn credential_error(err: impl fmt::Display) -> TabulaError {
    TabulaError::Transport(format!("failed to obtain access token: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_path_and_query_encodes_values() {
        let request = TransportRequest::get("/bigquery/v2/projects/p/jobs")
            .with_query("stateFilter", "running")
            .with_query("pageToken", "a b&c");
        assert_eq!(
            request.path_and_query(),
            "/bigquery/v2/projects/p/jobs?stateFilter=running&pageToken=a+b%26c"
        );
    }

    #[test]
    fn test_path_without_query() {
        let request = TransportRequest::delete("/bigquery/v2/projects/p/datasets/d");
        assert_eq!(request.path_and_query(), "/bigquery/v2/projects/p/datasets/d");
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_optional_query_skips_none() {
        let request = TransportRequest::get("/x")
            .with_optional_query("maxResults", Some(10))
            .with_optional_query::<u32>("startIndex", None);
        assert_eq!(request.query, vec![("maxResults".to_string(), "10".to_string())]);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = TransportResponse::json(200, &json!({}));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
        assert!(!TransportResponse::new(404, "").is_success());
    }
}
