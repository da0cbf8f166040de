//! Request executor
//!
//! Sends one logical request and interprets the response. The same
//! interpretation is applied to each part of a composite batch response, so
//! a batched call observes exactly what an unbatched one would.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tabula_domain::{Result, TabulaError};
use tracing::{debug, instrument, warn};

use crate::classifier::classify;
use crate::transport_ports::{Transport, TransportRequest, TransportResponse};

/// Interpret a response: JSON body on success, classified error otherwise.
///
/// An empty success body (e.g. `204 No Content` after a delete) yields
/// `Value::Null`.
pub fn interpret_response(response: &TransportResponse, origin: &str) -> Result<Value> {
    if !response.is_success() {
        let err = classify(response.status, &response.body, origin);
        warn!(status = response.status, reason = %err.reason, origin, "request failed");
        return Err(err.into());
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&response.body).map_err(|err| {
        TabulaError::MalformedResponse(format!("{origin}: response body is not JSON: {err}"))
    })
}

/// Decode an interpreted body into a typed resource.
pub fn decode<T: DeserializeOwned>(value: Value, origin: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|err| {
        TabulaError::MalformedResponse(format!("{origin}: unexpected response shape: {err}"))
    })
}

/// Executes single logical calls over a [`Transport`].
#[derive(Clone)]
pub struct ApiExecutor {
    transport: Arc<dyn Transport>,
}

impl ApiExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send a request and return its JSON body.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn call(&self, request: TransportRequest) -> Result<Value> {
        let origin = request.path.clone();
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "response received");
        interpret_response(&response, &origin)
    }

    /// Send a request and decode its body.
    pub async fn call_as<T: DeserializeOwned>(&self, request: TransportRequest) -> Result<T> {
        let origin = request.path.clone();
        decode(self.call(request).await?, &origin)
    }
}

impl std::fmt::Debug for ApiExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiExecutor").finish_non_exhaustive()
    }
}
