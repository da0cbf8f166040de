//! Scripted transport for tests.
//!
//! Replays queued responses in order and records every request it receives.
//! When the queue is empty an optional responder is consulted; without one
//! the call fails with a transport error.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tabula_domain::{Result, TabulaError};

use crate::batch::codec;
use crate::transport_ports::{Transport, TransportRequest, TransportResponse};

type Responder = Arc<dyn Fn(&TransportRequest) -> Result<TransportResponse> + Send + Sync>;

#[derive(Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<TransportResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
    responder: Option<Responder>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted request with `responder`.
    pub fn with_responder(
        responder: impl Fn(&TransportRequest) -> Result<TransportResponse> + Send + Sync + 'static,
    ) -> Self {
        Self { responder: Some(Arc::new(responder)), ..Self::default() }
    }

    pub fn push(&self, response: Result<TransportResponse>) -> &Self {
        self.queue.lock().push_back(response);
        self
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(TransportResponse::json(status, &body)))
    }

    pub fn push_error(&self, err: TabulaError) -> &Self {
        self.push(Err(err))
    }

    /// Queue a composite response with one embedded JSON response per part.
    pub fn push_composite(&self, parts: &[(u16, Value)]) -> &Self {
        self.push(Ok(composite_response(parts)))
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().push(request.clone());
        let scripted = self.queue.lock().pop_front();
        match (scripted, &self.responder) {
            (Some(response), _) => response,
            (None, Some(responder)) => responder(&request),
            (None, None) => Err(TabulaError::Transport(format!(
                "no scripted response for {} {}",
                request.method, request.path
            ))),
        }
    }
}

/// Build a `multipart/mixed` composite response.
pub fn composite_response(parts: &[(u16, Value)]) -> TransportResponse {
    let boundary = codec::new_boundary();
    let mut body = String::new();
    for (index, (status, payload)) in parts.iter().enumerate() {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Type: application/http\r\nContent-ID: <response-item-{}>\r\n\r\n",
            index + 1
        ));
        body.push_str(&format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{payload}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    TransportResponse::new(200, body).with_header("Content-Type", codec::content_type(&boundary))
}

/// Service-style error body.
pub fn error_body(status: u16, reason: &str, message: &str) -> Value {
    serde_json::json!({
        "error": {
            "code": status,
            "message": message,
            "errors": [{"reason": reason, "message": message, "domain": "global"}]
        }
    })
}

/// Job resource in the given state.
pub fn job_body(project_id: &str, job_id: &str, state: &str) -> Value {
    serde_json::json!({
        "kind": "bigquery#job",
        "id": format!("{project_id}:{job_id}"),
        "jobReference": {"projectId": project_id, "jobId": job_id},
        "status": {"state": state}
    })
}

/// Finished job carrying an error result.
pub fn failed_job_body(project_id: &str, job_id: &str, reason: &str, message: &str) -> Value {
    serde_json::json!({
        "jobReference": {"projectId": project_id, "jobId": job_id},
        "status": {
            "state": "DONE",
            "errorResult": {"reason": reason, "message": message},
            "errors": [{"reason": reason, "message": message}]
        }
    })
}
