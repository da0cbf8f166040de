//! Request multiplexer
//!
//! A [`Multiplexer`] owns the batch state of one client. Opening a
//! [`BatchScope`] marks the client as batching; calls enqueued on the scope
//! are held back and sent as one composite request when the scope is
//! flushed. Each queued call's callback fires exactly once: with its own
//! part's result, with the shared failure of the composite request, or with
//! [`TabulaError::BatchAborted`] when the scope is abandoned.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tabula_domain::{Result, TabulaError};
use tracing::{debug, info, instrument, warn};

use super::codec;
use crate::classifier::classify;
use crate::executor::interpret_response;
use crate::transport_ports::{
    HttpMethod, RequestBody, Transport, TransportRequest, TransportResponse,
};

/// Callback receiving the outcome of one batched call.
pub type ResponseCallback = Box<dyn FnOnce(Result<Value>) + Send + 'static>;

/// A logical request paired with the callback that receives its outcome.
pub struct ApiCall {
    request: TransportRequest,
    callback: ResponseCallback,
}

impl ApiCall {
    pub fn new(
        request: TransportRequest,
        callback: impl FnOnce(Result<Value>) + Send + 'static,
    ) -> Self {
        Self { request, callback: Box::new(callback) }
    }

    pub const fn request(&self) -> &TransportRequest {
        &self.request
    }

    fn into_parts(self) -> (TransportRequest, ResponseCallback) {
        (self.request, self.callback)
    }
}

impl std::fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCall").field("request", &self.request).finish_non_exhaustive()
    }
}

/// Outcome counts of a flushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Calls delivered through the composite request.
    pub calls: usize,
    /// Parts the service answered with success.
    pub succeeded: usize,
    /// Parts the service answered with an error, `notFound` included.
    pub failed: usize,
}

/// Groups logical calls into composite requests.
pub struct Multiplexer {
    transport: Arc<dyn Transport>,
    batch_path: String,
    active: AtomicBool,
}

impl Multiplexer {
    pub fn new(transport: Arc<dyn Transport>, batch_path: impl Into<String>) -> Self {
        Self { transport, batch_path: batch_path.into(), active: AtomicBool::new(false) }
    }

    /// Whether a batch scope is currently open.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Open a batch scope.
    ///
    /// Fails with [`TabulaError::BatchAlreadyActive`] while another scope on
    /// this multiplexer is open; the open scope is unaffected.
    pub fn begin(&self) -> Result<BatchScope<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TabulaError::BatchAlreadyActive)?;
        debug!("batch scope opened");
        Ok(BatchScope { multiplexer: self, requests: Vec::new(), callbacks: VecDeque::new() })
    }

    /// Run `body` inside a batch scope and flush what it enqueued.
    ///
    /// If `body` fails, nothing is sent, every queued callback receives
    /// [`TabulaError::BatchAborted`], and the body's error is returned.
    pub async fn with_batch<F>(&self, body: F) -> Result<BatchSummary>
    where
        F: FnOnce(&mut BatchScope<'_>) -> Result<()>,
    {
        let mut scope = self.begin()?;
        if let Err(err) = body(&mut scope) {
            scope.abort();
            return Err(err);
        }
        scope.flush().await
    }

    #[instrument(skip(self, requests), fields(parts = requests.len()))]
    async fn exchange(&self, requests: &[TransportRequest]) -> Result<Vec<TransportResponse>> {
        let boundary = codec::new_boundary();
        let body = codec::encode(requests, &boundary)?;
        let composite = TransportRequest {
            method: HttpMethod::Post,
            path: self.batch_path.clone(),
            query: Vec::new(),
            body: RequestBody::Raw { content_type: codec::content_type(&boundary), bytes: body },
        };

        let response = self.transport.execute(composite).await?;
        if !response.is_success() {
            return Err(classify(response.status, &response.body, &self.batch_path).into());
        }

        let response_boundary =
            response.header("content-type").and_then(codec::boundary_from_content_type);
        let parts = codec::decode(&response.body, response_boundary.as_deref())?;
        if parts.len() != requests.len() {
            return Err(TabulaError::MalformedResponse(format!(
                "composite response has {} parts for {} requests",
                parts.len(),
                requests.len()
            )));
        }
        Ok(parts)
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("batch_path", &self.batch_path)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// An open batch.
///
/// Queued callbacks are owned by the scope until they fire. Dropping the
/// scope for any reason (an early return, a panic in the batch body, or a
/// cancelled [`BatchScope::flush`]) delivers [`TabulaError::BatchAborted`]
/// to every callback that has not run yet.
pub struct BatchScope<'a> {
    multiplexer: &'a Multiplexer,
    requests: Vec<TransportRequest>,
    callbacks: VecDeque<ResponseCallback>,
}

impl BatchScope<'_> {
    /// Queue a call. Nothing is sent until [`BatchScope::flush`].
    pub fn enqueue(&mut self, call: ApiCall) {
        let (request, callback) = call.into_parts();
        self.requests.push(request);
        self.callbacks.push_back(callback);
    }

    /// Queue a request with its callback.
    pub fn submit(
        &mut self,
        request: TransportRequest,
        callback: impl FnOnce(Result<Value>) + Send + 'static,
    ) {
        self.enqueue(ApiCall::new(request, callback));
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Close the scope without sending. Every queued callback receives
    /// [`TabulaError::BatchAborted`].
    pub fn abort(self) {
        warn!(queued = self.len(), "batch aborted");
    }

    /// Send every queued call as one composite request and close the scope.
    ///
    /// Per-call failures go to the individual callbacks and still count as a
    /// successful flush. A failure of the composite request itself (transport
    /// error, non-success status, unparseable body, part count mismatch) is
    /// delivered to every callback and also returned.
    ///
    /// The summary counts part outcomes as the service reported them. A
    /// `notFound` part counts as failed even when the facade later turns it
    /// into `None` or `false`.
    pub async fn flush(mut self) -> Result<BatchSummary> {
        if self.is_empty() {
            debug!("empty batch, nothing sent");
            return Ok(BatchSummary::default());
        }

        let requests = std::mem::take(&mut self.requests);
        match self.multiplexer.exchange(&requests).await {
            Ok(responses) => {
                let mut summary = BatchSummary { calls: requests.len(), ..BatchSummary::default() };
                for (request, response) in requests.iter().zip(responses.iter()) {
                    let result = interpret_response(response, &request.path);
                    if result.is_ok() {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                    if let Some(callback) = self.callbacks.pop_front() {
                        callback(result);
                    }
                }
                info!(
                    calls = summary.calls,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "batch flushed"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, calls = requests.len(), "composite request failed");
                while let Some(callback) = self.callbacks.pop_front() {
                    callback(Err(err.clone()));
                }
                Err(err)
            }
        }
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if !self.callbacks.is_empty() {
            warn!(queued = self.callbacks.len(), "batch scope closed with undelivered calls");
        }
        while let Some(callback) = self.callbacks.pop_front() {
            callback(Err(TabulaError::BatchAborted));
        }
        self.multiplexer.active.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for BatchScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope").field("queued", &self.callbacks.len()).finish()
    }
}
