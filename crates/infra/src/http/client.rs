//! reqwest client with the service's retry rules.
//!
//! A response is retried only when its status maps to a transient
//! [`Reason`]: 429 as `rateLimitExceeded`, 500 as `internal`, and 502-504 as
//! `backendError`. Other statuses, including 501, go straight back to the
//! caller for classification. Connection failures and timeouts are retried
//! too. With the default single attempt nothing is ever retried.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tabula_domain::constants::DEFAULT_MAX_ATTEMPTS;
use tabula_domain::{Reason, Result, TabulaError};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Longest wait between attempts, whatever the server asks for.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How many times a request is sent and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, base_backoff: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    /// Reason a retryable status stands for, if the status is retryable.
    pub fn transient_reason(status: StatusCode) -> Option<Reason> {
        let reason = match status.as_u16() {
            429 => Reason::RateLimitExceeded,
            500 => Reason::Internal,
            502..=504 => Reason::BackendError,
            _ => return None,
        };
        reason.is_transient().then_some(reason)
    }

    /// Delay before attempt `attempt + 1`, given the attempts made so far.
    ///
    /// A `Retry-After` hint from the server wins over the exponential
    /// backoff. Both are capped at [`MAX_RETRY_DELAY`].
    pub fn delay(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        let backoff = || {
            let shift = u32::try_from(attempt.saturating_sub(1).min(8)).unwrap_or(8);
            self.base_backoff.saturating_mul(1 << shift)
        };
        retry_after.unwrap_or_else(backoff).min(MAX_RETRY_DELAY)
    }

    const fn has_attempts_left(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

/// Retrying HTTP client shared by the transport.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeout and a single attempt.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn request<U: reqwest::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying transient failures.
    ///
    /// `path` is the logical request path, used for logging only. The final
    /// response is returned whatever its status.
    pub async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    TabulaError::InvalidInput(format!("request to {path} has a streaming body"))
                })?
                .build()
                .map_err(|err| TabulaError::from(InfraError::from(err)))?;

            debug!(attempt, path, method = %request.method(), "sending request");
            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    let Some(reason) = RetryPolicy::transient_reason(status) else {
                        return Ok(response);
                    };
                    if !self.retry.has_attempts_left(attempt) {
                        return Ok(response);
                    }
                    let delay = self.retry.delay(attempt, retry_after(&response));
                    warn!(attempt, path, %status, %reason, ?delay, "transient response, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if !(is_transient_failure(&err) && self.retry.has_attempts_left(attempt)) {
                        return Err(InfraError::from(err).into());
                    }
                    let delay = self.retry.delay(attempt, None);
                    warn!(attempt, path, error = %err, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("retry", &self.retry).finish_non_exhaustive()
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), retry: RetryPolicy::default(), user_agent: None }
    }
}

impl HttpClientBuilder {
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total sends per request, the first one included. Zero is raised to one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub const fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|err| TabulaError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(HttpClient { client, retry: self.retry })
    }
}

/// `Retry-After` in its delay-seconds form. HTTP dates are ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn is_transient_failure(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn retrying_client(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .expect("http client")
    }

    async fn respond_in_turn(server: &MockServer, first: ResponseTemplate, times: u64) {
        Mock::given(method("GET"))
            .respond_with(first)
            .up_to_n_times(times)
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(server)
            .await;
    }

    #[test]
    fn transient_statuses_map_to_service_reasons() {
        assert_eq!(
            RetryPolicy::transient_reason(StatusCode::TOO_MANY_REQUESTS),
            Some(Reason::RateLimitExceeded)
        );
        assert_eq!(
            RetryPolicy::transient_reason(StatusCode::INTERNAL_SERVER_ERROR),
            Some(Reason::Internal)
        );
        assert_eq!(
            RetryPolicy::transient_reason(StatusCode::SERVICE_UNAVAILABLE),
            Some(Reason::BackendError)
        );
        assert_eq!(RetryPolicy::transient_reason(StatusCode::NOT_IMPLEMENTED), None);
        assert_eq!(RetryPolicy::transient_reason(StatusCode::NOT_FOUND), None);
        assert_eq!(RetryPolicy::transient_reason(StatusCode::BAD_REQUEST), None);
    }

    #[test]
    fn delay_doubles_and_honours_retry_after() {
        let policy = RetryPolicy { max_attempts: 5, base_backoff: Duration::from_millis(100) };
        assert_eq!(policy.delay(1, None), Duration::from_millis(100));
        assert_eq!(policy.delay(3, None), Duration::from_millis(400));
        assert_eq!(policy.delay(1, Some(Duration::from_secs(2))), Duration::from_secs(2));
        assert_eq!(policy.delay(1, Some(Duration::from_secs(3600))), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn default_client_sends_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().expect("http client");
        let response = client
            .send(client.request(Method::GET, server.uri()), "/bigquery/v2/projects/p/jobs/j")
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn rate_limited_request_is_retried() {
        let server = MockServer::start().await;
        respond_in_turn(
            &server,
            ResponseTemplate::new(429).insert_header("retry-after", "0"),
            1,
        )
        .await;

        let client = retrying_client(3);
        let response = client
            .send(client.request(Method::GET, server.uri()), "/bigquery/v2/projects/p/datasets")
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn backend_errors_stop_at_attempt_limit() {
        let server = MockServer::start().await;
        respond_in_turn(&server, ResponseTemplate::new(503), 5).await;

        let client = retrying_client(2);
        let response = client
            .send(client.request(Method::GET, server.uri()), "/batch/bigquery/v2")
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn not_implemented_is_not_retried() {
        let server = MockServer::start().await;
        respond_in_turn(&server, ResponseTemplate::new(501), 1).await;

        let client = retrying_client(3);
        let response = client
            .send(client.request(Method::GET, server.uri()), "/bigquery/v2/projects/p/jobs")
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = retrying_client(2);
        let err = client
            .send(client.request(Method::GET, format!("http://{addr}")), "/bigquery/v2")
            .await
            .unwrap_err();

        assert!(matches!(err, TabulaError::Transport(_)), "got {err:?}");
    }
}
