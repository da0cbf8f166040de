//! reqwest-backed implementation of the core [`Transport`] port.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use tabula_core::{
    credential_error, AccessTokenProvider, HttpMethod, RequestBody, Transport, TransportRequest,
    TransportResponse,
};
use tabula_domain::{ApiConfig, Result, TabulaError};
use tracing::{debug, instrument};
use url::Url;

use super::client::HttpClient;
use crate::errors::InfraError;

/// Sends logical requests to the service with a bearer token per call.
pub struct HttpTransport {
    http: HttpClient,
    base_url: Url,
    auth: Arc<dyn AccessTokenProvider>,
}

impl HttpTransport {
    /// `base_url` is scheme and host; request paths are absolute.
    pub fn new(http: HttpClient, base_url: &str, auth: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| TabulaError::Config(format!("invalid base URL {base_url:?}: {err}")))?;
        Ok(Self { http, base_url, auth })
    }

    /// Build the HTTP client from API settings.
    pub fn from_config(api: &ApiConfig, auth: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(api.timeout())
            .max_attempts(api.max_attempts)
            .user_agent(api.user_agent.clone())
            .build()?;
        Self::new(http, &api.base_url, auth)
    }

    fn url_for(&self, request: &TransportRequest) -> Result<Url> {
        let mut url = self.base_url.join(&request.path).map_err(|err| {
            TabulaError::InvalidInput(format!("invalid request path {:?}: {err}", request.path))
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    async fn bearer_token(&self) -> Result<String> {
        self.auth.access_token().await.map_err(|err| match err {
            TabulaError::Transport(_) => err,
            other => credential_error(other),
        })
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let token = self.bearer_token().await?;
        let url = self.url_for(&request)?;
        let carries_body = !matches!(request.method, HttpMethod::Get | HttpMethod::Delete);

        let builder = self.http.request(reqwest_method(request.method), url).bearer_auth(token);
        let builder = match request.body {
            RequestBody::Empty if carries_body => builder.body(Vec::<u8>::new()),
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Raw { content_type, bytes } => {
                builder.header(CONTENT_TYPE, content_type).body(bytes)
            }
        };

        let response = self.http.send(builder, &request.path).await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|err| TabulaError::from(InfraError::from(err)))?;

        debug!(status, bytes = body.len(), "response read");
        Ok(TransportResponse { status, headers, body: body.to_vec() })
    }
}
