use std::sync::Arc;

use serde_json::{json, Value};
use tabula_domain::Config;
use tabula_infra::{StaticTokenProvider, WarehouseClient};
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "test-token";
pub const PROJECT: &str = "test-project";

/// Client pointed at the mock server with a short poll interval.
pub fn client_for(server: &MockServer) -> WarehouseClient {
    let mut config = Config::new(PROJECT);
    config.api.base_url = server.uri();
    config.api.timeout_seconds = 5;
    config.jobs.poll_interval_ms = 10;
    WarehouseClient::from_config(config, Arc::new(StaticTokenProvider::new(TEST_TOKEN)))
        .expect("client should build")
}

pub fn api_path(suffix: &str) -> String {
    format!("/bigquery/v2/projects/{PROJECT}{suffix}")
}

pub fn error_body(status: u16, reason: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": status,
            "message": message,
            "errors": [{"reason": reason, "message": message, "domain": "global"}]
        }
    })
}

pub fn job_body(job_id: &str, state: &str) -> Value {
    json!({
        "jobReference": {"projectId": PROJECT, "jobId": job_id},
        "status": {"state": state}
    })
}

/// `multipart/mixed` body with one embedded HTTP response per part.
pub fn composite_body(boundary: &str, parts: &[(u16, Value)]) -> String {
    let mut body = String::new();
    for (index, (status, payload)) in parts.iter().enumerate() {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Type: application/http\r\nContent-ID: <response-item-{}>\r\n\r\n",
            index + 1
        ));
        body.push_str(&format!(
            "HTTP/1.1 {status} Status\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{payload}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}
