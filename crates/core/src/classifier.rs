//! Error classification
//!
//! Turns a non-success response, or the error result of a finished job, into
//! an [`ApiError`]. Classification never fails: an unreadable body still
//! yields an error with a status-derived reason.

use serde_json::Value;
use tabula_domain::{ApiError, ErrorProto, JobReference, Reason};

/// Classify a non-success HTTP response.
///
/// Reason is taken from `error.errors[0].reason`, falling back to the status
/// (404 is `notFound`, other 4xx are `invalid`, everything else `internal`).
/// Message prefers `error.errors[0].message`, then `error.message`, then the
/// raw body, then `HTTP <status>`.
pub fn classify(status: u16, body: &[u8], origin: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let envelope = parsed.as_ref().and_then(|value| value.get("error")).filter(|e| e.is_object());
    let first = envelope
        .and_then(|error| error.get("errors"))
        .and_then(Value::as_array)
        .and_then(|errors| errors.first());

    let reason = first
        .and_then(|entry| entry.get("reason"))
        .and_then(Value::as_str)
        .filter(|raw| !raw.is_empty())
        .map_or_else(|| Reason::from_status(status), Reason::parse);

    let message = first
        .and_then(|entry| entry.get("message"))
        .and_then(Value::as_str)
        .or_else(|| envelope.and_then(|error| error.get("message")).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| raw_body_message(body))
        .unwrap_or_else(|| format!("HTTP {status}"));

    ApiError::new(reason, message, origin).with_status(status)
}

fn raw_body_message(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Classify the error result of a job that reached `DONE`.
///
/// The service reason is preserved verbatim, so a cancelled job surfaces as
/// `stopped` rather than a generic failure.
pub fn classify_job_error(job: &JobReference, error: &ErrorProto) -> ApiError {
    let reason = error
        .reason
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map_or(Reason::Internal, Reason::parse);
    let message = error
        .message
        .clone()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("job {job} failed"));
    ApiError::new(reason, message, format!("job {job}"))
}
