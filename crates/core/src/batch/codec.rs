//! `multipart/mixed` codec for composite batch requests.
//!
//! Each logical request becomes one `application/http` part holding a full
//! HTTP request (request line, headers, blank line, body). The response
//! mirrors that layout with one embedded HTTP response per part, in request
//! order.

use tabula_domain::{Result, TabulaError};
use uuid::Uuid;

use crate::transport_ports::{RequestBody, TransportRequest, TransportResponse};

const CRLF: &str = "\r\n";

/// Fresh boundary token that cannot collide with JSON payloads.
pub fn new_boundary() -> String {
    format!("batch_{}", Uuid::new_v4().simple())
}

/// Content type of a composite request using `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

/// Extract the `boundary` parameter from a `Content-Type` header value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Encode requests as a composite body. Parts are numbered from 1 in the
/// order given.
pub fn encode(requests: &[TransportRequest], boundary: &str) -> Result<Vec<u8>> {
    let mut out = String::new();

    for (index, request) in requests.iter().enumerate() {
        out.push_str(&format!("--{boundary}{CRLF}"));
        out.push_str(&format!("Content-Type: application/http{CRLF}"));
        out.push_str(&format!("Content-ID: <item-{}>{CRLF}", index + 1));
        out.push_str(CRLF);
        out.push_str(&format!("{} {} HTTP/1.1{CRLF}", request.method, request.path_and_query()));

        match &request.body {
            RequestBody::Empty => out.push_str(CRLF),
            RequestBody::Json(body) => {
                let payload = serde_json::to_string(body)?;
                out.push_str(&format!("Content-Type: application/json; charset=UTF-8{CRLF}"));
                out.push_str(CRLF);
                out.push_str(&payload);
                out.push_str(CRLF);
            }
            RequestBody::Raw { content_type, .. } => {
                return Err(TabulaError::InvalidInput(format!(
                    "{} {}: {content_type} bodies cannot be batched",
                    request.method, request.path
                )));
            }
        }
    }

    out.push_str(&format!("--{boundary}--{CRLF}"));
    Ok(out.into_bytes())
}

/// Decode a composite response into one response per part, in order.
///
/// When `boundary` is `None` it is sniffed from the first delimiter line.
pub fn decode(body: &[u8], boundary: Option<&str>) -> Result<Vec<TransportResponse>> {
    let text = std::str::from_utf8(body)
        .map_err(|err| malformed(format!("composite response is not UTF-8: {err}")))?;

    let boundary = match boundary {
        Some(boundary) => boundary.to_string(),
        None => sniff_boundary(text)
            .ok_or_else(|| malformed("composite response has no boundary".to_string()))?,
    };
    let delimiter = format!("--{boundary}");

    let mut segments = text.split(delimiter.as_str());
    // Preamble before the first delimiter carries no data.
    segments.next();

    let mut parts = Vec::new();
    let mut closed = false;
    for segment in segments {
        if segment.starts_with("--") {
            closed = true;
            break;
        }
        parts.push(decode_part(segment, parts.len() + 1)?);
    }

    if !closed {
        return Err(malformed(format!("composite response missing closing boundary {delimiter}--")));
    }
    Ok(parts)
}

fn sniff_boundary(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim_end)
        .find(|line| !line.is_empty())
        .and_then(|line| line.strip_prefix("--"))
        .map(|boundary| boundary.trim_end_matches("--").to_string())
        .filter(|boundary| !boundary.is_empty())
}

fn decode_part(segment: &str, index: usize) -> Result<TransportResponse> {
    let segment = segment.trim_start_matches([' ', '\t']);
    let segment = segment.strip_prefix(CRLF).or_else(|| segment.strip_prefix('\n')).unwrap_or(segment);

    // Part headers (Content-Type: application/http, Content-ID) are not used
    // for correlation; order is.
    let (_, embedded) = split_head(segment);
    let (head, body) = split_head(embedded);

    let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
    let status_line = lines
        .next()
        .filter(|line| line.starts_with("HTTP/"))
        .ok_or_else(|| malformed(format!("part {index}: missing HTTP status line")))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed(format!("part {index}: bad status line {status_line:?}")))?;

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let body = body.strip_suffix(CRLF).or_else(|| body.strip_suffix('\n')).unwrap_or(body);

    Ok(TransportResponse { status, headers, body: body.as_bytes().to_vec() })
}

/// Split at the first blank line. Without one, everything is head.
fn split_head(text: &str) -> (&str, &str) {
    let crlf = text.find("\r\n\r\n").map(|at| (at, 4));
    let lf = text.find("\n\n").map(|at| (at, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((at, width)) => (&text[..at], &text[at + width..]),
        None => (text, ""),
    }
}

fn malformed(message: String) -> TabulaError {
    TabulaError::MalformedResponse(message)
}
