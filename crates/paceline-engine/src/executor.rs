//! Single-request execution and response classification.
//!
//! [`execute`] never fails from the caller's point of view: every transport
//! error, timeout, and remote error status is absorbed here and surfaced as
//! [`Outcome::Failed`] together with a diagnostic log entry. A concurrency
//! permit is held for the full duration of the call, including the one
//! permitted retry.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use paceline_core::outcome::{describe_status, Ack, Outcome};
use paceline_core::request::{HttpMethod, Request};

use crate::session::Session;

/// Marker token preceding the job identifier in location-style headers of
/// asynchronous-accepted (202) responses.
const JOB_ID_MARKER: &str = "submit/";

/// Execute one request against the session, normalizing every outcome.
pub(crate) async fn execute(session: &Session, request: &Request) -> Outcome {
    let permit = match session.permits().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            error!(url = %request.url(), "concurrency permit pool closed");
            return Outcome::Failed;
        }
    };

    let outcome = run_attempts(session, request).await;

    // Released on every exit path; run_attempts cannot escape this scope.
    drop(permit);
    outcome
}

/// Issue the request, retrying a server error exactly once.
async fn run_attempts(session: &Session, request: &Request) -> Outcome {
    let mut attempt: u32 = 1;
    loop {
        if session.verbosity().is_enabled() {
            debug!(
                method = %request.method(),
                url = %request.url(),
                attempt,
                "sending request"
            );
        }
        if session.verbosity().log_bodies() {
            if let Some(payload) = request.payload() {
                trace!(body = %payload.encode(), "request body");
            }
        }

        let response = match send(session, request).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    method = %request.method(),
                    url = %request.url(),
                    error = %e,
                    "transport failure"
                );
                return Outcome::Failed;
            }
        };

        let status = response.status();
        if session.verbosity().is_enabled() {
            debug!(url = %request.url(), status = %status, attempt, "received response");
        }

        if status == StatusCode::INTERNAL_SERVER_ERROR && attempt == 1 {
            warn!(
                method = %request.method(),
                url = %request.url(),
                backoff_ms = session.retry_backoff().as_millis() as u64,
                "server error, retrying once after backoff"
            );
            tokio::time::sleep(session.retry_backoff()).await;
            attempt += 1;
            continue;
        }

        return classify(session, request, response).await;
    }
}

async fn send(session: &Session, request: &Request) -> reqwest::Result<Response> {
    let client = session.client();
    let mut builder = match request.method() {
        HttpMethod::Get => client.get(request.url()),
        HttpMethod::Post => client.post(request.url()),
        HttpMethod::Put => client.put(request.url()),
        HttpMethod::Patch => client.patch(request.url()),
        HttpMethod::Delete => client.delete(request.url()),
    };

    if let Some(payload) = request.payload() {
        // The per-request content type overrides the session default, so a
        // sniffed XML body ships with the right header.
        builder = builder
            .header(CONTENT_TYPE, payload.format().content_type())
            .body(payload.encode());
    }

    builder.send().await
}

/// Map a completed exchange onto an [`Outcome`], in priority order.
async fn classify(session: &Session, request: &Request, response: Response) -> Outcome {
    let status = response.status();

    if status.is_success() {
        return match status.as_u16() {
            201 => Outcome::Ack(Ack::new("created")),
            202 => match job_id_from_headers(response.headers()) {
                Some(job_id) => Outcome::JobId(job_id),
                // No job marker in the headers: treat like any other success.
                None => decode_success_body(session, response).await,
            },
            204 => Outcome::Ack(Ack::new(format!("no content ({})", request.method()))),
            _ => decode_success_body(session, response).await,
        };
    }

    classify_error(request, response).await
}

/// Extract the job identifier from a location-style header by taking the
/// substring after the fixed marker token.
fn job_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    let (_, job_id) = location.split_once(JOB_ID_MARKER)?;
    if job_id.is_empty() {
        None
    } else {
        Some(job_id.to_string())
    }
}

/// Decode a successful body: JSON first, raw text second, a bare
/// acknowledgement carrying the response headers last.
async fn decode_success_body(session: &Session, response: Response) -> Outcome {
    let headers = header_pairs(response.headers());

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to read response body");
            return Outcome::Failed;
        }
    };

    if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
        if session.verbosity().log_bodies() {
            trace!(body = %value, "response body");
        }
        return Outcome::Body(value);
    }

    let text = String::from_utf8_lossy(&bytes).into_owned();
    if !text.trim().is_empty() {
        return Outcome::Text(text);
    }

    Outcome::Ack(Ack::new("OK").with_headers(headers))
}

/// Log a non-success response with full context and absorb it.
async fn classify_error(request: &Request, response: Response) -> Outcome {
    let status = response.status().as_u16();

    if status == 500 {
        // Only reachable on the retry attempt; the first 500 was retried.
        error!(
            status = describe_status(status),
            method = %request.method(),
            url = %request.url(),
            "server error persisted after retry"
        );
        return Outcome::Failed;
    }

    let text = response.text().await.unwrap_or_default();
    let payload = request.payload().map(|p| p.encode());

    match serde_json::from_str::<Value>(&text) {
        Ok(body) => {
            if let Some(envelope) = ErrorEnvelope::decode(&body) {
                error!(
                    status = describe_status(status),
                    method = %request.method(),
                    url = %request.url(),
                    operation = %envelope.operation,
                    messages = %envelope.messages,
                    "request rejected"
                );
            } else {
                error!(
                    status = describe_status(status),
                    method = %request.method(),
                    url = %request.url(),
                    payload = payload.as_deref().unwrap_or(""),
                    body = %body,
                    "request rejected"
                );
            }
        }
        Err(_) => {
            let detail = if text.trim().is_empty() { "N/A" } else { text.as_str() };
            error!(
                status = describe_status(status),
                method = %request.method(),
                resource = %resource_segment(request.url()),
                payload = payload.as_deref().unwrap_or(""),
                detail,
                "request rejected"
            );
        }
    }

    Outcome::Failed
}

/// A structured error body: an envelope object carrying the attempted
/// operation and a list of typed messages.
struct ErrorEnvelope {
    operation: String,
    messages: String,
}

impl ErrorEnvelope {
    fn decode(body: &Value) -> Option<Self> {
        let envelope = body
            .as_object()?
            .values()
            .find_map(|v| v.as_object().filter(|o| o.contains_key("messages")))?;

        let messages = envelope
            .get("messages")?
            .as_array()?
            .iter()
            .filter_map(|m| {
                let kind = m.get("type").and_then(Value::as_str).unwrap_or("ERROR");
                let title = m.get("title").and_then(Value::as_str)?;
                let code = m.get("code").and_then(Value::as_str).unwrap_or("");
                Some(format!("{kind}: {title} - {code}"))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Some(Self {
            operation: envelope
                .get("operation")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            messages,
        })
    }
}

/// The resource segment of an API URL, for compact error logs.
fn resource_segment(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    segments
        .get(2)
        .or(segments.last())
        .map(|s| (*s).to_string())
        .unwrap_or_else(|| url.to_string())
}

fn header_pairs(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_job_id_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("https://host/ers/config/networkdevice/bulk/submit/12345"),
        );
        assert_eq!(job_id_from_headers(&headers), Some("12345".to_string()));
    }

    #[test]
    fn test_job_id_extraction_without_marker() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("https://host/ers/config/networkdevice/1"),
        );
        assert_eq!(job_id_from_headers(&headers), None);
    }

    #[test]
    fn test_job_id_extraction_empty_id() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("https://host/bulk/submit/"),
        );
        assert_eq!(job_id_from_headers(&headers), None);
    }

    #[test]
    fn test_job_id_extraction_missing_header() {
        assert_eq!(job_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_error_envelope_decode() {
        let body = json!({
            "ApiResponse": {
                "operation": "PUT-update by name-networkdevice",
                "messages": [{
                    "title": "Resource Initialization Failed",
                    "type": "ERROR",
                    "code": "Application resource validation exception"
                }]
            }
        });

        let envelope = ErrorEnvelope::decode(&body).unwrap();
        assert_eq!(envelope.operation, "PUT-update by name-networkdevice");
        assert_eq!(
            envelope.messages,
            "ERROR: Resource Initialization Failed - Application resource validation exception"
        );
    }

    #[test]
    fn test_error_envelope_decode_rejects_plain_bodies() {
        assert!(ErrorEnvelope::decode(&json!({"message": "nope"})).is_none());
        assert!(ErrorEnvelope::decode(&json!("nope")).is_none());
        assert!(ErrorEnvelope::decode(&json!(["nope"])).is_none());
    }

    #[test]
    fn test_resource_segment() {
        assert_eq!(
            resource_segment("https://host:9060/ers/config/networkdevice/name/sw01"),
            "networkdevice"
        );
        assert_eq!(resource_segment("https://host/users"), "users");
        assert_eq!(resource_segment("not a url"), "not a url");
    }
}
