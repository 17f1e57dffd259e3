//! Normalized results for batched requests.
//!
//! Every request resolves to exactly one [`Outcome`]; failures are a
//! distinct variant rather than an empty body, so callers never have to
//! guess whether "no data" means success or failure.

use std::collections::HashMap;

use serde_json::Value;

/// The normalized result of one executed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Decoded structured response body.
    Body(Value),

    /// Raw text body; the call succeeded but the body was not valid JSON.
    Text(String),

    /// Status-only success with no meaningful body (201, 204, empty 200).
    Ack(Ack),

    /// Job identifier extracted from an asynchronous-accepted (202) response.
    JobId(String),

    /// The call did not succeed. Details are in the diagnostic log, not here.
    Failed,
}

impl Outcome {
    /// Whether the call succeeded in any form.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }

    /// Whether the call failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    /// Borrow the decoded body, if this outcome carries one.
    #[must_use]
    pub fn as_body(&self) -> Option<&Value> {
        match self {
            Outcome::Body(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the outcome, returning the decoded body if present.
    #[must_use]
    pub fn into_body(self) -> Option<Value> {
        match self {
            Outcome::Body(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the job identifier, if this outcome carries one.
    #[must_use]
    pub fn as_job_id(&self) -> Option<&str> {
        match self {
            Outcome::JobId(id) => Some(id),
            _ => None,
        }
    }
}

/// A synthetic acknowledgement for a success with no decodable body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ack {
    /// Short description of what was acknowledged ("created", "no content").
    pub message: String,

    /// Response headers, for callers that need job links or entity tags.
    pub headers: HashMap<String, String>,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Human-readable description for the HTTP statuses the engine expects to
/// see from resource-oriented APIs.
#[must_use]
pub fn describe_status(status: u16) -> &'static str {
    match status {
        400 => "(400) Bad Request",
        401 => "(401) Unauthorized",
        403 => "(403) Forbidden",
        404 => "(404) Not Found",
        405 => "(405) Method Not Allowed",
        406 => "(406) Not Acceptable",
        409 => "(409) Conflict",
        415 => "(415) Unsupported Media Type",
        422 => "(422) Unprocessable Entity",
        429 => "(429) Too Many Requests",
        500 => "(500) Internal Server Error",
        501 => "(501) Not Implemented",
        503 => "(503) Service Unavailable",
        _ => "unrecognized status",
    }
}
