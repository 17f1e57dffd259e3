//! Request model for the batch engine.
//!
//! A batch is an ordered list of [`Request`]s. Requests are immutable once
//! queued; payload encoding happens just before transmission.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// HTTP method for a batched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Parse a method name, case-insensitively.
    pub fn parse(method: &str) -> EngineResult<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(EngineError::UnsupportedMethod {
                method: method.to_string(),
            }),
        }
    }

    /// Whether this method reads without side effects.
    ///
    /// Reads may be fanned out concurrently within a window; anything else
    /// is treated as mutating and executed one at a time.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::parse(s)
    }
}

/// Wire format for a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Xml,
}

impl WireFormat {
    /// Content type header value for this format.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Json => "application/json",
            WireFormat::Xml => "application/xml",
        }
    }
}

/// A structured request body, encoded to the wire just before transmission.
///
/// Bodies default to JSON. A string payload whose first non-whitespace byte
/// is `<` is taken to be pre-rendered XML (bulk submissions arrive this way)
/// and is sent verbatim with an XML content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    value: Value,
    format: WireFormat,
}

impl Payload {
    /// Wrap a structured value, sniffing the wire format from its content.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let format = match &value {
            Value::String(s) if s.trim_start().starts_with('<') => WireFormat::Xml,
            _ => WireFormat::Json,
        };
        Self { value, format }
    }

    /// The wire format this payload will be encoded with.
    #[must_use]
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Borrow the structured value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Encode the payload for transmission.
    #[must_use]
    pub fn encode(&self) -> String {
        match self.format {
            // XML payloads are already rendered; ship the raw string.
            WireFormat::Xml => match &self.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            WireFormat::Json => self.value.to_string(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::from_value(value)
    }
}

/// One queued HTTP operation: method, absolute URL, optional body.
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    url: String,
    payload: Option<Payload>,
}

impl Request {
    /// Create a request with no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            payload: None,
        }
    }

    /// Create a request from an untyped `[method, url, payload]` triple.
    pub fn from_parts(
        method: &str,
        url: impl Into<String>,
        payload: Option<Value>,
    ) -> EngineResult<Self> {
        Ok(Self {
            method: HttpMethod::parse(method)?,
            url: url.into(),
            payload: payload.map(Payload::from_value),
        })
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Shorthand for a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Shorthand for a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    /// Shorthand for a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Attach a body.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Replace the URL, keeping method and payload.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

/// An ordered, non-empty sequence of requests.
///
/// The engine guarantees that `result[i]` corresponds to `request[i]`
/// regardless of completion order. An empty batch is a caller error, not a
/// no-op.
#[derive(Debug, Clone)]
pub struct RequestBatch {
    requests: Vec<Request>,
}

impl RequestBatch {
    /// Validate and wrap an ordered request list.
    pub fn new(requests: Vec<Request>) -> EngineResult<Self> {
        if requests.is_empty() {
            return Err(EngineError::EmptyBatch);
        }
        Ok(Self { requests })
    }

    /// Build a batch from untyped `[method, url, payload]` triples.
    pub fn from_parts(
        parts: Vec<(String, String, Option<Value>)>,
    ) -> EngineResult<Self> {
        let requests = parts
            .into_iter()
            .map(|(method, url, payload)| Request::from_parts(&method, url, payload))
            .collect::<EngineResult<Vec<_>>>()?;
        Self::new(requests)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Always false; an empty batch cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Request> {
        self.requests.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Request> {
        self.requests
    }
}

impl IntoIterator for RequestBatch {
    type Item = Request;
    type IntoIter = std::vec::IntoIter<Request>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!(HttpMethod::parse("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("Put").unwrap(), HttpMethod::Put);
        assert_eq!(HttpMethod::parse("DELETE").unwrap(), HttpMethod::Delete);
        assert_eq!(HttpMethod::parse("patch").unwrap(), HttpMethod::Patch);
        assert_eq!(HttpMethod::parse("POST").unwrap(), HttpMethod::Post);
    }

    #[test]
    fn test_method_parse_rejects_unknown() {
        let err = HttpMethod::parse("HEAD").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_method_read_split() {
        assert!(HttpMethod::Get.is_read());
        assert!(!HttpMethod::Post.is_read());
        assert!(!HttpMethod::Put.is_read());
        assert!(!HttpMethod::Patch.is_read());
        assert!(!HttpMethod::Delete.is_read());
    }

    #[test]
    fn test_payload_defaults_to_json() {
        let payload = Payload::from_value(json!({"name": "sw01"}));
        assert_eq!(payload.format(), WireFormat::Json);
        assert_eq!(payload.encode(), r#"{"name":"sw01"}"#);
    }

    #[test]
    fn test_payload_sniffs_xml_string() {
        let payload = Payload::from_value(json!(
            "<?xml version=\"1.0\"?><resource><id>1</id></resource>"
        ));
        assert_eq!(payload.format(), WireFormat::Xml);
        assert!(payload.encode().starts_with("<?xml"));
    }

    #[test]
    fn test_payload_sniffs_xml_with_leading_whitespace() {
        let payload = Payload::from_value(json!("  <resource/>"));
        assert_eq!(payload.format(), WireFormat::Xml);
    }

    #[test]
    fn test_payload_plain_string_stays_json() {
        let payload = Payload::from_value(json!("just a string"));
        assert_eq!(payload.format(), WireFormat::Json);
        assert_eq!(payload.encode(), "\"just a string\"");
    }

    #[test]
    fn test_request_from_parts() {
        let request =
            Request::from_parts("put", "https://host/api/x", Some(json!({"a": 1}))).unwrap();
        assert_eq!(request.method(), HttpMethod::Put);
        assert_eq!(request.url(), "https://host/api/x");
        assert!(request.payload().is_some());
    }

    #[test]
    fn test_batch_rejects_empty() {
        let err = RequestBatch::new(vec![]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyBatch));
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = RequestBatch::new(vec![
            Request::get("https://host/a"),
            Request::put("https://host/b"),
            Request::get("https://host/c"),
        ])
        .unwrap();

        let urls: Vec<&str> = batch.iter().map(Request::url).collect();
        assert_eq!(urls, vec!["https://host/a", "https://host/b", "https://host/c"]);
    }
}
