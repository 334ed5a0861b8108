//! Uniform response envelope.
//!
//! Every call, against either API family, resolves to an [`ApiResponse`]:
//! one `success` flag computed from the HTTP status, the resolved URL, the
//! raw body, and an opportunistic structured view of the body. Construction
//! never fails; unparseable bodies just leave `is_structured` false.

use std::fmt;

use serde_json::Value;

use super::transport::TransportError;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    success: bool,
    url: Option<String>,
    http_code: u16,
    raw: Option<String>,
    error: Option<String>,
    data: Option<Value>,
    is_structured: bool,
}

impl ApiResponse {
    /// Envelope for a completed HTTP exchange.
    pub fn from_http(url: impl Into<String>, status: u16, body: String) -> Self {
        let success = (200..300).contains(&status);
        let data = parse_structured(&body);
        let is_structured = data.is_some();
        let error = (!success).then(|| format!("HTTP {status}"));
        Self {
            success,
            url: Some(url.into()),
            http_code: status,
            raw: Some(body),
            error,
            data,
            is_structured,
        }
    }

    /// Envelope for a request that never produced a response.
    pub fn from_transport_error(url: impl Into<String>, error: &TransportError) -> Self {
        Self {
            success: false,
            url: Some(url.into()),
            http_code: 0,
            raw: None,
            error: Some(error.to_string()),
            data: None,
            is_structured: false,
        }
    }

    /// Envelope for a call that failed to (re)authenticate.
    pub fn auth_failure(url: impl Into<String>, message: String) -> Self {
        Self {
            success: false,
            url: Some(url.into()),
            http_code: 401,
            raw: None,
            error: Some(message),
            data: None,
            is_structured: false,
        }
    }

    /// True iff the HTTP status was in [200, 300).
    pub fn success(&self) -> bool {
        self.success
    }

    /// The fully resolved request URL.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// HTTP status code, 0 when no response was received.
    pub fn http_code(&self) -> u16 {
        self.http_code
    }

    pub fn raw_body(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Structured view of the body, when it parsed as JSON or XML.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_structured(&self) -> bool {
        self.is_structured
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw.as_deref().unwrap_or_default())
    }
}

/// Try JSON first, then a shallow XML reading (root element mapped to its
/// direct children's text). Returns `None` rather than failing.
pub fn parse_structured(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Some(value);
    }

    let doc = roxmltree::Document::parse(raw).ok()?;
    let root = doc.root_element();
    let mut children = serde_json::Map::new();
    for child in root.children().filter(|node| node.is_element()) {
        let text = child
            .text()
            .map(|t| Value::String(t.trim().to_string()))
            .unwrap_or(Value::Null);
        children.insert(child.tag_name().name().to_string(), text);
    }
    let mut map = serde_json::Map::new();
    map.insert(root.tag_name().name().to_string(), Value::Object(children));
    Some(Value::Object(map))
}
