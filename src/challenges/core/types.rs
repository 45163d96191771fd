//! Core data structures shared across signal extraction, solving, and orchestration layers.

use http::HeaderMap;
use serde_json::{Map, Value, json};

/// Uniform response shape produced by every [`ApiTransport`](super::ApiTransport).
///
/// A normalized response is always present: transport failures are represented
/// as a synthetic response with `status == 0` instead of an error.
#[derive(Debug, Clone, Default)]
pub struct NormalizedResponse {
    pub ok: bool,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Map<String, Value>,
}

impl NormalizedResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Map<String, Value>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            headers,
            body,
        }
    }

    /// Build a response from any JSON value, wrapping non-object payloads as `{"data": value}`.
    pub fn from_json(status: u16, headers: HeaderMap, value: Value) -> Self {
        Self::new(status, headers, body_from_value(value))
    }

    /// Synthetic response used when the request never produced an HTTP status.
    pub fn network_error(message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("error".into(), Value::String("network_error".into()));
        body.insert("message".into(), Value::String(message.into()));
        Self {
            ok: false,
            status: 0,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Case-insensitive header lookup returning the value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

pub(crate) fn body_from_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => match json!({ "data": other }) {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

/// Optional query pairs and JSON body attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_bodies_are_wrapped() {
        let response = NormalizedResponse::from_json(200, HeaderMap::new(), json!([1, 2]));
        assert!(response.ok);
        assert_eq!(response.body.get("data"), Some(&json!([1, 2])));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "30".parse().unwrap());
        let response = NormalizedResponse::new(429, headers, Map::new());
        assert!(!response.ok);
        assert_eq!(response.header("retry-after"), Some("30"));
        assert_eq!(response.header("RETRY-AFTER"), Some("30"));
    }

    #[test]
    fn network_error_has_status_zero() {
        let response = NormalizedResponse::network_error("connection refused");
        assert!(response.is_network_error());
        assert_eq!(response.body.get("error"), Some(&json!("network_error")));
    }
}
