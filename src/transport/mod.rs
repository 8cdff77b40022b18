// ============================================================================
// File: packages/rerobots/src/transport/mod.rs
// ----------------------------------------------------------------------------
// Request/response seam between the API client and the HTTP stack.
//
// The API client only ever speaks in `ApiRequest` / `ApiResponse`; the
// concrete gateway (blocking HTTP, or an in-memory mock in tests) sits behind
// the `Transport` trait.
// ============================================================================

mod blocking;

pub use blocking::HttpTransport;

use http::{Method, StatusCode};
use serde_json::Value;

use crate::error::RerobotsResult;

/// One API call, relative to the gateway's base URI
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<P: Into<String>>(path: P) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete<P: Into<String>>(path: P) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and parsed body of an API call
///
/// Bodies that are not JSON are carried as `Value::String`; empty bodies are
/// `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Human-readable message carried by an error response
    pub fn message(&self) -> String {
        for key in ["error_message", "result_message", "message"] {
            if let Some(msg) = self.body.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
        match &self.body {
            Value::String(text) => text.clone(),
            Value::Null => self
                .status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string(),
            other => other.to_string(),
        }
    }
}

/// Authenticated request/response primitive
///
/// Implementations return every HTTP status as `Ok`; only failures that never
/// produced a status (DNS, TLS, connection reset) are errors.
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn send(&self, request: &ApiRequest, token: Option<&str>) -> RerobotsResult<ApiResponse>;
}

/// Parse a response body: JSON when possible, raw text otherwise
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
