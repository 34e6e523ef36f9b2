//! Transport layer for the client
//!
//! The fetcher builds a [`TransportRequest`] and classifies the returned
//! [`TransportResponse`]; a transport only moves bytes.

use async_trait::async_trait;
use restype_core::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TransportError;

pub mod http;

pub use http::HttpTransport;

/// Fully resolved request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Absolute URL including the query string
    pub url: String,
    /// Lower-case header names
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// Raw response with the body already parsed
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Anything that can carry a request to a server and bring back the response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// Parse a response body: empty is `null`, anything that is not JSON becomes a string
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(b"  \n"), Value::Null);
        assert_eq!(parse_body(br#"{"id":1}"#), json!({"id": 1}));
        assert_eq!(parse_body(b"Bad Gateway"), json!("Bad Gateway"));
    }
}
