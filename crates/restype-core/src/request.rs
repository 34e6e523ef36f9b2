//! Host-neutral inbound request and outbound reply

use serde_json::{Map, Value};

use crate::method::Method;

/// One inbound request as seen by the dispatch engine.
///
/// Header names are lowercased on insertion. Query values arrive as strings and a
/// repeated key keeps the last value. Hosts can attach their own request/response
/// handles through [`extensions`](InboundRequest::extensions_mut).
#[derive(Debug)]
pub struct InboundRequest {
    method: Method,
    path: String,
    query: Map<String, Value>,
    headers: Map<String, Value>,
    body: Option<Value>,
    extensions: http::Extensions,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Map::new(),
            headers: Map::new(),
            body: None,
            extensions: http::Extensions::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_query(key, value);
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_extensions(mut self, extensions: http::Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn insert_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.insert(key.into(), Value::String(value.into()));
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers.insert(
            name.as_ref().to_ascii_lowercase(),
            Value::String(value.into()),
        );
    }

    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn headers(&self) -> &Map<String, Value> {
        &self.headers
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(Value::as_str)
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }
}

/// Terminal response produced by the engine or by a halting middleware
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// Reply with no body
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// 404 with an empty body
    pub fn not_found() -> Self {
        Self::empty(404)
    }

    /// Opaque 500, never carries internal detail
    pub fn internal_error() -> Self {
        Self::empty(500)
    }

    pub fn bad_request(body: Value) -> Self {
        Self::new(400, body)
    }
}

/// Decode a raw request body the same way for every host. Empty or
/// whitespace-only input is no body; anything else must be JSON or the request
/// is answered with 400 `{"error":"invalid_json"}`.
pub fn parse_json_body(bytes: &[u8]) -> Result<Option<Value>, Reply> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|_| Reply::bad_request(serde_json::json!({ "error": "invalid_json" })))
}
