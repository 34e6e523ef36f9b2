//! Error types for client operations

use restype_core::Method;
use serde_json::Value;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with one of the route's declared error statuses
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: Value },

    /// The server answered with a status the route does not declare
    #[error("Fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: Value },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A successful body did not deserialize into the requested type
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// Query asked for a write route, or mutation for a read route
    #[error("Route '{key}' is a {method} route, use {expected}()")]
    AccessPattern {
        key: String,
        method: Method,
        expected: &'static str,
    },
}

impl ClientError {
    /// Response status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } | ClientError::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed response body of an HTTP-level failure
    pub fn body(&self) -> Option<&Value> {
        match self {
            ClientError::Http { body, .. } | ClientError::Fetch { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Transport-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_accessors() {
        let err = ClientError::Http {
            status: 404,
            body: json!({"message": "not found"}),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some(&json!({"message": "not found"})));
        assert_eq!(err.to_string(), r#"HTTP 404: {"message":"not found"}"#);

        let err: ClientError = TransportError::Timeout.into();
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Transport error: Request timed out");
    }

    #[test]
    fn test_access_pattern_message() {
        let err = ClientError::AccessPattern {
            key: "posts.create".to_string(),
            method: Method::Post,
            expected: "mutation",
        };
        assert_eq!(
            err.to_string(),
            "Route 'posts.create' is a POST route, use mutation()"
        );
    }
}
