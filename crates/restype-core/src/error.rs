//! Error taxonomy for contract construction and request handling

use thiserror::Error;

use crate::schema::ValidationFailure;

/// Boxed error type returned by user-supplied handlers and context factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for contract construction
pub type Result<T> = std::result::Result<T, ContractError>;

/// Construction-time errors. These are never recovered from: a contract that
/// fails to flatten must prevent the service from starting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Contract, handler and middleware trees disagree in shape
    #[error("Shape mismatch at '{key_path}': {reason}")]
    ShapeMismatch { key_path: String, reason: String },

    /// A route path template could not be parsed
    #[error("Invalid path template '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// HTTP method outside GET/POST/PUT/PATCH/DELETE
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A schema document could not be compiled
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl ContractError {
    /// Create a shape mismatch error for the given key path
    pub fn shape_mismatch(key_path: &[String], reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            key_path: key_path.join("."),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A handler broke its contract with the dispatch engine.
///
/// Every variant is answered with an opaque 500; the detail carried here is for
/// server-side logs only and must never reach the client.
#[derive(Debug, Error)]
pub enum HandlerFault {
    /// The context factory returned an error
    #[error("Context creation failed: {0}")]
    Context(#[source] BoxError),

    /// The handler returned an error
    #[error("Handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The handler (or context factory) panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The handler answered with a status its route does not declare
    #[error("Handler returned undeclared status {status}")]
    UndeclaredStatus { status: u16 },

    /// The response body was rejected by the schema registered for its status
    #[error("Response body for status {status} failed validation: {failure}")]
    InvalidResponse {
        status: u16,
        failure: ValidationFailure,
    },
}

impl HandlerFault {
    /// Status the handler attempted to send, when known
    pub fn attempted_status(&self) -> Option<u16> {
        match self {
            Self::UndeclaredStatus { status } | Self::InvalidResponse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
