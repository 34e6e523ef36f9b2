//! Error types for the Lambda binding

use thiserror::Error;

/// Result type for Lambda operations
pub type Result<T> = std::result::Result<T, LambdaError>;

/// Lambda binding errors
#[derive(Error, Debug)]
pub enum LambdaError {
    /// Building the Lambda response failed
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Contract could not be turned into a route table
    #[error("Contract error: {0}")]
    Contract(#[from] restype_core::ContractError),
}
