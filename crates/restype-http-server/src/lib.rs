//! # Restype HTTP Server
//!
//! Registration-style binding: every flattened contract route is installed as its
//! own route in an axum [`Router`](axum::Router). The host router does the matching
//! and hands the engine already-extracted path parameters, so only steps after the
//! match (middleware, validation, context, handler, response checks) run per call.
//!
//! ```rust,no_run
//! use restype_core::prelude::*;
//! use restype_http_server::RestServer;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let contract = Contract::new().leaf(
//!     "health",
//!     Route::get("/health").response(200, schema_fn(Ok)),
//! );
//! let handlers: HandlerTree<()> = HandlerTree::new().leaf(
//!     "health",
//!     handler_fn(|_args: RouteArgs<()>| async move {
//!         Ok(HandlerResult::new(200, json!({ "status": "ok" })))
//!     }),
//! );
//!
//! let dispatcher = Dispatcher::new(RouteTable::new(&contract, &handlers, None, DefaultContext)?);
//! RestServer::builder(dispatcher)
//!     .bind_address("0.0.0.0:8080".parse()?)
//!     .build()?
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod endpoint;
pub mod prelude;
pub mod registrar;
pub mod server;

#[cfg(test)]
mod tests;

pub use registrar::{AxumRegistrar, RouteRegistrar, install};
pub use server::{RestServer, RestServerBuilder, ServerConfig};

/// Result type for the HTTP binding
pub type Result<T> = std::result::Result<T, ServerError>;

/// HTTP binding errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Contract error: {0}")]
    Contract(#[from] restype_core::ContractError),

    /// The host router refused a template
    #[error("Route '{template}' could not be registered: {reason}")]
    RouteConflict { template: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
