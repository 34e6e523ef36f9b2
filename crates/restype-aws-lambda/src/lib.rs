//! AWS Lambda binding for restype contracts
//!
//! The single-function binding keeps the whole flattened route table in memory and
//! resolves method and path on every invocation, the way a catch-all route
//! (`/api/[...]`) works on function-per-deployment hosts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restype_aws_lambda::{LambdaConfig, LambdaRestHandler, init_tracing};
//! use restype_core::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_http::Error> {
//!     init_tracing();
//!
//!     let contract = Contract::new().leaf(
//!         "health",
//!         Route::get("/health").response(200, schema_fn(Ok)),
//!     );
//!     let handlers: HandlerTree<()> = HandlerTree::new().leaf(
//!         "health",
//!         handler_fn(|_args: RouteArgs<()>| async move {
//!             Ok(HandlerResult::new(200, json!({ "status": "ok" })))
//!         }),
//!     );
//!     let table = RouteTable::new(&contract, &handlers, None, DefaultContext)?;
//!
//!     LambdaRestHandler::new(Dispatcher::new(table))
//!         .with_config(LambdaConfig::with_prefix("/api"))
//!         .run()
//!         .await
//! }
//! ```

pub mod error;
pub mod handler;

pub use error::{LambdaError, Result};
pub use handler::{LambdaConfig, LambdaRestHandler};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Lambda captures stdout, so plain-text output without ANSI colours is used.
/// Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .without_time()
        .try_init();
}
