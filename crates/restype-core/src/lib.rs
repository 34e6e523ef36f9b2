//! # Restype Core
//!
//! A transport-agnostic contract layer for HTTP APIs. A single declarative
//! [`Contract`] describes every route (method, path template, request schemas and
//! the full set of response schemas keyed by status code). Server bindings and the
//! client are built on top of the pieces in this crate.
//!
//! ## Components
//! - **Contract model**: [`Route`], [`Contract`] and the generic keyed [`Tree`]
//! - **Validator gateway**: the [`Schema`] capability and [`validate`]
//! - **Flattener**: walks contract, handler and middleware trees into a [`RouteTable`]
//! - **Path matcher**: first-declared-wins template matching with raw parameter extraction
//! - **Middleware runner**: an ordered, cooperative [`MiddlewareChain`]
//! - **Dispatch engine**: [`Dispatcher`], shared by every host binding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restype_core::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let contract = Contract::new().leaf(
//!     "getItem",
//!     Route::get("/item/:id")
//!         .response(200, schema_fn(Ok))
//!         .response(404, schema_fn(Ok)),
//! );
//!
//! let handlers: HandlerTree<()> = HandlerTree::new().leaf(
//!     "getItem",
//!     handler_fn(|args: RouteArgs<()>| async move {
//!         let id = args.param_str("id").unwrap_or_default().to_owned();
//!         Ok(HandlerResult::new(200, json!({ "id": id })))
//!     }),
//! );
//!
//! let table = RouteTable::new(&contract, &handlers, None, DefaultContext)?;
//! let dispatcher = Dispatcher::new(table);
//!
//! let reply = dispatcher
//!     .dispatch(InboundRequest::new(Method::Get, "/item/42"))
//!     .await;
//! assert_eq!(reply.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod contract;
pub mod dispatch;
pub mod error;
pub mod flatten;
pub mod handler;
#[cfg(feature = "json-schema")]
pub mod json_schema;
pub mod matcher;
pub mod method;
pub mod middleware;
pub mod prelude;
pub mod request;
pub mod schema;
pub mod status;
pub mod tree;

// Re-export main types
pub use contract::{Contract, Read, Responses, Route, RouteBuilder, RoutePayload, Write};
pub use dispatch::{Dispatcher, Endpoint, Location, RequestRejection};
pub use error::{BoxError, ContractError, HandlerFault, Result};
pub use flatten::{FlatRouteEntry, RouteTable, RouteTableBuilder, Segment};
pub use handler::{
    BoxedHandler, ContextFactory, DefaultContext, HandlerResult, HandlerTree, RouteArgs,
    RouteHandler, SharedContextFactory, context_fn, handler_fn,
};
#[cfg(feature = "json-schema")]
pub use json_schema::JsonSchema;
pub use matcher::{RouteMatch, split_path};
pub use method::Method;
pub use middleware::{
    ChainOutcome, Middleware, MiddlewareChain, MiddlewareTree, Next, SharedMiddleware,
    middleware_fn,
};
pub use request::{InboundRequest, Reply, parse_json_body};
pub use schema::{Schema, SchemaRef, ValidationFailure, ValidationIssue, schema_fn, validate};
pub use tree::{Node, Tree};

/// Marker that introduces a parameter segment in a path template (`/item/:id`)
pub const PARAM_MARKER: char = ':';
