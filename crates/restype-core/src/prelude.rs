//! # Restype Core Prelude
//!
//! Re-exports of the types needed to declare a contract and serve it.
//!
//! ```rust
//! use restype_core::prelude::*;
//! ```

// Contract model
pub use crate::contract::{Contract, Responses, Route, RoutePayload};
pub use crate::method::Method;
pub use crate::tree::{Node, Tree};

// Validation
#[cfg(feature = "json-schema")]
pub use crate::json_schema::JsonSchema;
pub use crate::schema::{Schema, SchemaRef, ValidationFailure, ValidationIssue, schema_fn};

// Serving
pub use crate::dispatch::Dispatcher;
pub use crate::flatten::RouteTable;
pub use crate::handler::{
    ContextFactory, DefaultContext, HandlerResult, HandlerTree, RouteArgs, RouteHandler,
    context_fn, handler_fn,
};
pub use crate::middleware::{Middleware, MiddlewareTree, Next, middleware_fn};
pub use crate::request::{InboundRequest, Reply};

// Error types
pub use crate::error::{BoxError, ContractError, HandlerFault};
