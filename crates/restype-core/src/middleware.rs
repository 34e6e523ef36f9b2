//! Per-route middleware chain
//!
//! Each middleware returns a [`Next`] decision instead of calling a continuation,
//! so it can proceed at most once by construction. A chain that halts has already
//! produced the terminal [`Reply`]; the engine stops and never writes a second one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::request::{InboundRequest, Reply};
use crate::tree::Tree;

/// Decision returned by a middleware
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    /// Continue with the next middleware (or validation and the handler)
    Proceed,
    /// End the request with this reply
    Halt(Reply),
}

/// A pre-handler step for one route
///
/// # Examples
///
/// ```rust
/// use restype_core::{InboundRequest, Middleware, Next, Reply};
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// struct RequireAuth;
///
/// #[async_trait]
/// impl Middleware for RequireAuth {
///     async fn handle(&self, request: &mut InboundRequest) -> Next {
///         match request.header("authorization") {
///             Some(_) => Next::Proceed,
///             None => Next::Halt(Reply::new(401, json!({"message": "unauthorized"}))),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Inspect (and optionally mutate) the request, then decide
    async fn handle(&self, request: &mut InboundRequest) -> Next;
}

pub type SharedMiddleware = Arc<dyn Middleware>;

/// Middleware tree mirroring a contract; each leaf is an ordered list
pub type MiddlewareTree = Tree<Vec<SharedMiddleware>>;

/// How a chain run ended
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Every middleware proceeded
    Completed,
    /// Middleware number `at` halted with `reply`
    Halted { at: usize, reply: Reply },
}

/// Ordered middleware for one flattened route
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middleware: Vec<SharedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append middleware; it runs after everything already in the chain
    pub fn push(&mut self, middleware: SharedMiddleware) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run the chain strictly in order, awaiting each decision before advancing
    pub async fn run(&self, request: &mut InboundRequest) -> ChainOutcome {
        let mut index = 0;
        while index < self.middleware.len() {
            match self.middleware[index].handle(request).await {
                Next::Proceed => index += 1,
                Next::Halt(reply) => {
                    debug!(
                        "Middleware {} halted {} {} with status {}",
                        index,
                        request.method(),
                        request.path(),
                        reply.status
                    );
                    return ChainOutcome::Halted { at: index, reply };
                }
            }
        }
        ChainOutcome::Completed
    }
}

impl From<Vec<SharedMiddleware>> for MiddlewareChain {
    fn from(middleware: Vec<SharedMiddleware>) -> Self {
        Self { middleware }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middleware.len())
            .finish()
    }
}

struct FnMiddleware<F> {
    decide: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut InboundRequest) -> Next + Send + Sync,
{
    async fn handle(&self, request: &mut InboundRequest) -> Next {
        (self.decide)(request)
    }
}

/// Wrap a synchronous closure as middleware
pub fn middleware_fn<F>(decide: F) -> SharedMiddleware
where
    F: Fn(&mut InboundRequest) -> Next + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { decide })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use serde_json::json;
    use parking_lot::Mutex;

    fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SharedMiddleware {
        middleware_fn(move |_request| {
            log.lock().push(name);
            Next::Proceed
        })
    }

    #[tokio::test]
    async fn test_runs_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::from(vec![
            recorder(log.clone(), "first"),
            recorder(log.clone(), "second"),
            recorder(log.clone(), "third"),
        ]);

        let mut request = InboundRequest::new(Method::Get, "/");
        assert_eq!(chain.run(&mut request).await, ChainOutcome::Completed);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_halt_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.push(recorder(log.clone(), "logger"));
        chain.push(middleware_fn(|_request| {
            Next::Halt(Reply::new(401, json!({"message": "unauthorized"})))
        }));
        chain.push(recorder(log.clone(), "never"));

        let mut request = InboundRequest::new(Method::Get, "/");
        let outcome = chain.run(&mut request).await;

        assert_eq!(
            outcome,
            ChainOutcome::Halted {
                at: 1,
                reply: Reply::new(401, json!({"message": "unauthorized"})),
            }
        );
        assert_eq!(*log.lock(), vec!["logger"]);
    }

    #[tokio::test]
    async fn test_middleware_can_mutate_request() {
        let chain = MiddlewareChain::from(vec![middleware_fn(|request| {
            request.insert_header("x-authenticated", "yes");
            Next::Proceed
        })]);

        let mut request = InboundRequest::new(Method::Get, "/");
        chain.run(&mut request).await;
        assert_eq!(request.header("x-authenticated"), Some("yes"));
    }

    #[tokio::test]
    async fn test_empty_chain_completes() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        let mut request = InboundRequest::new(Method::Delete, "/x");
        assert_eq!(chain.run(&mut request).await, ChainOutcome::Completed);
    }
}
