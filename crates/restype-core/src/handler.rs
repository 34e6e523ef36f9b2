//! Handler and context-factory seams

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BoxError;
use crate::request::InboundRequest;
use crate::tree::Tree;

/// Per-request arguments handed to a route handler.
///
/// `params`, `query`, `headers` and `body` hold the values returned by the
/// validator, so any coercion has already been applied. `query` is only ever set
/// for GET routes and `body` only for write routes.
#[derive(Debug)]
pub struct RouteArgs<C> {
    pub ctx: C,
    pub params: Value,
    pub query: Option<Value>,
    pub headers: Value,
    pub body: Option<Value>,
}

impl<C> RouteArgs<C> {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Path parameter as text, when it is (still) a string
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase())
            .and_then(Value::as_str)
    }

    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.body.as_ref().unwrap_or(&Value::Null))
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.query.as_ref().unwrap_or(&Value::Null))
    }
}

/// What a handler answers with. `status` must be declared in the route's responses.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub status: u16,
    pub body: Value,
}

impl HandlerResult {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Serialize `body` into a result
    pub fn json<T: Serialize + ?Sized>(status: u16, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(status, serde_json::to_value(body)?))
    }
}

/// Implementation of one contract route
#[async_trait]
pub trait RouteHandler<C>: Send + Sync {
    async fn handle(&self, args: RouteArgs<C>) -> Result<HandlerResult, BoxError>;
}

pub type BoxedHandler<C> = Arc<dyn RouteHandler<C>>;

/// Handler tree mirroring a contract
pub type HandlerTree<C> = Tree<BoxedHandler<C>>;

/// Function-based route handler
pub struct FnHandler<C, F> {
    handler: F,
    _ctx: PhantomData<fn(C)>,
}

#[async_trait]
impl<C, F, Fut> RouteHandler<C> for FnHandler<C, F>
where
    C: Send + 'static,
    F: Fn(RouteArgs<C>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResult, BoxError>> + Send + 'static,
{
    async fn handle(&self, args: RouteArgs<C>) -> Result<HandlerResult, BoxError> {
        (self.handler)(args).await
    }
}

/// Wrap an async closure as a [`BoxedHandler`]
pub fn handler_fn<C, F, Fut>(handler: F) -> BoxedHandler<C>
where
    C: Send + 'static,
    F: Fn(RouteArgs<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResult, BoxError>> + Send + 'static,
{
    Arc::new(FnHandler {
        handler,
        _ctx: PhantomData,
    })
}

/// Produces a fresh context for every request
#[async_trait]
pub trait ContextFactory<C>: Send + Sync {
    async fn create(&self, request: &InboundRequest) -> Result<C, BoxError>;
}

pub type SharedContextFactory<C> = Arc<dyn ContextFactory<C>>;

/// Context factory for any `C: Default`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContext;

#[async_trait]
impl<C> ContextFactory<C> for DefaultContext
where
    C: Default + Send + 'static,
{
    async fn create(&self, _request: &InboundRequest) -> Result<C, BoxError> {
        Ok(C::default())
    }
}

/// Function-based context factory
pub struct FnContext<F> {
    factory: F,
}

impl<F> fmt::Debug for FnContext<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnContext").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C, F, Fut> ContextFactory<C> for FnContext<F>
where
    C: Send + 'static,
    F: Fn(&InboundRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<C, BoxError>> + Send + 'static,
{
    async fn create(&self, request: &InboundRequest) -> Result<C, BoxError> {
        (self.factory)(request).await
    }
}

/// Wrap a closure as a context factory.
///
/// The closure receives the request synchronously and returns a future, so pull
/// whatever it needs out of the request before the `async` block.
///
/// ```rust
/// use restype_core::{context_fn, BoxError, InboundRequest};
///
/// #[derive(Clone)]
/// struct Ctx {
///     user: Option<String>,
/// }
///
/// let factory = context_fn(|request: &InboundRequest| {
///     let user = request.header("x-user").map(str::to_owned);
///     async move { Ok::<_, BoxError>(Ctx { user }) }
/// });
/// # let _ = factory;
/// ```
pub fn context_fn<F>(factory: F) -> FnContext<F> {
    FnContext { factory }
}
