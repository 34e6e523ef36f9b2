//! Dispatch engine shared by every host binding
//!
//! For one request: match, run middleware, validate the request slots, create the
//! context, invoke the handler, check the result against the declared responses,
//! reply. The single-function form ([`Dispatcher::dispatch`]) performs the match
//! itself; registration-style hosts resolve the route on their own and call
//! [`Endpoint::call`] with host-extracted parameters.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::error::HandlerFault;
use crate::flatten::{FlatRouteEntry, RouteTable};
use crate::handler::{HandlerResult, RouteArgs};
use crate::matcher::split_path;
use crate::method::Method;
use crate::middleware::ChainOutcome;
use crate::request::{InboundRequest, Reply};
use crate::schema::{ValidationFailure, validate};

/// Request slot that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Headers,
    Params,
    Query,
    Body,
}

/// A request rejected by the validator, answered with 400
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRejection {
    pub location: Location,
    #[serde(flatten)]
    pub failure: ValidationFailure,
}

impl RequestRejection {
    pub fn new(location: Location, failure: ValidationFailure) -> Self {
        Self { location, failure }
    }

    /// `{"error":"validation_failed","location":..,"issues":[..]}`
    pub fn into_reply(self) -> Reply {
        let mut body = json!({ "error": "validation_failed" });
        if let (Some(object), Ok(Value::Object(detail))) =
            (body.as_object_mut(), serde_json::to_value(&self))
        {
            object.extend(detail);
        }
        Reply::bad_request(body)
    }
}

type FaultHandler = Arc<dyn Fn(&HandlerFault) -> Reply + Send + Sync>;

/// Runs requests against a flattened route table
pub struct Dispatcher<C> {
    table: Arc<RouteTable<C>>,
    fault_handler: Option<FaultHandler>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            fault_handler: self.fault_handler.clone(),
        }
    }
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .field("fault_handler", &self.fault_handler.is_some())
            .finish()
    }
}

impl<C: Send + 'static> Dispatcher<C> {
    pub fn new(table: RouteTable<C>) -> Self {
        Self::from_shared(Arc::new(table))
    }

    pub fn from_shared(table: Arc<RouteTable<C>>) -> Self {
        Self {
            table,
            fault_handler: None,
        }
    }

    /// Turn handler faults into a custom reply instead of the opaque 500.
    ///
    /// The fault is still logged before the hook runs.
    pub fn with_fault_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HandlerFault) -> Reply + Send + Sync + 'static,
    {
        self.fault_handler = Some(Arc::new(handler));
        self
    }

    pub fn table(&self) -> &Arc<RouteTable<C>> {
        &self.table
    }

    /// One pre-resolved endpoint per table entry, for registration-style hosts
    pub fn endpoints(&self) -> Vec<Endpoint<C>> {
        (0..self.table.len())
            .map(|index| Endpoint {
                dispatcher: self.clone(),
                index,
            })
            .collect()
    }

    /// Match `request` against the table, then execute the entry
    pub async fn dispatch(&self, request: InboundRequest) -> Reply {
        let found = {
            let segments = split_path(request.path());
            self.table
                .find(request.method(), &segments)
                .map(|found| (found.entry, found.params))
        };

        match found {
            Some((entry, params)) => {
                debug!(
                    "Matched {} {} to '{}'",
                    request.method(),
                    request.path(),
                    entry.key()
                );
                self.execute(entry, request, params).await
            }
            None => {
                debug!("No route for {} {}", request.method(), request.path());
                Reply::not_found()
            }
        }
    }

    /// Run middleware, validation, context, handler and response checks for a
    /// resolved entry. `raw_params` are the uncoerced path parameters.
    pub async fn execute(
        &self,
        entry: &FlatRouteEntry<C>,
        mut request: InboundRequest,
        raw_params: Map<String, Value>,
    ) -> Reply {
        if let ChainOutcome::Halted { reply, .. } = entry.middleware().run(&mut request).await {
            return reply;
        }

        let (params, query, headers, body) = match validate_request(entry, &request, raw_params) {
            Ok(slots) => slots,
            Err(rejection) => {
                debug!(
                    "Rejected request for '{}' at {:?}: {}",
                    entry.key(),
                    rejection.location,
                    rejection.failure
                );
                return rejection.into_reply();
            }
        };

        let invocation = AssertUnwindSafe(async {
            let ctx = entry
                .context()
                .create(&request)
                .await
                .map_err(HandlerFault::Context)?;
            let args = RouteArgs {
                ctx,
                params,
                query,
                headers,
                body,
            };
            entry
                .handler()
                .handle(args)
                .await
                .map_err(HandlerFault::Handler)
        })
        .catch_unwind()
        .await;

        let result = match invocation {
            Ok(Ok(result)) => result,
            Ok(Err(fault)) => return self.fault(entry, fault),
            Err(panic) => return self.fault(entry, HandlerFault::Panicked(panic_message(&*panic))),
        };

        match check_response(entry, &result) {
            Ok(()) => Reply::new(result.status, result.body),
            Err(fault) => self.fault(entry, fault),
        }
    }

    fn fault(&self, entry: &FlatRouteEntry<C>, fault: HandlerFault) -> Reply {
        error!("Handler fault in '{}': {}", entry.key(), fault);
        match &self.fault_handler {
            Some(handler) => handler(&fault),
            None => Reply::internal_error(),
        }
    }
}

type RequestSlots = (Value, Option<Value>, Value, Option<Value>);

fn validate_request<C>(
    entry: &FlatRouteEntry<C>,
    request: &InboundRequest,
    raw_params: Map<String, Value>,
) -> Result<RequestSlots, RequestRejection> {
    let route = entry.route();

    let headers = validate(
        route.headers_schema(),
        Value::Object(request.headers().clone()),
    )
    .map_err(|failure| RequestRejection::new(Location::Headers, failure))?;

    let params = validate(route.params_schema(), Value::Object(raw_params))
        .map_err(|failure| RequestRejection::new(Location::Params, failure))?;

    if route.method() == Method::Get {
        let query = validate(route.query_schema(), Value::Object(request.query().clone()))
            .map_err(|failure| RequestRejection::new(Location::Query, failure))?;
        return Ok((params, Some(query), headers, None));
    }

    let body = match route.body_schema() {
        // An absent body is checked as `null` so required bodies are rejected
        Some(schema) => Some(
            schema
                .validate(request.body().cloned().unwrap_or(Value::Null))
                .map_err(|failure| RequestRejection::new(Location::Body, failure))?,
        ),
        None => request.body().cloned(),
    };

    Ok((params, None, headers, body))
}

fn check_response<C>(entry: &FlatRouteEntry<C>, result: &HandlerResult) -> Result<(), HandlerFault> {
    let schema = entry
        .route()
        .responses()
        .get(result.status)
        .ok_or(HandlerFault::UndeclaredStatus {
            status: result.status,
        })?;

    // The coerced value only decides acceptance, the handler's body is sent as is
    schema
        .validate(result.body.clone())
        .map(|_| ())
        .map_err(|failure| HandlerFault::InvalidResponse {
            status: result.status,
            failure,
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// One table entry bound to its dispatcher.
///
/// Registration-style hosts install one endpoint per route and call it with the
/// parameters their own router extracted.
pub struct Endpoint<C> {
    dispatcher: Dispatcher<C>,
    index: usize,
}

impl<C> Clone for Endpoint<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            index: self.index,
        }
    }
}

impl<C> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("index", &self.index)
            .field("entry", &self.dispatcher.table.entry(self.index))
            .finish()
    }
}

impl<C: Send + 'static> Endpoint<C> {
    pub fn entry(&self) -> Option<&FlatRouteEntry<C>> {
        self.dispatcher.table.entry(self.index)
    }

    pub fn method(&self) -> Option<Method> {
        self.entry().map(FlatRouteEntry::method)
    }

    pub fn template(&self) -> Option<&str> {
        self.entry().map(FlatRouteEntry::template)
    }

    /// Execute this endpoint, skipping the segment match
    pub async fn call(&self, request: InboundRequest, params: Map<String, Value>) -> Reply {
        match self.entry() {
            Some(entry) => self.dispatcher.execute(entry, request, params).await,
            None => Reply::not_found(),
        }
    }
}
