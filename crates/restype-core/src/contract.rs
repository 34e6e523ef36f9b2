//! Contract model: routes and the nested contract tree
//!
//! A [`Route`] is pure data. The request payload is modelled as a variant over the
//! method ([`RoutePayload`]) so a GET route can only carry a query schema and a
//! write route can only carry a body schema. The typestate [`RouteBuilder`] keeps
//! that rule at compile time: `.query(..)` exists only on [`Read`] builders and
//! `.body(..)` only on [`Write`] builders.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::PARAM_MARKER;
use crate::method::Method;
use crate::schema::SchemaRef;
use crate::status;
use crate::tree::Tree;

/// A nested, ordered tree of routes
pub type Contract = Tree<Route>;

/// Method-tagged request payload schema
#[derive(Debug, Clone)]
pub enum RoutePayload {
    Get { query: Option<SchemaRef> },
    Post { body: Option<SchemaRef> },
    Put { body: Option<SchemaRef> },
    Patch { body: Option<SchemaRef> },
    Delete { body: Option<SchemaRef> },
}

impl RoutePayload {
    pub fn method(&self) -> Method {
        match self {
            RoutePayload::Get { .. } => Method::Get,
            RoutePayload::Post { .. } => Method::Post,
            RoutePayload::Put { .. } => Method::Put,
            RoutePayload::Patch { .. } => Method::Patch,
            RoutePayload::Delete { .. } => Method::Delete,
        }
    }

    fn for_method(method: Method, schema: Option<SchemaRef>) -> Self {
        match method {
            Method::Get => RoutePayload::Get { query: schema },
            Method::Post => RoutePayload::Post { body: schema },
            Method::Put => RoutePayload::Put { body: schema },
            Method::Patch => RoutePayload::Patch { body: schema },
            Method::Delete => RoutePayload::Delete { body: schema },
        }
    }
}

/// Declared responses, ordered by status code
#[derive(Debug, Clone, Default)]
pub struct Responses {
    schemas: BTreeMap<u16, SchemaRef>,
}

impl Responses {
    pub fn get(&self, status: u16) -> Option<&SchemaRef> {
        self.schemas.get(&status)
    }

    pub fn contains(&self, status: u16) -> bool {
        self.schemas.contains_key(&status)
    }

    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.schemas.keys().copied()
    }

    /// Declared statuses in the successful family
    pub fn success_codes(&self) -> Vec<u16> {
        self.statuses().filter(|s| status::is_successful(*s)).collect()
    }

    /// Declared statuses in the error family
    pub fn error_codes(&self) -> Vec<u16> {
        self.statuses().filter(|s| status::is_error(*s)).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn insert(&mut self, status: u16, schema: SchemaRef) {
        self.schemas.insert(status, schema);
    }
}

/// One endpoint definition
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    payload: RoutePayload,
    responses: Responses,
    headers: Option<SchemaRef>,
    params: Option<SchemaRef>,
    meta: Option<Value>,
}

impl Route {
    pub fn get(path: impl Into<String>) -> RouteBuilder<Read> {
        RouteBuilder::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> RouteBuilder<Write> {
        RouteBuilder::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> RouteBuilder<Write> {
        RouteBuilder::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> RouteBuilder<Write> {
        RouteBuilder::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> RouteBuilder<Write> {
        RouteBuilder::new(Method::Delete, path)
    }

    pub fn method(&self) -> Method {
        self.payload.method()
    }

    /// The path template, e.g. `/posts/:id`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &RoutePayload {
        &self.payload
    }

    /// Query schema (GET routes only)
    pub fn query_schema(&self) -> Option<&SchemaRef> {
        match &self.payload {
            RoutePayload::Get { query } => query.as_ref(),
            _ => None,
        }
    }

    /// Body schema (write routes only)
    pub fn body_schema(&self) -> Option<&SchemaRef> {
        match &self.payload {
            RoutePayload::Get { .. } => None,
            RoutePayload::Post { body }
            | RoutePayload::Put { body }
            | RoutePayload::Patch { body }
            | RoutePayload::Delete { body } => body.as_ref(),
        }
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn headers_schema(&self) -> Option<&SchemaRef> {
        self.headers.as_ref()
    }

    pub fn params_schema(&self) -> Option<&SchemaRef> {
        self.params.as_ref()
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Path split on `/`, without the empty segment produced by the leading slash
    pub fn path_segments(&self) -> Vec<&str> {
        crate::matcher::split_path(&self.path)
    }

    /// Names of the `:param` segments in declaration order
    pub fn param_names(&self) -> Vec<&str> {
        self.path_segments()
            .into_iter()
            .filter_map(|segment| segment.strip_prefix(PARAM_MARKER))
            .collect()
    }
}

/// Builder state for GET routes
#[derive(Debug, Clone, Copy)]
pub struct Read;

/// Builder state for POST, PUT, PATCH and DELETE routes
#[derive(Debug, Clone, Copy)]
pub struct Write;

/// Typestate route builder, see [`Route::get`] and [`Route::post`]
pub struct RouteBuilder<K> {
    method: Method,
    path: String,
    payload: Option<SchemaRef>,
    responses: Responses,
    headers: Option<SchemaRef>,
    params: Option<SchemaRef>,
    meta: Option<Value>,
    _kind: PhantomData<K>,
}

impl<K> RouteBuilder<K> {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
            responses: Responses::default(),
            headers: None,
            params: None,
            meta: None,
            _kind: PhantomData,
        }
    }

    /// Declare the schema for a response status
    pub fn response(mut self, status: u16, schema: impl Into<SchemaRef>) -> Self {
        self.responses.insert(status, schema.into());
        self
    }

    pub fn headers(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.headers = Some(schema.into());
        self
    }

    /// Schema applied to the raw extracted path parameters
    pub fn params(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.params = Some(schema.into());
        self
    }

    /// Opaque metadata carried alongside the route
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn build(self) -> Route {
        Route {
            path: self.path,
            payload: RoutePayload::for_method(self.method, self.payload),
            responses: self.responses,
            headers: self.headers,
            params: self.params,
            meta: self.meta,
        }
    }
}

impl RouteBuilder<Read> {
    pub fn query(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.payload = Some(schema.into());
        self
    }
}

impl RouteBuilder<Write> {
    pub fn body(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.payload = Some(schema.into());
        self
    }
}

impl<K> From<RouteBuilder<K>> for Route {
    fn from(builder: RouteBuilder<K>) -> Self {
        builder.build()
    }
}

impl<K> fmt::Debug for RouteBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
