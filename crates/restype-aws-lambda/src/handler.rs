//! Lambda request handler
//!
//! Converts each `lambda_http` event into an [`InboundRequest`], dispatches it
//! through the in-memory route table and converts the [`Reply`] back.

use lambda_http::{
    Body as LambdaBody, Request as LambdaRequest, RequestExt, Response as LambdaResponse,
    service_fn,
};
use restype_core::{Dispatcher, InboundRequest, Method, Reply, parse_json_body};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;

/// Configuration for the Lambda binding
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LambdaConfig {
    /// Path prefix owned by the function (e.g. `/api`), stripped before matching.
    /// Requests outside it get a 404.
    pub route_prefix: String,
}

impl LambdaConfig {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            route_prefix: prefix.into(),
        }
    }
}

/// Single entry point serving every route of a contract
pub struct LambdaRestHandler<C> {
    dispatcher: Dispatcher<C>,
    config: LambdaConfig,
}

impl<C> Clone for LambdaRestHandler<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Send + 'static> LambdaRestHandler<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            dispatcher,
            config: LambdaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LambdaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LambdaConfig {
        &self.config
    }

    /// Handle one Lambda HTTP event
    pub async fn handle(&self, request: LambdaRequest) -> Result<LambdaResponse<LambdaBody>> {
        let reply = match self.to_inbound(request) {
            Ok(inbound) => self.dispatcher.dispatch(inbound).await,
            Err(reply) => reply,
        };
        to_lambda_response(reply)
    }

    /// Serve invocations until the runtime shuts down
    pub async fn run(self) -> std::result::Result<(), lambda_http::Error> {
        info!(
            "Starting Lambda handler with {} routes",
            self.dispatcher.table().len()
        );

        lambda_http::run(service_fn(move |request| {
            let handler = self.clone();
            async move {
                handler
                    .handle(request)
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            }
        }))
        .await
    }

    fn to_inbound(&self, request: LambdaRequest) -> std::result::Result<InboundRequest, Reply> {
        let Ok(method) = Method::try_from(request.method()) else {
            debug!("Unsupported method {}", request.method());
            return Err(Reply::not_found());
        };

        let Some(path) = strip_prefix(request.uri().path(), &self.config.route_prefix) else {
            debug!(
                "Path {} is outside route prefix '{}'",
                request.uri().path(),
                self.config.route_prefix
            );
            return Err(Reply::not_found());
        };

        let mut inbound = InboundRequest::new(method, path);

        let query = request.query_string_parameters();
        if query.is_empty() {
            // Events built without API Gateway metadata only carry the raw URI
            if let Some(raw) = request.uri().query() {
                for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                    inbound.insert_query(key, value);
                }
            }
        } else {
            for (key, value) in query.iter() {
                inbound.insert_query(key, value);
            }
        }

        for (name, value) in request.headers() {
            if let Ok(value) = value.to_str() {
                inbound.insert_header(name.as_str(), value);
            }
        }

        let (parts, body) = request.into_parts();
        inbound.set_body(parse_body(body)?);

        // Lambda request context travels in the extensions for context factories
        Ok(inbound.with_extensions(parts.extensions))
    }
}

fn strip_prefix(path: &str, prefix: &str) -> Option<String> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path.to_string());
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

fn parse_body(body: LambdaBody) -> std::result::Result<Option<Value>, Reply> {
    let bytes = match body {
        LambdaBody::Empty => return Ok(None),
        LambdaBody::Text(text) => text.into_bytes(),
        LambdaBody::Binary(bytes) => bytes,
        _ => return Ok(None),
    };

    parse_json_body(&bytes)
}

fn to_lambda_response(reply: Reply) -> Result<LambdaResponse<LambdaBody>> {
    let builder = LambdaResponse::builder().status(reply.status);
    let response = match reply.body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(LambdaBody::Text(serde_json::to_string(&body)?))?,
        None => builder.body(LambdaBody::Empty)?,
    };

    debug!("Lambda response status {}", response.status());
    Ok(response)
}
