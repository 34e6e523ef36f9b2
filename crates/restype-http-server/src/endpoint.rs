//! Conversion between axum requests/responses and the engine's request/reply

use std::sync::Arc;

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{Path, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use restype_core::{Endpoint, InboundRequest, Method, Reply, parse_json_body};
use serde_json::{Map, Value};
use tracing::debug;

/// Path parameters as axum hands them over: `(host name, raw value)` in path order
pub(crate) type HostParams = Option<Path<Vec<(String, String)>>>;

/// Serve one request for a pre-resolved endpoint.
///
/// `names` maps the host's positional parameter names (`p0`, `p1`, ...) back to
/// the names declared in the route template.
pub(crate) async fn serve<C: Send + 'static>(
    endpoint: Endpoint<C>,
    names: Arc<[String]>,
    max_body_size: usize,
    params: HostParams,
    request: Request,
) -> Response {
    let inbound = match into_inbound(request, max_body_size).await {
        Ok(inbound) => inbound,
        Err(reply) => return into_response(reply),
    };

    let params = params
        .map(|Path(pairs)| rename_params(pairs, &names))
        .unwrap_or_default();

    into_response(endpoint.call(inbound, params).await)
}

fn rename_params(pairs: Vec<(String, String)>, names: &[String]) -> Map<String, Value> {
    pairs
        .into_iter()
        .filter_map(|(host_name, value)| {
            let index: usize = host_name.strip_prefix('p')?.parse().ok()?;
            let name = names.get(index)?;
            Some((name.clone(), Value::String(value)))
        })
        .collect()
}

/// Build an [`InboundRequest`] from an axum request.
///
/// An empty body becomes `None`; a body that is not JSON is answered with 400
/// `{"error":"invalid_json"}` and one over the size limit with 413.
pub async fn into_inbound(
    request: Request,
    max_body_size: usize,
) -> Result<InboundRequest, Reply> {
    let (parts, body) = request.into_parts();

    // HEAD and friends are routed to GET handlers by axum; they never match here
    let Ok(method) = Method::try_from(&parts.method) else {
        debug!("Unsupported method {} for {}", parts.method, parts.uri.path());
        return Err(Reply::not_found());
    };

    let mut inbound = InboundRequest::new(method, parts.uri.path());
    if let Some(query) = parts.uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            inbound.insert_query(key, value);
        }
    }
    for (name, value) in parts.headers.iter() {
        match value.to_str() {
            Ok(value) => inbound.insert_header(name.as_str(), value),
            Err(_) => debug!("Skipping non-text header {}", name),
        }
    }

    let bytes = to_bytes(body, max_body_size).await.map_err(|e| {
        debug!("Failed to read request body: {}", e);
        Reply::empty(StatusCode::PAYLOAD_TOO_LARGE.as_u16())
    })?;
    inbound.set_body(parse_json_body(&bytes)?);

    Ok(inbound.with_extensions(parts.extensions))
}

/// Write a [`Reply`] as an axum response; bodies are sent as JSON
pub fn into_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match reply.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

/// 404 with an empty body
pub(crate) async fn not_found() -> Response {
    into_response(Reply::not_found())
}
