//! Request building and result classification

use restype_core::{PARAM_MARKER, Route};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{SharedTransport, TransportRequest};

const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Shared request machinery behind every endpoint
#[derive(Clone)]
pub(crate) struct Fetcher {
    config: ClientConfig,
    transport: SharedTransport,
}

/// Everything one call contributes to a request
#[derive(Debug, Default)]
pub(crate) struct CallParts<'a> {
    pub params: Option<&'a BTreeMap<String, String>>,
    pub query: Option<&'a BTreeMap<String, String>>,
    pub headers: Option<&'a BTreeMap<String, String>>,
    pub body: Option<Value>,
}

impl Fetcher {
    pub(crate) fn new(config: ClientConfig, transport: SharedTransport) -> Self {
        Self { config, transport }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue one request for `route` and classify the answer
    pub(crate) async fn fetch(&self, key: &str, route: &Route, call: CallParts<'_>) -> Result<Value> {
        let path = insert_params(route.path(), call.params);
        let url = format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            path,
            query_string(call.query)
        );

        let request = TransportRequest {
            method: route.method(),
            url,
            headers: merge_headers(&self.config.base_headers, call.headers),
            body: call.body,
        };
        debug!("Calling '{}': {} {}", key, request.method, request.url);

        let response = self.transport.send(request).await?;
        let responses = route.responses();

        if responses.success_codes().contains(&response.status) {
            Ok(response.body)
        } else if responses.error_codes().contains(&response.status) {
            warn!("'{}' answered with declared error {}", key, response.status);
            Err(ClientError::Http {
                status: response.status,
                body: response.body,
            })
        } else {
            warn!("'{}' answered with undeclared status {}", key, response.status);
            Err(ClientError::Fetch {
                status: response.status,
                body: response.body,
            })
        }
    }
}

/// Substitute `:name` segments. Missing parameters become empty and the doubled
/// slash they leave behind is collapsed. Values are inserted as given.
pub fn insert_params(template: &str, params: Option<&BTreeMap<String, String>>) -> String {
    let Some(params) = params else {
        return template.to_string();
    };

    let path = template
        .split('/')
        .map(|segment| match segment.strip_prefix(PARAM_MARKER) {
            Some(name) => params.get(name).map(String::as_str).unwrap_or_default(),
            None => segment,
        })
        .collect::<Vec<_>>()
        .join("/");

    path.replace("//", "/")
}

/// `?key=value&...`, or nothing for an absent or empty query. Not escaped.
pub fn query_string(query: Option<&BTreeMap<String, String>>) -> String {
    match query {
        Some(query) if !query.is_empty() => {
            let pairs = query
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>();
            format!("?{}", pairs.join("&"))
        }
        _ => String::new(),
    }
}

/// JSON content type, then base headers, then per-call headers
pub fn merge_headers(
    base: &BTreeMap<String, String>,
    call: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), DEFAULT_CONTENT_TYPE.to_string());

    let layers = std::iter::once(base).chain(call);
    for layer in layers {
        for (name, value) in layer {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
    }
    headers
}
