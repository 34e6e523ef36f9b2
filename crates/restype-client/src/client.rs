//! Client built from a contract
//!
//! Every leaf route becomes one endpoint, addressed by its dot-joined key path.
//! GET routes are queries, every other method is a mutation.

use futures::FutureExt;
use restype_core::{Contract, Method, Route};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheKey, QueryCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::fetcher::{CallParts, Fetcher};
use crate::transport::{HttpTransport, SharedTransport, Transport};

/// Arguments of a read call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCall {
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl QueryCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Arguments of a write call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationCall {
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl MutationCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the request body
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?))
    }
}

/// Client for every route of a contract
#[derive(Clone)]
pub struct Client {
    routes: Arc<BTreeMap<String, Route>>,
    fetcher: Fetcher,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.fetcher.config().base_url)
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Client {
    pub fn new(contract: &Contract, config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(contract, config, Arc::new(transport))
    }

    pub fn with_shared_transport(
        contract: &Contract,
        config: ClientConfig,
        transport: SharedTransport,
    ) -> Self {
        let routes = contract
            .leaves()
            .into_iter()
            .map(|(key_path, route)| (key_path.join("."), route.clone()))
            .collect::<BTreeMap<_, _>>();
        debug!(
            "Client for {} with {} routes",
            config.base_url,
            routes.len()
        );

        Self {
            routes: Arc::new(routes),
            fetcher: Fetcher::new(config, transport),
        }
    }

    /// Client over the reqwest transport, honouring `config.timeout`
    pub fn with_reqwest(contract: &Contract, config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::new(contract, config, transport))
    }

    pub fn config(&self) -> &ClientConfig {
        self.fetcher.config()
    }

    /// Dot-joined keys of every route
    pub fn route_keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Read endpoint for a GET route
    pub fn query(&self, key_path: &str) -> Result<QueryEndpoint> {
        let route = self.route(key_path, Method::is_read, "mutation")?;
        Ok(QueryEndpoint {
            key: key_path.to_string(),
            route,
            fetcher: self.fetcher.clone(),
        })
    }

    /// Write endpoint for a POST, PUT, PATCH or DELETE route
    pub fn mutation(&self, key_path: &str) -> Result<MutationEndpoint> {
        let route = self.route(key_path, |method| !method.is_read(), "query")?;
        Ok(MutationEndpoint {
            key: key_path.to_string(),
            route,
            fetcher: self.fetcher.clone(),
        })
    }

    fn route(
        &self,
        key_path: &str,
        allowed: impl Fn(&Method) -> bool,
        otherwise: &'static str,
    ) -> Result<Route> {
        let route = self
            .routes
            .get(key_path)
            .ok_or_else(|| ClientError::UnknownRoute(key_path.to_string()))?;

        let method = route.method();
        if !allowed(&method) {
            return Err(ClientError::AccessPattern {
                key: key_path.to_string(),
                method,
                expected: otherwise,
            });
        }
        Ok(route.clone())
    }
}

/// Read-style endpoint
#[derive(Clone)]
pub struct QueryEndpoint {
    key: String,
    route: Route,
    fetcher: Fetcher,
}

impl fmt::Debug for QueryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEndpoint")
            .field("key", &self.key)
            .field("path", &self.route.path())
            .finish()
    }
}

impl QueryEndpoint {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Cache identity for a call with these parameters
    pub fn cache_key(&self, params: &BTreeMap<String, String>) -> CacheKey {
        CacheKey::new(self.key.clone(), params.clone())
    }

    pub async fn fetch(&self, call: &QueryCall) -> Result<Value> {
        self.fetcher
            .fetch(
                &self.key,
                &self.route,
                CallParts {
                    params: Some(&call.params),
                    query: Some(&call.query),
                    headers: Some(&call.headers),
                    body: None,
                },
            )
            .await
    }

    pub async fn fetch_as<T: DeserializeOwned>(&self, call: &QueryCall) -> Result<T> {
        Ok(serde_json::from_value(self.fetch(call).await?)?)
    }

    /// Fetch through `cache`, keyed by [`QueryEndpoint::cache_key`]
    pub async fn fetch_cached(&self, cache: &dyn QueryCache, call: &QueryCall) -> Result<Value> {
        let key = self.cache_key(&call.params);
        cache.get_or_fetch(key, self.fetch(call).boxed()).await
    }
}

/// Write-style endpoint
#[derive(Clone)]
pub struct MutationEndpoint {
    key: String,
    route: Route,
    fetcher: Fetcher,
}

impl fmt::Debug for MutationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationEndpoint")
            .field("key", &self.key)
            .field("method", &self.route.method())
            .field("path", &self.route.path())
            .finish()
    }
}

impl MutationEndpoint {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub async fn send(&self, call: MutationCall) -> Result<Value> {
        self.fetcher
            .fetch(
                &self.key,
                &self.route,
                CallParts {
                    params: Some(&call.params),
                    query: None,
                    headers: Some(&call.headers),
                    body: call.body,
                },
            )
            .await
    }

    pub async fn send_as<T: DeserializeOwned>(&self, call: MutationCall) -> Result<T> {
        Ok(serde_json::from_value(self.send(call).await?)?)
    }
}
