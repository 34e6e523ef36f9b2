//! Server configuration and run loop

use std::net::SocketAddr;

use axum::Router;
use restype_core::Dispatcher;
use tokio::net::TcpListener;
use tracing::info;

use crate::Result;
use crate::registrar::{AxumRegistrar, install};

/// Configuration for the HTTP binding
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Builder for [`RestServer`]
pub struct RestServerBuilder<C> {
    config: ServerConfig,
    dispatcher: Dispatcher<C>,
}

impl<C: Send + 'static> RestServerBuilder<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher,
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register every contract route and build the router
    pub fn build(self) -> Result<RestServer> {
        let mut registrar = AxumRegistrar::new(self.config.max_body_size);
        install(&self.dispatcher, &mut registrar)?;

        Ok(RestServer {
            config: self.config,
            router: registrar.finish()?,
        })
    }
}

/// A contract served over HTTP
#[derive(Debug, Clone)]
pub struct RestServer {
    config: ServerConfig,
    router: Router,
}

impl RestServer {
    pub fn builder<C: Send + 'static>(dispatcher: Dispatcher<C>) -> RestServerBuilder<C> {
        RestServerBuilder::new(dispatcher)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The axum router, for embedding in a larger application or for tests
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until the process stops
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        info!("REST server listening on {}", self.config.bind_address);

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
