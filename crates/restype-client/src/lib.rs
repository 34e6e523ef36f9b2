//! # Restype Client
//!
//! Calls the routes of a contract over HTTP. Each leaf route is exposed as a query
//! (GET) or a mutation (POST, PUT, PATCH, DELETE); responses are classified against
//! the route's declared success and error statuses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restype_client::{Client, ClientConfig, MemoryCache, QueryCall};
//! use restype_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let contract = Contract::new().leaf(
//!         "getItem",
//!         Route::get("/item/:id")
//!             .response(200, schema_fn(Ok))
//!             .response(404, schema_fn(Ok)),
//!     );
//!
//!     let client = Client::with_reqwest(&contract, ClientConfig::new("http://localhost:8000"))?;
//!     let cache = MemoryCache::new();
//!
//!     let item = client
//!         .query("getItem")?
//!         .fetch_cached(&cache, &QueryCall::new().param("id", 42))
//!         .await?;
//!     println!("{item}");
//!     Ok(())
//! }
//! ```
//!
//! Path parameters are inserted verbatim and query values are not escaped; callers
//! pass URL-safe values.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
mod fetcher;
pub mod prelude;
pub mod transport;

pub use cache::{CacheKey, MemoryCache, QueryCache};
pub use client::{Client, MutationCall, MutationEndpoint, QueryCall, QueryEndpoint};
pub use config::ClientConfig;
pub use error::{ClientError, Result, TransportError};
pub use fetcher::{insert_params, merge_headers, query_string};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
