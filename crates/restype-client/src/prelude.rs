//! # Restype Client Prelude
//!
//! ```rust
//! use restype_client::prelude::*;
//! ```

pub use crate::cache::{CacheKey, MemoryCache, QueryCache};
pub use crate::client::{Client, MutationCall, QueryCall};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, Result};
pub use crate::transport::{Transport, TransportRequest, TransportResponse};
