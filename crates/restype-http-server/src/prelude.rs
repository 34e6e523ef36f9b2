//! # Restype HTTP Server Prelude
//!
//! ```rust
//! use restype_http_server::prelude::*;
//! ```

pub use crate::registrar::{AxumRegistrar, RouteRegistrar, install};
pub use crate::server::{RestServer, RestServerBuilder, ServerConfig};
pub use crate::{Result, ServerError};

pub use restype_core::prelude::*;
