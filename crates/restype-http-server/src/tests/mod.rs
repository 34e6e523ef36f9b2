//! Test modules for restype-http-server
//!
//! Routers are driven in-process with `tower::ServiceExt::oneshot`.
