//! Route registration into a host router

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::routing::{MethodFilter, MethodRouter};
use restype_core::flatten::parse_template;
use restype_core::{Dispatcher, Endpoint, Method, Segment};
use tracing::{debug, info, warn};

use crate::endpoint::{self, HostParams};
use crate::{Result, ServerError};

/// A host router that accepts one registration per flattened route
pub trait RouteRegistrar<C> {
    /// Register `endpoint` to serve `method` requests matching `template`
    fn register(&mut self, method: Method, template: &str, endpoint: Endpoint<C>) -> Result<()>;
}

/// Register every route of `dispatcher` with `registrar`, in declaration order
pub fn install<C, R>(dispatcher: &Dispatcher<C>, registrar: &mut R) -> Result<usize>
where
    C: Send + 'static,
    R: RouteRegistrar<C>,
{
    let mut count = 0;
    for endpoint in dispatcher.endpoints() {
        let Some(entry) = endpoint.entry() else {
            continue;
        };
        let (method, template, key) = (entry.method(), entry.template().to_string(), entry.key());

        debug!("Registering {} {} for '{}'", method, template, key);
        registrar.register(method, &template, endpoint)?;
        count += 1;
    }

    info!("Registered {} contract routes", count);
    Ok(count)
}

struct HostRoute {
    template: String,
    router: MethodRouter,
    methods: Vec<Method>,
}

/// Registrar that accumulates an axum [`Router`].
///
/// Templates are registered with positional parameter names (`/posts/:p0`) so two
/// routes with the same shape but different parameter names share one host route.
/// A second route with the same method and shape can never be reached; it is
/// skipped with a warning and the first declaration wins.
pub struct AxumRegistrar {
    routes: Vec<HostRoute>,
    max_body_size: usize,
}

impl AxumRegistrar {
    pub fn new(max_body_size: usize) -> Self {
        Self {
            routes: Vec::new(),
            max_body_size,
        }
    }

    /// Build the router. Requests no route accepts get a 404 with an empty body.
    pub fn finish(self) -> Result<Router> {
        let mut router = Router::new();
        for route in self.routes {
            let HostRoute {
                template,
                router: method_router,
                ..
            } = route;
            let method_router = method_router.fallback(endpoint::not_found);

            // axum panics on templates its matcher cannot accept
            let attempt = std::panic::catch_unwind(AssertUnwindSafe(|| {
                router.clone().route(&template, method_router)
            }));
            router = attempt.map_err(|panic| ServerError::RouteConflict {
                reason: panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "rejected by the host router".to_string()),
                template,
            })?;
        }

        Ok(router.fallback(endpoint::not_found))
    }
}

impl Default for AxumRegistrar {
    fn default() -> Self {
        Self::new(crate::ServerConfig::default().max_body_size)
    }
}

impl<C: Send + 'static> RouteRegistrar<C> for AxumRegistrar {
    fn register(&mut self, method: Method, template: &str, endpoint: Endpoint<C>) -> Result<()> {
        let (host_template, names) = host_template(&parse_template(template)?);

        let index = match self.routes.iter().position(|r| r.template == host_template) {
            Some(index) => index,
            None => {
                self.routes.push(HostRoute {
                    template: host_template,
                    router: MethodRouter::new(),
                    methods: Vec::new(),
                });
                self.routes.len() - 1
            }
        };
        let slot = &mut self.routes[index];

        if slot.methods.contains(&method) {
            warn!(
                "{} {} has the same shape as an earlier route and will never match",
                method, template
            );
            return Ok(());
        }

        let max_body_size = self.max_body_size;
        let handler = move |params: HostParams, request: Request| {
            let endpoint = endpoint.clone();
            let names = names.clone();
            async move { endpoint::serve(endpoint, names, max_body_size, params, request).await }
        };

        let router = std::mem::replace(&mut slot.router, MethodRouter::new());
        slot.router = router.on(method_filter(method), handler);
        slot.methods.push(method);
        Ok(())
    }
}

/// Rewrite a template with positional parameter names, returning the declared names
fn host_template(segments: &[Segment]) -> (String, Arc<[String]>) {
    let mut names = Vec::new();
    let mut template = String::new();
    for segment in segments {
        template.push('/');
        match segment {
            Segment::Literal(literal) => template.push_str(literal),
            Segment::Param(name) => {
                template.push_str(&format!(":p{}", names.len()));
                names.push(name.clone());
            }
        }
    }
    if template.is_empty() {
        template.push('/');
    }
    (template, names.into())
}

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Patch => MethodFilter::PATCH,
        Method::Delete => MethodFilter::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_template_positional_names() {
        let (template, names) = host_template(&[
            Segment::Literal("users".into()),
            Segment::Param("userId".into()),
            Segment::Literal("posts".into()),
            Segment::Param("postId".into()),
        ]);
        assert_eq!(template, "/users/:p0/posts/:p1");
        assert_eq!(&*names, &["userId".to_string(), "postId".to_string()]);

        let (root, names) = host_template(&[]);
        assert_eq!(root, "/");
        assert!(names.is_empty());
    }

    #[test]
    fn test_same_shape_routes_share_a_host_route() {
        use restype_core::prelude::*;
        use serde_json::json;

        let contract = Contract::new()
            .leaf("get", Route::get("/posts/:id").response(200, schema_fn(Ok)))
            .leaf("remove", Route::delete("/posts/:postId").response(204, schema_fn(Ok)))
            .leaf("getAgain", Route::get("/posts/:slug").response(200, schema_fn(Ok)));
        let ok = || {
            handler_fn(|_args: RouteArgs<()>| async move { Ok(HandlerResult::new(200, json!(null))) })
        };
        let handlers = HandlerTree::new()
            .leaf("get", ok())
            .leaf("remove", ok())
            .leaf("getAgain", ok());
        let dispatcher =
            Dispatcher::new(RouteTable::new(&contract, &handlers, None, DefaultContext).unwrap());

        let mut registrar = AxumRegistrar::default();
        assert_eq!(install(&dispatcher, &mut registrar).unwrap(), 3);
        assert_eq!(registrar.routes.len(), 1);
        assert_eq!(registrar.routes[0].methods, vec![Method::Get, Method::Delete]);
        assert!(registrar.finish().is_ok());
    }
}
