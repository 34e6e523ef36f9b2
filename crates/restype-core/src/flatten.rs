//! Contract flattener
//!
//! Walks a contract together with its handler tree (and an optional middleware
//! tree) in lock-step and produces the flat route table the matcher scans. Any
//! disagreement in shape is reported eagerly as [`ContractError::ShapeMismatch`];
//! a table that fails to build must keep the service from starting.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::PARAM_MARKER;
use crate::contract::{Contract, Route};
use crate::error::{ContractError, Result};
use crate::handler::{BoxedHandler, ContextFactory, HandlerTree, SharedContextFactory};
use crate::matcher::split_path;
use crate::method::Method;
use crate::middleware::{MiddlewareChain, MiddlewareTree};
use crate::tree::Node;

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Parameter name without the leading marker
    Param(String),
}

impl Segment {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PARAM_MARKER) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }

    /// Parameters match any inbound segment, literals only themselves
    pub fn matches(&self, inbound: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == inbound,
            Segment::Param(_) => true,
        }
    }
}

/// Parse and check a path template
pub fn parse_template(path: &str) -> Result<Vec<Segment>> {
    if !path.starts_with('/') {
        return Err(ContractError::invalid_path(path, "must start with '/'"));
    }

    split_path(path)
        .into_iter()
        .map(|raw| match Segment::parse(raw) {
            Segment::Param(name) if name.is_empty() => Err(ContractError::invalid_path(
                path,
                "parameter segments need a name after ':'",
            )),
            segment => Ok(segment),
        })
        .collect()
}

/// A route resolved to its handler, middleware and context factory
pub struct FlatRouteEntry<C> {
    key_path: Vec<String>,
    segments: Vec<Segment>,
    route: Arc<Route>,
    handler: BoxedHandler<C>,
    middleware: MiddlewareChain,
    context: SharedContextFactory<C>,
}

impl<C> FlatRouteEntry<C> {
    /// Contract keys leading to this route
    pub fn key_path(&self) -> &[String] {
        &self.key_path
    }

    /// Dot-joined key path, e.g. `posts.getPost`
    pub fn key(&self) -> String {
        self.key_path.join(".")
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn method(&self) -> Method {
        self.route.method()
    }

    pub fn template(&self) -> &str {
        self.route.path()
    }

    pub fn handler(&self) -> &BoxedHandler<C> {
        &self.handler
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub fn context(&self) -> &SharedContextFactory<C> {
        &self.context
    }
}

impl<C> fmt::Debug for FlatRouteEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatRouteEntry")
            .field("key", &self.key())
            .field("method", &self.method())
            .field("segments", &self.segments)
            .field("middleware", &self.middleware)
            .finish()
    }
}

/// Flattened, read-only route table
pub struct RouteTable<C> {
    entries: Vec<FlatRouteEntry<C>>,
}

impl<C: Send + 'static> RouteTable<C> {
    /// Flatten a contract served by a single handler tree
    pub fn new(
        contract: &Contract,
        handlers: &HandlerTree<C>,
        middleware: Option<&MiddlewareTree>,
        context: impl ContextFactory<C> + 'static,
    ) -> Result<Self> {
        let context: SharedContextFactory<C> = Arc::new(context);
        let mut entries = Vec::new();
        flatten_into(
            contract,
            handlers,
            middleware,
            &context,
            &mut Vec::new(),
            &mut entries,
        )?;

        debug!("Flattened contract into {} routes", entries.len());
        Ok(Self { entries })
    }

    /// Combine independently-built routers, one per top-level contract key
    pub fn builder(contract: &Contract) -> RouteTableBuilder<'_, C> {
        RouteTableBuilder {
            contract,
            mounts: Vec::new(),
            middleware: None,
        }
    }
}

impl<C> RouteTable<C> {
    /// Entries in declaration order
    pub fn entries(&self) -> &[FlatRouteEntry<C>] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&FlatRouteEntry<C>> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> fmt::Debug for RouteTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

struct Mount<'a, C> {
    key: String,
    handlers: &'a HandlerTree<C>,
    context: SharedContextFactory<C>,
}

/// Builder for a route table served by several routers.
///
/// Each top-level key of the contract must be mounted exactly once with its own
/// handler tree and context factory.
pub struct RouteTableBuilder<'a, C> {
    contract: &'a Contract,
    mounts: Vec<Mount<'a, C>>,
    middleware: Option<&'a MiddlewareTree>,
}

impl<'a, C: Send + 'static> RouteTableBuilder<'a, C> {
    /// Serve the sub-contract under `key` with `handlers`
    pub fn mount(
        mut self,
        key: impl Into<String>,
        handlers: &'a HandlerTree<C>,
        context: impl ContextFactory<C> + 'static,
    ) -> Self {
        self.mounts.push(Mount {
            key: key.into(),
            handlers,
            context: Arc::new(context),
        });
        self
    }

    /// Middleware tree for the whole contract
    pub fn middleware(mut self, middleware: &'a MiddlewareTree) -> Self {
        self.middleware = Some(middleware);
        self
    }

    pub fn build(self) -> Result<RouteTable<C>> {
        for (index, mount) in self.mounts.iter().enumerate() {
            let path = [mount.key.clone()];
            match self.contract.get(&mount.key) {
                None => {
                    return Err(ContractError::shape_mismatch(
                        &path,
                        "mounted key is not in the contract",
                    ));
                }
                Some(Node::Leaf(_)) => {
                    return Err(ContractError::shape_mismatch(
                        &path,
                        "mounted key is a route, not a sub-contract",
                    ));
                }
                Some(Node::Branch(_)) => {}
            }
            if self.mounts[..index].iter().any(|m| m.key == mount.key) {
                return Err(ContractError::shape_mismatch(&path, "key is mounted twice"));
            }
        }

        if let Some(middleware) = self.middleware {
            reject_extra_keys(self.contract, middleware, &[], "middleware")?;
        }

        let mut entries = Vec::new();
        for (key, node) in self.contract.iter() {
            let mut prefix = vec![key.to_string()];
            let Some(mount) = self.mounts.iter().find(|m| m.key == key) else {
                return Err(ContractError::shape_mismatch(
                    &prefix,
                    "no router is mounted for this key",
                ));
            };
            let Node::Branch(sub_contract) = node else {
                // mounts were checked above
                continue;
            };
            let sub_middleware = branch_middleware(self.middleware, key, &prefix)?;

            flatten_into(
                sub_contract,
                mount.handlers,
                sub_middleware,
                &mount.context,
                &mut prefix,
                &mut entries,
            )?;
        }

        debug!(
            "Flattened {} mounted routers into {} routes",
            self.mounts.len(),
            entries.len()
        );
        Ok(RouteTable { entries })
    }
}

fn branch_middleware<'t>(
    middleware: Option<&'t MiddlewareTree>,
    key: &str,
    prefix: &[String],
) -> Result<Option<&'t MiddlewareTree>> {
    match middleware.and_then(|tree| tree.get(key)) {
        None => Ok(None),
        Some(Node::Branch(tree)) => Ok(Some(tree)),
        Some(Node::Leaf(_)) => Err(ContractError::shape_mismatch(
            prefix,
            "middleware for a sub-contract must be a nested tree, found a list",
        )),
    }
}

fn reject_extra_keys<T>(
    contract: &Contract,
    tree: &crate::tree::Tree<T>,
    prefix: &[String],
    what: &str,
) -> Result<()> {
    match tree.keys().find(|key| !contract.contains_key(key)) {
        Some(extra) => {
            let mut path = prefix.to_vec();
            path.push(extra.to_string());
            Err(ContractError::shape_mismatch(
                &path,
                format!("{} has no matching contract entry", what),
            ))
        }
        None => Ok(()),
    }
}

fn flatten_into<C>(
    contract: &Contract,
    handlers: &HandlerTree<C>,
    middleware: Option<&MiddlewareTree>,
    context: &SharedContextFactory<C>,
    prefix: &mut Vec<String>,
    out: &mut Vec<FlatRouteEntry<C>>,
) -> Result<()> {
    reject_extra_keys(contract, handlers, prefix, "handler")?;
    if let Some(middleware) = middleware {
        reject_extra_keys(contract, middleware, prefix, "middleware")?;
    }

    for (key, node) in contract.iter() {
        prefix.push(key.to_string());

        match node {
            Node::Leaf(route) => {
                let handler = match handlers.get(key) {
                    Some(Node::Leaf(handler)) => handler.clone(),
                    Some(Node::Branch(_)) => {
                        return Err(ContractError::shape_mismatch(
                            prefix,
                            "expected a handler, found a nested handler tree",
                        ));
                    }
                    None => {
                        return Err(ContractError::shape_mismatch(prefix, "missing handler"));
                    }
                };

                let chain = match middleware.and_then(|tree| tree.get(key)) {
                    None => MiddlewareChain::new(),
                    Some(Node::Leaf(list)) => MiddlewareChain::from(list.clone()),
                    Some(Node::Branch(_)) => {
                        return Err(ContractError::shape_mismatch(
                            prefix,
                            "middleware for a route must be a list, found a nested tree",
                        ));
                    }
                };

                out.push(FlatRouteEntry {
                    key_path: prefix.clone(),
                    segments: parse_template(route.path())?,
                    route: Arc::new(route.clone()),
                    handler,
                    middleware: chain,
                    context: context.clone(),
                });
            }
            Node::Branch(sub_contract) => {
                let sub_handlers = match handlers.get(key) {
                    Some(Node::Branch(tree)) => tree,
                    Some(Node::Leaf(_)) => {
                        return Err(ContractError::shape_mismatch(
                            prefix,
                            "expected a nested handler tree, found a handler",
                        ));
                    }
                    None => {
                        return Err(ContractError::shape_mismatch(
                            prefix,
                            "missing handler tree",
                        ));
                    }
                };
                let sub_middleware = branch_middleware(middleware, key, prefix)?;

                flatten_into(
                    sub_contract,
                    sub_handlers,
                    sub_middleware,
                    context,
                    prefix,
                    out,
                )?;
            }
        }

        prefix.pop();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{DefaultContext, HandlerResult, RouteArgs, handler_fn};
    use crate::middleware::{Next, middleware_fn};
    use crate::tree::Tree;
    use serde_json::json;

    fn ok_handler() -> BoxedHandler<()> {
        handler_fn(|_args: RouteArgs<()>| async move { Ok(HandlerResult::new(200, json!({}))) })
    }

    fn blog_contract() -> Contract {
        Contract::new()
            .branch(
                "posts",
                Contract::new()
                    .leaf("list", Route::get("/posts"))
                    .leaf("get", Route::get("/posts/:id"))
                    .leaf("create", Route::post("/posts")),
            )
            .leaf("health", Route::get("/health"))
    }

    fn blog_handlers() -> HandlerTree<()> {
        HandlerTree::new()
            .branch(
                "posts",
                HandlerTree::new()
                    .leaf("list", ok_handler())
                    .leaf("get", ok_handler())
                    .leaf("create", ok_handler()),
            )
            .leaf("health", ok_handler())
    }

    fn shape_path(err: ContractError) -> String {
        match err {
            ContractError::ShapeMismatch { key_path, .. } => key_path,
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_one_entry_per_route_in_order() {
        let table = RouteTable::new(&blog_contract(), &blog_handlers(), None, DefaultContext).unwrap();

        let keys: Vec<String> = table.entries().iter().map(FlatRouteEntry::key).collect();
        assert_eq!(keys, vec!["posts.list", "posts.get", "posts.create", "health"]);

        let get = &table.entries()[1];
        assert_eq!(get.method(), Method::Get);
        assert_eq!(
            get.segments(),
            &[
                Segment::Literal("posts".to_string()),
                Segment::Param("id".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_handler() {
        let handlers = HandlerTree::new()
            .branch("posts", HandlerTree::new().leaf("list", ok_handler()))
            .leaf("health", ok_handler());

        let err = RouteTable::new(&blog_contract(), &handlers, None, DefaultContext).unwrap_err();
        assert_eq!(shape_path(err), "posts.get");
    }

    #[test]
    fn test_handler_where_subtree_expected() {
        let handlers = HandlerTree::new()
            .leaf("posts", ok_handler())
            .leaf("health", ok_handler());

        let err = RouteTable::new(&blog_contract(), &handlers, None, DefaultContext).unwrap_err();
        assert_eq!(shape_path(err), "posts");
    }

    #[test]
    fn test_subtree_where_handler_expected() {
        let handlers = blog_handlers().branch("health", HandlerTree::new());
        let err = RouteTable::new(&blog_contract(), &handlers, None, DefaultContext).unwrap_err();
        assert_eq!(shape_path(err), "health");
    }

    #[test]
    fn test_extra_handler_key() {
        let handlers = blog_handlers().leaf("metrics", ok_handler());
        let err = RouteTable::new(&blog_contract(), &handlers, None, DefaultContext).unwrap_err();
        assert_eq!(shape_path(err), "metrics");
    }

    #[test]
    fn test_middleware_shapes() {
        let pass = middleware_fn(|_request| Next::Proceed);

        let ok_tree = MiddlewareTree::new()
            .branch("posts", MiddlewareTree::new().leaf("create", vec![pass.clone()]));
        let table = RouteTable::new(
            &blog_contract(),
            &blog_handlers(),
            Some(&ok_tree),
            DefaultContext,
        )
        .unwrap();
        let lens: Vec<usize> = table.entries().iter().map(|e| e.middleware().len()).collect();
        assert_eq!(lens, vec![0, 0, 1, 0]);

        let nested_at_route = MiddlewareTree::new().branch("health", MiddlewareTree::new());
        let err = RouteTable::new(
            &blog_contract(),
            &blog_handlers(),
            Some(&nested_at_route),
            DefaultContext,
        )
        .unwrap_err();
        assert_eq!(shape_path(err), "health");

        let list_at_subtree = MiddlewareTree::new().leaf("posts", vec![pass]);
        let err = RouteTable::new(
            &blog_contract(),
            &blog_handlers(),
            Some(&list_at_subtree),
            DefaultContext,
        )
        .unwrap_err();
        assert_eq!(shape_path(err), "posts");
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            parse_template("posts/:id"),
            Err(ContractError::InvalidPath { .. })
        ));
        assert!(matches!(
            parse_template("/posts/:"),
            Err(ContractError::InvalidPath { .. })
        ));
        assert_eq!(parse_template("/").unwrap(), Vec::<Segment>::new());

        let contract = Contract::new().leaf("bad", Route::get("bad"));
        let handlers = HandlerTree::new().leaf("bad", ok_handler());
        assert!(RouteTable::new(&contract, &handlers, None, DefaultContext).is_err());
    }

    #[test]
    fn test_builder_mounts_per_key() {
        let contract = Contract::new()
            .branch("posts", Contract::new().leaf("list", Route::get("/posts")))
            .branch("test", Contract::new().leaf("getTest", Route::get("/test")));

        let posts = HandlerTree::new().leaf("list", ok_handler());
        let test = HandlerTree::new().leaf("getTest", ok_handler());

        let table = RouteTable::builder(&contract)
            .mount("test", &test, DefaultContext)
            .mount("posts", &posts, DefaultContext)
            .build()
            .unwrap();

        let keys: Vec<String> = table.entries().iter().map(FlatRouteEntry::key).collect();
        assert_eq!(keys, vec!["posts.list", "test.getTest"]);
    }

    #[test]
    fn test_builder_shape_errors() {
        let contract = Contract::new()
            .branch("posts", Contract::new().leaf("list", Route::get("/posts")))
            .leaf("health", Route::get("/health"));
        let posts = HandlerTree::new().leaf("list", ok_handler());

        let unmounted = RouteTable::builder(&contract)
            .mount("posts", &posts, DefaultContext)
            .build()
            .unwrap_err();
        assert_eq!(shape_path(unmounted), "health");

        let route_mount = RouteTable::builder(&contract)
            .mount("health", &posts, DefaultContext)
            .build()
            .unwrap_err();
        assert_eq!(shape_path(route_mount), "health");

        let twice = RouteTable::builder(&contract)
            .mount("posts", &posts, DefaultContext)
            .mount("posts", &posts, DefaultContext)
            .build()
            .unwrap_err();
        assert_eq!(shape_path(twice), "posts");

        let unknown = RouteTable::<()>::builder(&contract)
            .mount("users", &posts, DefaultContext)
            .build()
            .unwrap_err();
        assert_eq!(shape_path(unknown), "users");
    }

    #[test]
    fn test_middleware_tree_for_mounted_routers() {
        let contract = Contract::new()
            .branch("posts", Contract::new().leaf("list", Route::get("/posts")));
        let posts = HandlerTree::new().leaf("list", ok_handler());
        let middleware: MiddlewareTree = Tree::new().branch(
            "posts",
            Tree::new().leaf("list", vec![middleware_fn(|_request| Next::Proceed)]),
        );

        let table = RouteTable::builder(&contract)
            .mount("posts", &posts, DefaultContext)
            .middleware(&middleware)
            .build()
            .unwrap();
        assert_eq!(table.entries()[0].middleware().len(), 1);
    }
}
