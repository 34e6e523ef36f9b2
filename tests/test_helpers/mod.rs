//! Shared fixtures for the integration tests
//!
//! A small task-tracker contract served with a shared in-memory store, plus a
//! transport that drives a [`Dispatcher`] in-process so client tests need no socket.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use restype_client::{Transport, TransportError, TransportRequest, TransportResponse};
use restype_core::SharedMiddleware;
use restype_core::prelude::*;
use serde_json::{Value, json};
use url::Url;

/// In-memory task store shared by every request
#[derive(Default)]
pub struct TaskStore {
    tasks: Mutex<BTreeMap<u64, Value>>,
    next_id: AtomicU64,
    /// Number of times the create handler ran
    pub create_calls: AtomicUsize,
}

impl TaskStore {
    pub fn with_task(self, title: &str) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.tasks
            .lock()
            .insert(id, json!({ "id": id, "title": title }));
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// Per-request context
pub struct TaskCtx {
    pub store: Arc<TaskStore>,
    pub user: Option<String>,
}

fn object(properties: Value, required: &[&str]) -> JsonSchema {
    let mut document = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        document["required"] = json!(required);
    }
    JsonSchema::compile(document).unwrap()
}

fn task_schema() -> JsonSchema {
    object(json!({ "id": { "type": "integer" }, "title": { "type": "string" } }), &["id", "title"])
}

fn message_schema() -> JsonSchema {
    object(json!({ "message": { "type": "string" } }), &["message"])
}

fn id_params() -> JsonSchema {
    object(json!({ "id": { "type": "integer" } }), &["id"]).coerce_primitives()
}

pub fn tasks_contract() -> Contract {
    Contract::new()
        .leaf(
            "list",
            Route::get("/tasks")
                .query(object(json!({ "limit": { "type": "integer", "minimum": 1 } }), &[]).coerce_primitives())
                .response(200, JsonSchema::compile(json!({ "type": "array" })).unwrap())
                .response(400, message_schema()),
        )
        .leaf(
            "get",
            Route::get("/tasks/:id")
                .params(id_params())
                .response(200, task_schema())
                .response(404, message_schema()),
        )
        .leaf(
            "create",
            Route::post("/tasks")
                .body(object(json!({ "title": { "type": "string", "minLength": 1 } }), &["title"]))
                .response(201, task_schema())
                .response(401, message_schema()),
        )
        .leaf(
            "remove",
            Route::delete("/tasks/:id")
                .params(id_params())
                .response(204, schema_fn(Ok))
                .response(401, message_schema())
                .response(404, message_schema()),
        )
        .leaf(
            "archive",
            // the handler answers 201, which this route never declares
            Route::post("/tasks/:id/archive")
                .params(id_params())
                .response(200, task_schema()),
        )
}

pub fn users_contract() -> Contract {
    Contract::new()
        .leaf("byId", Route::get("/users/:id").response(200, schema_fn(Ok)))
        .leaf("me", Route::get("/users/me").response(200, schema_fn(Ok)))
}

/// Full contract: `tasks.*`, `users.*` and the nested `test.getTest`
pub fn app_contract() -> Contract {
    Contract::new()
        .branch("tasks", tasks_contract())
        .branch("users", users_contract())
        .branch(
            "test",
            Contract::new().leaf(
                "getTest",
                Route::get("/test/:tid")
                    .response(200, JsonSchema::compile(json!({ "type": "string" })).unwrap()),
            ),
        )
}

fn not_found(id: &Value) -> HandlerResult {
    HandlerResult::new(404, json!({ "message": format!("task {} not found", id) }))
}

pub fn task_handlers() -> HandlerTree<TaskCtx> {
    HandlerTree::new()
        .leaf(
            "list",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                let limit = args
                    .query
                    .as_ref()
                    .and_then(|query| query.get("limit"))
                    .and_then(Value::as_u64)
                    .unwrap_or(u64::MAX) as usize;
                let tasks = args.ctx.store.tasks.lock();
                let page = tasks.values().take(limit).cloned().collect::<Vec<_>>();
                Ok(HandlerResult::new(200, Value::Array(page)))
            }),
        )
        .leaf(
            "get",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                let id = args.params["id"].clone();
                let tasks = args.ctx.store.tasks.lock();
                Ok(match id.as_u64().and_then(|id| tasks.get(&id)) {
                    Some(task) => HandlerResult::new(200, task.clone()),
                    None => not_found(&id),
                })
            }),
        )
        .leaf(
            "create",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                let store = &args.ctx.store;
                store.create_calls.fetch_add(1, Ordering::SeqCst);

                let title = args.body.as_ref().map(|body| body["title"].clone()).unwrap_or_default();
                let id = store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let task = json!({ "id": id, "title": title });
                store.tasks.lock().insert(id, task.clone());
                Ok(HandlerResult::new(201, task))
            }),
        )
        .leaf(
            "remove",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                let id = args.params["id"].clone();
                let removed = id
                    .as_u64()
                    .and_then(|id| args.ctx.store.tasks.lock().remove(&id));
                Ok(match removed {
                    Some(_) => HandlerResult::new(204, Value::Null),
                    None => not_found(&id),
                })
            }),
        )
        .leaf(
            "archive",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                Ok(HandlerResult::new(201, json!({ "id": args.params["id"], "title": "archived" })))
            }),
        )
}

pub fn user_handlers() -> HandlerTree<TaskCtx> {
    HandlerTree::new()
        .leaf(
            "byId",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                Ok(HandlerResult::new(200, json!({ "route": "byId", "id": args.params["id"] })))
            }),
        )
        .leaf(
            "me",
            handler_fn(|args: RouteArgs<TaskCtx>| async move {
                Ok(HandlerResult::new(200, json!({ "route": "me", "user": args.ctx.user })))
            }),
        )
}

pub fn app_handlers() -> HandlerTree<TaskCtx> {
    HandlerTree::new()
        .branch("tasks", task_handlers())
        .branch("users", user_handlers())
        .branch(
            "test",
            HandlerTree::new().leaf(
                "getTest",
                handler_fn(|args: RouteArgs<TaskCtx>| async move {
                    let tid = args.param_str("tid").unwrap_or_default().to_owned();
                    Ok(HandlerResult::new(200, json!(format!("test {} ok", tid))))
                }),
            ),
        )
}

/// Bearer check for writes
pub fn require_token() -> Vec<SharedMiddleware> {
    vec![middleware_fn(|request| match request.header("authorization") {
        Some("Bearer let-me-in") => Next::Proceed,
        _ => Next::Halt(Reply::new(401, json!({ "message": "unauthorized" }))),
    })]
}

pub fn app_middleware() -> MiddlewareTree {
    MiddlewareTree::new().branch(
        "tasks",
        MiddlewareTree::new()
            .leaf("create", require_token())
            .leaf("remove", require_token()),
    )
}

/// Context factory reading the caller from `x-user`
pub fn task_context(store: Arc<TaskStore>) -> impl ContextFactory<TaskCtx> + 'static {
    context_fn(move |request: &InboundRequest| {
        let store = store.clone();
        let user = request.header("x-user").map(str::to_owned);
        async move { Ok::<_, BoxError>(TaskCtx { store, user }) }
    })
}

pub fn app_dispatcher(store: Arc<TaskStore>) -> Dispatcher<TaskCtx> {
    let table = RouteTable::new(
        &app_contract(),
        &app_handlers(),
        Some(&app_middleware()),
        task_context(store),
    )
    .unwrap();
    Dispatcher::new(table)
}

/// Client transport that hands requests straight to a dispatcher
pub struct DispatchTransport<C> {
    dispatcher: Dispatcher<C>,
}

impl<C: Send + 'static> DispatchTransport<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl<C: Send + 'static> Transport for DispatchTransport<C> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = Url::parse(&request.url).map_err(|e| TransportError::Http(e.to_string()))?;

        let mut inbound = InboundRequest::new(request.method, url.path());
        for (key, value) in url.query_pairs() {
            inbound.insert_query(key, value);
        }
        for (name, value) in &request.headers {
            inbound.insert_header(name, value.clone());
        }
        inbound.set_body(request.body);

        let reply = self.dispatcher.dispatch(inbound).await;
        Ok(TransportResponse::new(reply.status, reply.body.unwrap_or(Value::Null)))
    }
}
