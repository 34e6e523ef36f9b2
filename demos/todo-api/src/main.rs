//! # Todo API
//!
//! A task list served from a declarative contract. Reads are open, writes need
//! `Authorization: Bearer <token>` where the token comes from `--token`.
//!
//! ```text
//! cargo run -p todo-api -- --bind 127.0.0.1:8000 --token dev
//! curl localhost:8000/tasks?done=false
//! curl -X POST localhost:8000/tasks -H 'authorization: Bearer dev' -d '{"title":"ship it"}'
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use restype_http_server::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

#[derive(Parser)]
#[command(name = "todo-api")]
#[command(about = "Task list API served from a restype contract")]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "RESTYPE_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Bearer token accepted for writes
    #[arg(long, env = "TODO_API_TOKEN", default_value = "dev")]
    token: String,

    /// Maximum request body in bytes
    #[arg(long, default_value_t = 64 * 1024)]
    max_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Task {
    id: u64,
    title: String,
    done: bool,
}

#[derive(Deserialize)]
struct NewTask {
    title: String,
}

#[derive(Deserialize)]
struct TaskPatch {
    title: Option<String>,
    done: Option<bool>,
}

#[derive(Default)]
struct Store {
    tasks: Mutex<BTreeMap<u64, Task>>,
    next_id: Mutex<u64>,
}

impl Store {
    fn insert(&self, title: String) -> Task {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let task = Task {
            id: *next_id,
            title,
            done: false,
        };
        self.tasks.lock().insert(task.id, task.clone());
        task
    }
}

/// Set by the auth middleware once the token checks out
#[derive(Clone)]
struct Caller(String);

struct Ctx {
    store: Arc<Store>,
    user: Option<String>,
}

fn schema(document: Value) -> anyhow::Result<JsonSchema> {
    Ok(JsonSchema::compile(document)?)
}

fn contract() -> anyhow::Result<Contract> {
    let task_document = json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "title": { "type": "string" },
            "done": { "type": "boolean" }
        },
        "required": ["id", "title", "done"]
    });
    let task = schema(task_document.clone())?.into_ref();
    let message = schema(json!({
        "type": "object",
        "properties": { "message": { "type": "string" } },
        "required": ["message"]
    }))?
    .into_ref();
    let id_params = schema(json!({
        "type": "object",
        "properties": { "id": { "type": "integer", "minimum": 1 } },
        "required": ["id"]
    }))?
    .coerce_primitives()
    .into_ref();

    let tasks = Contract::new()
        .leaf(
            "list",
            Route::get("/tasks")
                .query(
                    schema(json!({
                        "type": "object",
                        "properties": { "done": { "type": "boolean" } }
                    }))?
                    .coerce_primitives(),
                )
                .response(
                    200,
                    schema(json!({ "type": "array", "items": task_document }))?,
                ),
        )
        .leaf(
            "get",
            Route::get("/tasks/:id")
                .params(id_params.clone())
                .response(200, task.clone())
                .response(404, message.clone()),
        )
        .leaf(
            "create",
            Route::post("/tasks")
                .body(schema(json!({
                    "type": "object",
                    "properties": { "title": { "type": "string", "minLength": 1 } },
                    "required": ["title"]
                }))?)
                .response(201, task.clone())
                .response(401, message.clone()),
        )
        .leaf(
            "update",
            Route::patch("/tasks/:id")
                .params(id_params.clone())
                .body(schema(json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "done": { "type": "boolean" }
                    },
                    "additionalProperties": false
                }))?)
                .response(200, task.clone())
                .response(401, message.clone())
                .response(404, message.clone()),
        )
        .leaf(
            "remove",
            Route::delete("/tasks/:id")
                .params(id_params)
                .response(204, schema_fn(Ok))
                .response(401, message.clone())
                .response(404, message),
        );

    Ok(Contract::new().branch("tasks", tasks).leaf(
        "health",
        Route::get("/health").response(200, schema_fn(Ok)),
    ))
}

fn missing(id: u64) -> HandlerResult {
    HandlerResult::new(404, json!({ "message": format!("task {} not found", id) }))
}

fn task_id(args: &RouteArgs<Ctx>) -> u64 {
    args.param("id").and_then(Value::as_u64).unwrap_or_default()
}

fn handlers() -> HandlerTree<Ctx> {
    let tasks = HandlerTree::new()
        .leaf(
            "list",
            handler_fn(|args: RouteArgs<Ctx>| async move {
                let done = args
                    .query
                    .as_ref()
                    .and_then(|query| query.get("done"))
                    .and_then(Value::as_bool);
                let tasks: Vec<Task> = args
                    .ctx
                    .store
                    .tasks
                    .lock()
                    .values()
                    .filter(|task| done.is_none_or(|done| task.done == done))
                    .cloned()
                    .collect();
                Ok(HandlerResult::json(200, &tasks)?)
            }),
        )
        .leaf(
            "get",
            handler_fn(|args: RouteArgs<Ctx>| async move {
                let id = task_id(&args);
                let task = args.ctx.store.tasks.lock().get(&id).cloned();
                match task {
                    Some(task) => Ok(HandlerResult::json(200, &task)?),
                    None => Ok(missing(id)),
                }
            }),
        )
        .leaf(
            "create",
            handler_fn(|args: RouteArgs<Ctx>| async move {
                let new: NewTask = args.body_as()?;
                let task = args.ctx.store.insert(new.title);
                info!("{} created task {}", args.ctx.user.as_deref().unwrap_or("anonymous"), task.id);
                Ok(HandlerResult::json(201, &task)?)
            }),
        )
        .leaf(
            "update",
            handler_fn(|args: RouteArgs<Ctx>| async move {
                let id = task_id(&args);
                let patch: TaskPatch = args.body_as()?;
                let mut tasks = args.ctx.store.tasks.lock();
                let Some(task) = tasks.get_mut(&id) else {
                    return Ok(missing(id));
                };
                if let Some(title) = patch.title {
                    task.title = title;
                }
                if let Some(done) = patch.done {
                    task.done = done;
                }
                Ok(HandlerResult::json(200, task)?)
            }),
        )
        .leaf(
            "remove",
            handler_fn(|args: RouteArgs<Ctx>| async move {
                let id = task_id(&args);
                match args.ctx.store.tasks.lock().remove(&id) {
                    Some(_) => Ok(HandlerResult::new(204, Value::Null)),
                    None => Ok(missing(id)),
                }
            }),
        );

    HandlerTree::new().branch("tasks", tasks).leaf(
        "health",
        handler_fn(|_args: RouteArgs<Ctx>| async move {
            Ok(HandlerResult::new(200, json!({ "status": "ok" })))
        }),
    )
}

fn middleware(token: String) -> MiddlewareTree {
    let expected = format!("Bearer {}", token);
    let auth = middleware_fn(move |request: &mut InboundRequest| {
        if request.header("authorization") == Some(expected.as_str()) {
            request
                .extensions_mut()
                .insert(Caller("token-holder".to_string()));
            Next::Proceed
        } else {
            Next::Halt(Reply::new(401, json!({ "message": "missing or invalid token" })))
        }
    });

    MiddlewareTree::new().branch(
        "tasks",
        MiddlewareTree::new()
            .leaf("create", vec![auth.clone()])
            .leaf("update", vec![auth.clone()])
            .leaf("remove", vec![auth]),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = Arc::new(Store::default());
    store.insert("Read the contract".to_string());

    let context = context_fn(move |request: &InboundRequest| {
        let store = store.clone();
        let user = request
            .extensions()
            .get::<Caller>()
            .map(|caller| caller.0.clone());
        async move { Ok::<_, BoxError>(Ctx { store, user }) }
    });

    let table = RouteTable::new(&contract()?, &handlers(), Some(&middleware(args.token)), context)?;
    info!("Serving {} routes", table.len());

    RestServer::builder(Dispatcher::new(table))
        .bind_address(args.bind)
        .max_body_size(args.max_body_size)
        .build()?
        .run()
        .await?;

    Ok(())
}
