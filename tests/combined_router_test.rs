//! Contracts served by several routers, each with its own context factory

mod test_helpers;

use std::sync::Arc;

use restype_core::prelude::*;
use serde_json::json;
use test_helpers::{
    TaskCtx, TaskStore, app_middleware, task_context, task_handlers, tasks_contract,
    user_handlers, users_contract,
};

fn combined_contract() -> Contract {
    Contract::new()
        .branch("tasks", tasks_contract())
        .branch("users", users_contract())
}

fn service_context() -> impl ContextFactory<TaskCtx> + 'static {
    context_fn(|_request: &InboundRequest| async move {
        Ok::<_, BoxError>(TaskCtx {
            store: Arc::new(TaskStore::default()),
            user: Some("service-account".to_string()),
        })
    })
}

#[tokio::test]
async fn test_each_mount_uses_its_own_context() {
    let store = Arc::new(TaskStore::default().with_task("shared"));
    let contract = combined_contract();
    let tasks = task_handlers();
    let users = user_handlers();
    let middleware = app_middleware();

    let table = RouteTable::builder(&contract)
        .mount("tasks", &tasks, task_context(store))
        .mount("users", &users, service_context())
        .middleware(&middleware)
        .build()
        .unwrap();
    assert_eq!(table.len(), 7);
    let dispatcher = Dispatcher::new(table);

    let reply = dispatcher
        .dispatch(InboundRequest::new(Method::Get, "/tasks/1"))
        .await;
    assert_eq!(reply.body, Some(json!({ "id": 1, "title": "shared" })));

    // the middleware tree still applies across mounts
    let reply = dispatcher
        .dispatch(InboundRequest::new(Method::Delete, "/tasks/1"))
        .await;
    assert_eq!(reply.status, 401);

    let reply = dispatcher
        .dispatch(InboundRequest::new(Method::Get, "/users/5"))
        .await;
    assert_eq!(reply.body, Some(json!({ "route": "byId", "id": "5" })));
}

#[test]
fn test_every_top_level_key_needs_a_mount() {
    let contract = combined_contract();
    let tasks = task_handlers();

    let err = RouteTable::builder(&contract)
        .mount("tasks", &tasks, task_context(Arc::new(TaskStore::default())))
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::ShapeMismatch { ref key_path, .. } if key_path == "users"));
}

#[test]
fn test_mount_keys_must_be_known_and_unique() {
    let contract = combined_contract();
    let tasks = task_handlers();
    let users = user_handlers();
    let store = Arc::new(TaskStore::default());

    let err = RouteTable::builder(&contract)
        .mount("tasks", &tasks, task_context(store.clone()))
        .mount("tasks", &tasks, task_context(store.clone()))
        .mount("users", &users, service_context())
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::ShapeMismatch { .. }));

    let err = RouteTable::builder(&contract)
        .mount("tasks", &tasks, task_context(store.clone()))
        .mount("users", &users, service_context())
        .mount("billing", &users, service_context())
        .build()
        .unwrap_err();
    assert!(matches!(err, ContractError::ShapeMismatch { ref key_path, .. } if key_path == "billing"));
}
