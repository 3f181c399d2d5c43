//! In-memory todo-list API built on the resource tree.
//!
//! Run with `cargo run --example todo`, then:
//! ```text
//! curl http://localhost:8080/todos
//! curl http://localhost:8080/todos/1
//! curl -X POST -d '{"description":"ship it"}' http://localhost:8080/todos
//! ```

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use restree::{handler, ApiResource, Server};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Todo {
    #[serde(default)]
    id: u64,
    description: String,
    #[serde(default)]
    completed: bool,
}

type Store = Arc<Mutex<Vec<Todo>>>;

fn todo_resource(store: Store) -> ApiResource {
    let mut resource = ApiResource::new("todos");

    let todos = store.clone();
    resource.set_list(Some(handler(move |_ctx, _req| {
        let todos = todos.clone();
        async move {
            let all = todos.lock().unwrap().clone();
            restree::response::json(StatusCode::OK, &all)
        }
    })));

    let todos = store.clone();
    resource.set_fetch(Some(handler(move |ctx, _req| {
        let todos = todos.clone();
        async move {
            let Some(id) = ctx.identifier("todos").and_then(|v| v.parse::<u64>().ok()) else {
                return restree::response::status(StatusCode::BAD_REQUEST);
            };
            let todos = todos.lock().unwrap();
            match todos.iter().find(|t| t.id == id) {
                Some(todo) => restree::response::json(StatusCode::OK, todo),
                None => restree::response::status(StatusCode::NOT_FOUND),
            }
        }
    })));

    let todos = store.clone();
    resource.set_create(Some(handler(move |_ctx, req| {
        let todos = todos.clone();
        async move {
            let body = match axum::body::to_bytes(req.into_body(), 64 * 1024).await {
                Ok(body) => body,
                Err(_) => return restree::response::status(StatusCode::BAD_REQUEST),
            };
            let Ok(mut todo) = serde_json::from_slice::<Todo>(&body) else {
                return restree::response::status(StatusCode::BAD_REQUEST);
            };
            let mut todos = todos.lock().unwrap();
            todo.id = todos.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            todos.push(todo.clone());
            restree::response::json(StatusCode::CREATED, &todo)
        }
    })));

    let todos = store;
    resource.set_delete(Some(handler(move |ctx, _req| {
        let todos = todos.clone();
        async move {
            let Some(id) = ctx.identifier("todos").and_then(|v| v.parse::<u64>().ok()) else {
                return restree::response::status(StatusCode::BAD_REQUEST);
            };
            let mut todos = todos.lock().unwrap();
            let before = todos.len();
            todos.retain(|t| t.id != id);
            if todos.len() == before {
                restree::response::status(StatusCode::NOT_FOUND)
            } else {
                restree::response::status(StatusCode::NO_CONTENT)
            }
        }
    })));

    resource
}

#[tokio::main]
async fn main() -> Result<(), restree::Error> {
    restree::logging::init();

    let store: Store = Arc::new(Mutex::new(vec![
        Todo {
            id: 1,
            description: "write the demo".into(),
            completed: true,
        },
        Todo {
            id: 2,
            description: "serve it".into(),
            completed: false,
        },
    ]));

    let port = std::env::var("RESTREE_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let mut server = Server::new(port);
    server.add_resource(Box::new(todo_resource(store)))?;
    server.run().await
}
