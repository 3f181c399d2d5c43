//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use restree::{handler, ApiResource, Resource};
use tower::ServiceExt;

/// Build a request, optionally with a Host header.
pub fn request(method: Method, uri: &str, host: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    builder.body(Body::empty()).unwrap()
}

/// An API resource whose List handler answers with a fixed status.
pub fn list_resource(name: &str, code: StatusCode) -> Box<dyn Resource> {
    let mut res = ApiResource::new(name);
    res.set_list(Some(handler(move |_ctx, _req| async move {
        restree::response::status(code)
    })));
    Box::new(res)
}

/// Drive one request through the built router.
pub async fn send(router: &Router, req: Request<Body>) -> Response<Body> {
    router.clone().oneshot(req).await.unwrap()
}

/// Serve the router on an ephemeral local port for end-to-end clients.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
