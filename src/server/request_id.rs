//! Request ID generation.
//!
//! # Responsibilities
//! - Stamp a unique ID onto every incoming request, as early as possible
//! - Echo the ID on the response so clients can correlate
//!
//! # Design Decisions
//! - UUIDv4, carried both as a request extension (for handlers) and as the
//!   `x-request-id` header (for upstream log correlation)

use std::fmt;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique per-request identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read the request ID stamped by [`RequestIdLayer`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Layer stamping a fresh [`RequestId`] onto every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let id = RequestId::new();
        let header = HeaderName::from_static(X_REQUEST_ID);
        match HeaderValue::from_str(&id.to_string()) {
            Ok(value) => {
                req.headers_mut().insert(header.clone(), value.clone());
                req.extensions_mut().insert(id);
                let fut = self.inner.call(req);
                Box::pin(async move {
                    let mut response = fut.await?;
                    response.headers_mut().insert(header, value);
                    Ok(response)
                })
            }
            Err(_) => {
                let fut = self.inner.call(req);
                Box::pin(async move { fut.await })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn test_layer_stamps_request_and_response() {
        let service = RequestIdLayer.layer(service_fn(|req: Request<Body>| async move {
            // The extension and header are visible to the inner service.
            assert!(req.request_id().is_some());
            assert!(req.headers().contains_key(X_REQUEST_ID));
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));

        let response = service
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }
}
