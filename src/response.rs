//! Response construction helpers.
//!
//! The dispatcher writes its own 404/405/500 fallbacks through these;
//! action handlers are free to build on them or construct responses
//! directly. The router never writes a body except through handlers.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// An empty-bodied response with the given status.
pub fn status(code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    response
}

/// A JSON response with the given status.
///
/// Serialization failure degrades to an empty 500, since it indicates a
/// handler bug rather than a client error.
pub fn json<T: Serialize>(code: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(buf) => {
            let mut response = Response::new(Body::from(buf));
            *response.status_mut() = code;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(error) => {
            tracing::error!(%error, "response serialization failed");
            status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_has_empty_body() {
        let response = status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_json_sets_content_type() {
        let response = json(StatusCode::OK, &serde_json::json!({"ok": true}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
