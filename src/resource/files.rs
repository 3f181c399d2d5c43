//! Static file resources.
//!
//! A [`FileResource`] serves a directory tree below `/<name>/`. It only
//! answers Fetch-style requests; everything else is rejected by the
//! underlying file service. Filesystem failures map to 500 since they
//! indicate misconfiguration rather than a client error.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, Uri};
use futures_util::future::BoxFuture;
use tower_http::services::ServeDir;

use crate::context::RequestContext;
use crate::resource::{Resource, ResourceName};
use crate::response;

/// A resource serving static files from a base directory.
pub struct FileResource {
    name: ResourceName,
    base: PathBuf,
    serve_dir: ServeDir,
}

impl FileResource {
    pub fn new(name: impl Into<ResourceName>, base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            name: name.into(),
            serve_dir: ServeDir::new(&base),
            base,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// The resource's full path, with forced leading and trailing slashes;
    /// this prefix is stripped before delegating to the file service.
    pub fn full_path(&self) -> String {
        if self.name.is_root() {
            "/".to_string()
        } else {
            format!("/{}/", self.name.as_str().trim_matches('/'))
        }
    }

    fn rebase(&self, req: Request<Body>) -> Request<Body> {
        let (mut parts, body) = req.into_parts();
        let prefix = self.full_path();
        let path = parts.uri.path();
        let rel = path
            .strip_prefix(prefix.as_str())
            .unwrap_or(path)
            .trim_start_matches('/');
        if let Ok(uri) = format!("/{rel}").parse::<Uri>() {
            parts.uri = uri;
        }
        Request::from_parts(parts, body)
    }
}

impl Resource for FileResource {
    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn handle_call<'a>(
        &'a self,
        _ctx: RequestContext,
        req: Request<Body>,
    ) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            let req = self.rebase(req);
            let mut serve_dir = self.serve_dir.clone();
            match serve_dir.try_call(req).await {
                Ok(file_response) => file_response.map(Body::new),
                Err(error) => {
                    tracing::error!(resource = %self.name, %error, "static file serving failed");
                    response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use std::fs;

    fn fixture_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("restree-files-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("hello.txt"), "Hello, World!").unwrap();
        dir
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_full_path_forces_slashes() {
        let res = FileResource::new("assets", "/tmp");
        assert_eq!(res.full_path(), "/assets/");
        let root = FileResource::new(ResourceName::root(), "/tmp");
        assert_eq!(root.full_path(), "/");
    }

    #[tokio::test]
    async fn test_serves_file_under_prefix() {
        let dir = fixture_dir("serve");
        let res = FileResource::new("static", &dir);
        let response = res
            .handle_call(RequestContext::default(), request("/static/hello.txt"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn test_unknown_file_404() {
        let dir = fixture_dir("missing");
        let res = FileResource::new("static", &dir);
        let response = res
            .handle_call(RequestContext::default(), request("/static/nope.txt"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
