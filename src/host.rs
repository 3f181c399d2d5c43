//! Host-level resource resolution.
//!
//! # Responsibilities
//! - Hold one named collection of top-level resources
//! - Split the request path into segments and resolve the first meaningful
//!   segment against that collection
//! - Fall back to the resource registered under the empty (root) name
//!
//! # Design Decisions
//! - One trailing empty segment (from a trailing slash) is trimmed before
//!   resolution, so `/users/` and `/users` resolve identically
//! - When the first segment misses and the path had no leading slash, an
//!   empty placeholder is re-prepended so offset arithmetic in the root
//!   fallback matches the leading-slash case

use std::borrow::Borrow;
use std::fmt;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::context::RequestContext;
use crate::error::Error;
use crate::resource::{Resource, ResourceMap};
use crate::response;

/// A virtual-hosting unit name; the empty name keys the default host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HostName(String);

impl HostName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip any trailing port suffix, e.g. `localhost:8080` → `localhost`.
    pub fn strip_port(&self) -> HostName {
        match self.0.split(':').next() {
            Some(name) => Self(name.to_string()),
            None => Self(String::new()),
        }
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for HostName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for HostName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A named collection of top-level resources.
pub struct Host {
    name: HostName,
    resources: ResourceMap,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl Host {
    pub(crate) fn new(name: HostName) -> Self {
        Self {
            name,
            resources: ResourceMap::new(),
        }
    }

    pub fn name(&self) -> &HostName {
        &self.name
    }

    pub fn top_level_resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Register a top-level resource; duplicate names leave the
    /// collection unmodified.
    pub fn add_resource(&mut self, r: Box<dyn Resource>) -> Result<(), Error> {
        let name = r.name().clone();
        if self.resources.contains_key(&name) {
            return Err(Error::ResourceExists(name));
        }
        tracing::debug!(host = %self.name, resource = %name, "resource added");
        self.resources.insert(name, r);
        Ok(())
    }

    pub fn get_resource(&self, name: &str) -> Option<&dyn Resource> {
        self.resources.get(name).map(|r| r.as_ref())
    }

    /// Resolve the request path against the top-level collection and
    /// delegate to the matched resource's dispatch.
    pub async fn serve(&self, req: Request<Body>) -> Response<Body> {
        let path = req.uri().path().to_string();
        let trimmed = path.strip_suffix('/').unwrap_or(&path);
        let mut segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();

        let lead_slash = path.starts_with('/');
        let mut idx = usize::from(lead_slash);
        if idx >= segments.len() {
            idx = 0;
        }

        let mut resource = self.resources.get(segments[idx].as_str());
        if resource.is_none() {
            idx = 0;
            if !lead_slash {
                segments.insert(0, String::new());
            }
            resource = self.resources.get("");
        }

        match resource {
            Some(r) => {
                tracing::debug!(host = %self.name, resource = %r.name(), path = %path, "dispatching");
                let ctx = RequestContext::new(segments[idx..].to_vec());
                r.handle_call(ctx, req).await
            }
            None => {
                tracing::debug!(host = %self.name, path = %path, "no matching resource");
                response::status(StatusCode::NOT_FOUND)
            }
        }
    }
}
