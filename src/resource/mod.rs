//! Resource capability and naming.
//!
//! # Responsibilities
//! - Define the `Resource` trait: anything nameable that can answer a
//!   request given a request-scoped context
//! - Define `ResourceName`, the sibling-unique identifier for tree nodes
//!
//! # Design Decisions
//! - `handle_call` returns a boxed future so resource trees of trait
//!   objects can recurse without generic plumbing
//! - `ResourceName` implements `Borrow<str>`, so collections keyed by
//!   name resolve raw path segments without allocating
//! - The empty name is valid and reserved for the default/root resource

pub mod api;
pub mod files;
pub mod id;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;

use crate::context::RequestContext;

/// Sibling-unique identifier for a resource within its collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The reserved empty name of the default/root resource.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The atomic routing unit: anything nameable that can handle a request.
///
/// Implementations receive the request-scoped [`RequestContext`] by value;
/// a level that descends further derives a new context rather than sharing
/// the caller's, which is what keeps concurrent requests lock-free.
pub trait Resource: Send + Sync {
    /// The sibling-unique name this resource was registered under.
    fn name(&self) -> &ResourceName;

    /// Answer the request, recursing into sub-resources as needed.
    fn handle_call<'a>(
        &'a self,
        ctx: RequestContext,
        req: Request<Body>,
    ) -> BoxFuture<'a, Response<Body>>;
}

/// Resources keyed by their sibling-unique name.
pub type ResourceMap = HashMap<ResourceName, Box<dyn Resource>>;
