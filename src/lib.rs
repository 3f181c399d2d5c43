//! Resource-tree HTTP dispatcher for REST-style APIs.
//!
//! Resources form a nested, named tree; incoming requests are classified
//! into semantic actions (List, Create, Fetch, Update, Delete) while
//! per-resource identifiers are extracted from path segments by regular
//! expressions. Integrators register handlers per action and never write
//! path-parsing code.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → server (Host header → virtual host, default host fallback)
//!     → host (first path segment → top-level resource, root fallback)
//!     → resource tree (identifier extraction, sub-/child recursion)
//!     → action handler, or the router's own 404/405
//! ```
//!
//! The tree is assembled single-threaded at startup, then frozen: serving
//! never mutates it, and the per-request context moves by value through
//! the tree, so concurrent requests need no locking.

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod logging;
pub mod resource;
pub mod response;
pub mod server;

pub use config::ServerConfig;
pub use context::RequestContext;
pub use error::Error;
pub use host::{Host, HostName};
pub use resource::api::{
    dispatch_handler, handler, Action, ActionHandler, ApiResource, DispatchHandler,
};
pub use resource::files::FileResource;
pub use resource::id::{IdPattern, NUMERIC_ID, UUID_ID};
pub use resource::{Resource, ResourceMap, ResourceName};
pub use server::request_id::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{DynHandler, Interceptor, Server};
