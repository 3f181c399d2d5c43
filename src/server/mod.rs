//! Server assembly and virtual-host resolution.
//!
//! # Responsibilities
//! - Own the default host plus any named virtual hosts
//! - Resolve the request's Host header (port stripped) to a host
//! - Expose the thin interceptor-chaining point
//! - Build the served axum router and run the accept loop
//!
//! # Design Decisions
//! - The host map is assembled through `&mut self` during startup, then
//!   the server moves into an `Arc` when the router is built; no mutation
//!   is expressible once traffic flows
//! - Interceptors wrap the dispatch chain outside-in: the last one added
//!   sees the request first

pub mod request_id;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::host::{Host, HostName};
use crate::resource::Resource;
use self::request_id::RequestIdLayer;

/// The request-handling chain interceptors wrap.
pub type DynHandler =
    Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response<Body>> + Send + Sync>;

/// An interceptor receives the next handler in the chain and returns the
/// handler replacing it.
pub type Interceptor = Box<dyn FnOnce(DynHandler) -> DynHandler + Send + Sync>;

/// An opinionated resource server: one default host, any number of named
/// virtual hosts, each with its own resource tree.
pub struct Server {
    config: ServerConfig,
    hosts: HashMap<HostName, Host>,
    interceptors: Vec<Interceptor>,
}

impl Server {
    /// Create a server listening on `port` with default configuration.
    pub fn new(port: u16) -> Self {
        Self::with_config(ServerConfig {
            port,
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let mut hosts = HashMap::new();
        hosts.insert(HostName::default(), Host::new(HostName::default()));
        Self {
            config,
            hosts,
            interceptors: Vec::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Register a new named virtual host and return it for configuration.
    pub fn add_host(&mut self, name: impl Into<HostName>) -> Result<&mut Host, Error> {
        let name = name.into();
        if self.hosts.contains_key(&name) {
            return Err(Error::HostExists(name));
        }
        tracing::debug!(host = %name, "host added");
        Ok(self
            .hosts
            .entry(name.clone())
            .or_insert_with(|| Host::new(name)))
    }

    pub fn get_host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn get_host_mut(&mut self, name: &str) -> Option<&mut Host> {
        self.hosts.get_mut(name)
    }

    /// Register a top-level resource on the default host.
    pub fn add_resource(&mut self, r: Box<dyn Resource>) -> Result<(), Error> {
        self.default_host_mut().add_resource(r)
    }

    /// Look a top-level resource up on the default host.
    pub fn get_resource(&self, name: &str) -> Option<&dyn Resource> {
        self.default_host().get_resource(name)
    }

    /// Add an interceptor at the start of the handling chain.
    pub fn add_interceptor<F>(&mut self, f: F)
    where
        F: FnOnce(DynHandler) -> DynHandler + Send + Sync + 'static,
    {
        self.interceptors.push(Box::new(f));
    }

    fn default_host(&self) -> &Host {
        self.hosts.get("").expect("default host is always registered")
    }

    fn default_host_mut(&mut self) -> &mut Host {
        self.hosts
            .get_mut("")
            .expect("default host is always registered")
    }

    fn resolve_host(&self, req: &Request<Body>) -> &Host {
        let name = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| req.uri().host())
            .unwrap_or("");
        let stripped = HostName::from(name).strip_port();
        match self.hosts.get(stripped.as_str()) {
            Some(host) => {
                tracing::debug!(host = %stripped, "virtual host matched");
                host
            }
            None => self.default_host(),
        }
    }

    /// Resolve the host for the request and delegate to its tree.
    pub async fn dispatch(&self, req: Request<Body>) -> Response<Body> {
        tracing::debug!(method = %req.method(), uri = %req.uri(), "incoming request");
        self.resolve_host(&req).serve(req).await
    }

    fn into_handler(mut self) -> DynHandler {
        let interceptors = std::mem::take(&mut self.interceptors);
        let core = Arc::new(self);
        let mut chain: DynHandler = Arc::new(move |req| {
            let core = Arc::clone(&core);
            Box::pin(async move { core.dispatch(req).await })
        });
        for wrap in interceptors {
            chain = wrap(chain);
        }
        chain
    }

    /// Freeze the server into the axum router that serves it.
    pub fn into_router(self) -> Router {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let chain = self.into_handler();
        Router::new()
            .fallback(move |req: Request<Body>| {
                let chain = Arc::clone(&chain);
                async move { chain(req).await }
            })
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve until interrupted.
    pub async fn run(self) -> Result<(), Error> {
        let address = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&address).await?;
        tracing::info!(%address, "server starting");

        let app = self.into_router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
