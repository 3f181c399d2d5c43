//! REST resource classification and dispatch.
//!
//! # Responsibilities
//! - Classify a request into an action from its method and extracted
//!   identifier
//! - Extract this resource's identifier from the path segments
//! - Recurse into sub-resource / child-resource trees
//! - Answer 404/405 when the walk or the action map comes up empty
//!
//! # Design Decisions
//! - The tree is read-only during serving: all mutators take `&mut self`,
//!   so configuration is confined to the single-threaded startup phase
//! - Registering `None` for an action removes the map entry; lookups then
//!   correctly report "unregistered" (405) instead of hitting a no-op
//! - A failed identifier match does not fail the request: the segment may
//!   still name a non-instanced sub-resource (e.g. `/users/search`)

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use futures_util::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::Error;
use crate::resource::id::IdPattern;
use crate::resource::{Resource, ResourceMap, ResourceName};
use crate::response;

/// The semantic operation a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    List,
    Fetch,
    Update,
    Delete,
}

impl Action {
    /// Derive the action from the HTTP method, or `None` for methods the
    /// dispatcher does not understand (which answer 405 directly).
    fn from_method(method: &Method, instanced: bool) -> Option<Self> {
        if *method == Method::GET {
            Some(if instanced { Self::Fetch } else { Self::List })
        } else if *method == Method::POST {
            Some(Self::Create)
        } else if *method == Method::DELETE {
            Some(Self::Delete)
        } else if *method == Method::PUT || *method == Method::PATCH {
            Some(Self::Update)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::List => "List",
            Self::Fetch => "Fetch",
            Self::Update => "Update",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Handler for one registered action.
pub type ActionHandler =
    Arc<dyn Fn(RequestContext, Request<Body>) -> BoxFuture<'static, Response<Body>> + Send + Sync>;

/// Custom top-level handler replacing the internal default dispatcher.
pub type DispatchHandler = Arc<
    dyn Fn(Action, RequestContext, Request<Body>) -> BoxFuture<'static, Response<Body>>
        + Send
        + Sync,
>;

/// Wrap an async closure as an [`ActionHandler`].
pub fn handler<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(RequestContext, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    Arc::new(move |ctx, req| Box::pin(f(ctx, req)))
}

/// Wrap an async closure as a [`DispatchHandler`].
pub fn dispatch_handler<F, Fut>(f: F) -> DispatchHandler
where
    F: Fn(Action, RequestContext, Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    Arc::new(move |action, ctx, req| Box::pin(f(action, ctx, req)))
}

/// A REST resource node: action map, identifier matcher, non-instanced
/// sub-resources and instanced child resources.
pub struct ApiResource {
    name: ResourceName,
    id: IdPattern,
    actions: HashMap<Action, ActionHandler>,
    handler: Option<DispatchHandler>,
    subs: ResourceMap,
    children: ResourceMap,
}

impl ApiResource {
    /// Create a resource with the built-in numeric identifier matcher and
    /// nothing registered.
    pub fn new(name: impl Into<ResourceName>) -> Self {
        Self {
            name: name.into(),
            id: IdPattern::numeric(),
            actions: HashMap::new(),
            handler: None,
            subs: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Replace the identifier matcher wholesale.
    ///
    /// On a compile failure the previous matcher stays installed and the
    /// error is returned.
    pub fn set_id(&mut self, pattern: &str) -> Result<(), Error> {
        self.id = IdPattern::new(pattern)?;
        Ok(())
    }

    /// The pattern currently used to match instance identifiers.
    pub fn id_pattern(&self) -> &IdPattern {
        &self.id
    }

    pub fn set_list(&mut self, f: Option<ActionHandler>) {
        self.set_action(Action::List, f);
    }

    pub fn set_create(&mut self, f: Option<ActionHandler>) {
        self.set_action(Action::Create, f);
    }

    pub fn set_fetch(&mut self, f: Option<ActionHandler>) {
        self.set_action(Action::Fetch, f);
    }

    pub fn set_update(&mut self, f: Option<ActionHandler>) {
        self.set_action(Action::Update, f);
    }

    pub fn set_delete(&mut self, f: Option<ActionHandler>) {
        self.set_action(Action::Delete, f);
    }

    fn set_action(&mut self, action: Action, f: Option<ActionHandler>) {
        match f {
            Some(f) => {
                self.actions.insert(action, f);
            }
            None => {
                self.actions.remove(&action);
            }
        }
    }

    /// Install a custom top-level handler; `None` restores the internal
    /// default dispatcher.
    pub fn set_handler(&mut self, f: Option<DispatchHandler>) {
        self.handler = f;
    }

    /// Register a non-instanced sub-resource, reachable directly under
    /// this resource's name without an identifier.
    pub fn add_resource(&mut self, r: Box<dyn Resource>) -> Result<(), Error> {
        let name = r.name().clone();
        if self.subs.contains_key(&name) {
            return Err(Error::ResourceExists(name));
        }
        self.subs.insert(name, r);
        Ok(())
    }

    /// Register an instanced child resource, reachable only after a valid
    /// identifier has been matched on this resource.
    pub fn add_child_resource(&mut self, r: Box<dyn Resource>) -> Result<(), Error> {
        let name = r.name().clone();
        if self.children.contains_key(&name) {
            return Err(Error::ChildResourceExists(name));
        }
        self.children.insert(name, r);
        Ok(())
    }

    pub fn sub_resource_count(&self) -> usize {
        self.subs.len()
    }

    pub fn child_resource_count(&self) -> usize {
        self.children.len()
    }

    /// The identifier extracted for this resource on the current request.
    pub fn identifier_value<'c>(&self, ctx: &'c RequestContext) -> Result<&'c str, Error> {
        ctx.identifier(self.name.as_str())
            .ok_or_else(|| Error::IdentifierNotFound(self.name.clone()))
    }

    async fn dispatch(&self, mut ctx: RequestContext, req: Request<Body>) -> Response<Body> {
        let segments = ctx.segments().to_vec();

        // 1. Locate this resource's own position among the remaining
        //    segments; the segment after it is the identifier candidate.
        let mut own_idx: Option<usize> = None;
        let mut candidate: Option<(usize, String)> = None;
        for (i, segment) in segments.iter().enumerate() {
            if own_idx.is_some() {
                if !segment.is_empty() {
                    candidate = Some((i, segment.clone()));
                }
                break;
            }
            if segment == self.name.as_str() {
                own_idx = Some(i);
            }
        }

        // 2. Identifier extraction. A failed match leaves the segment
        //    unconsumed: it may still name a non-instanced sub-resource.
        let mut consumed = own_idx;
        match candidate {
            None => ctx.set_sub_segment(self.name.clone(), false),
            Some((idx, segment)) => {
                ctx.set_sub_segment(self.name.clone(), true);
                if let Some(value) = self.id.find(&segment) {
                    tracing::debug!(resource = %self.name, id = %value, "identifier matched");
                    ctx.insert_identifier(self.name.clone(), value.to_string());
                    consumed = Some(idx);
                } else {
                    tracing::debug!(resource = %self.name, segment = %segment, "identifier rejected");
                }
            }
        }

        // 3. Advance past the consumed segments and check remaining depth.
        let remaining: Vec<String> = match consumed {
            Some(i) => segments[i + 1..].to_vec(),
            None => Vec::new(),
        };
        ctx.set_segments(remaining.clone());

        let instanced = ctx.identifier(self.name.as_str()).is_some();
        let next = remaining
            .first()
            .map(String::as_str)
            .filter(|s| !s.is_empty());

        if let Some(next) = next {
            let pool = if instanced { &self.children } else { &self.subs };
            return match pool.get(next) {
                Some(sub) => sub.handle_call(ctx, req).await,
                None => {
                    tracing::debug!(resource = %self.name, segment = %next, "no matching sub-resource");
                    response::status(StatusCode::NOT_FOUND)
                }
            };
        }

        // 4. Terminal: derive the action from the HTTP method.
        let Some(action) = Action::from_method(req.method(), instanced) else {
            tracing::debug!(resource = %self.name, method = %req.method(), "unknown method");
            return response::status(StatusCode::METHOD_NOT_ALLOWED);
        };

        // 5. Invoke the custom handler or the default dispatcher.
        tracing::debug!(resource = %self.name, %action, "resolved action");
        match &self.handler {
            Some(custom) => custom(action, ctx, req).await,
            None => self.default_dispatch(action, ctx, req).await,
        }
    }

    async fn default_dispatch(
        &self,
        action: Action,
        ctx: RequestContext,
        req: Request<Body>,
    ) -> Response<Body> {
        // A trailing segment that matched neither an identifier nor a
        // sub-resource means the path named something that does not exist.
        if action == Action::List && ctx.had_sub_segment(self.name.as_str()) {
            return response::status(StatusCode::NOT_FOUND);
        }
        match self.actions.get(&action) {
            Some(f) => f(ctx, req).await,
            None => response::status(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

impl Resource for ApiResource {
    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn handle_call<'a>(
        &'a self,
        ctx: RequestContext,
        req: Request<Body>,
    ) -> BoxFuture<'a, Response<Body>> {
        Box::pin(self.dispatch(ctx, req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn ctx_with(segments: &[&str]) -> RequestContext {
        RequestContext::new(segments.iter().map(|s| s.to_string()).collect())
    }

    fn status_handler(code: StatusCode) -> ActionHandler {
        handler(move |_ctx, _req| async move { response::status(code) })
    }

    async fn call(res: &ApiResource, segments: &[&str], req: Request<Body>) -> StatusCode {
        res.handle_call(ctx_with(segments), req).await.status()
    }

    #[tokio::test]
    async fn test_all_methods_405_when_nothing_registered() {
        let res = ApiResource::new("");
        for (method, segments) in [
            (Method::GET, vec![]),
            (Method::POST, vec![]),
            (Method::GET, vec!["1"]),
            (Method::PUT, vec!["1"]),
            (Method::PATCH, vec!["1"]),
            (Method::DELETE, vec!["1"]),
        ] {
            let status = call(&res, &segments, request(method.clone(), "/")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
    }

    #[tokio::test]
    async fn test_unknown_method_405() {
        let mut res = ApiResource::new("");
        res.set_list(Some(status_handler(StatusCode::OK)));
        let req = request(Method::from_bytes(b"NOSUCHMETHOD").unwrap(), "/");
        assert_eq!(call(&res, &[""], req).await, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_action_routing_matrix() {
        let mut res = ApiResource::new("users");
        res.set_list(Some(status_handler(StatusCode::ACCEPTED)));
        res.set_create(Some(status_handler(StatusCode::CREATED)));
        res.set_fetch(Some(status_handler(StatusCode::IM_A_TEAPOT)));
        res.set_update(Some(status_handler(StatusCode::ALREADY_REPORTED)));
        res.set_delete(Some(status_handler(StatusCode::NO_CONTENT)));

        let cases = [
            (Method::GET, vec!["users"], StatusCode::ACCEPTED),
            (Method::GET, vec!["users", "21"], StatusCode::IM_A_TEAPOT),
            (Method::POST, vec!["users"], StatusCode::CREATED),
            (Method::PUT, vec!["users", "21"], StatusCode::ALREADY_REPORTED),
            (
                Method::PATCH,
                vec!["users", "21"],
                StatusCode::ALREADY_REPORTED,
            ),
            (Method::DELETE, vec!["users", "1"], StatusCode::NO_CONTENT),
        ];
        for (method, segments, expected) in cases {
            let status = call(&res, &segments, request(method.clone(), "/users")).await;
            assert_eq!(status, expected, "{method}");
        }
    }

    #[tokio::test]
    async fn test_unregistering_restores_405() {
        let mut res = ApiResource::new("users");
        res.set_list(Some(status_handler(StatusCode::OK)));
        res.set_create(Some(status_handler(StatusCode::CREATED)));
        res.set_list(None);
        res.set_create(None);

        let status = call(&res, &["users"], request(Method::GET, "/users")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let status = call(&res, &["users"], request(Method::POST, "/users")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_invalid_id_404_not_405() {
        let mut res = ApiResource::new("users");
        res.set_list(Some(status_handler(StatusCode::OK)));
        res.set_fetch(Some(status_handler(StatusCode::OK)));

        let status = call(&res, &["users", "abc"], request(Method::GET, "/users/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sub_resource_reachable_without_id() {
        let mut search = ApiResource::new("search");
        search.set_list(Some(status_handler(StatusCode::OK)));
        let mut users = ApiResource::new("users");
        users.set_list(Some(status_handler(StatusCode::ACCEPTED)));
        users.add_resource(Box::new(search)).unwrap();

        let status = call(
            &users,
            &["users", "search"],
            request(Method::GET, "/users/search"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The bare collection still resolves to List.
        let status = call(&users, &["users"], request(Method::GET, "/users")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_child_resource_requires_id() {
        let mut posts = ApiResource::new("posts");
        posts.set_list(Some(status_handler(StatusCode::OK)));
        let mut users = ApiResource::new("users");
        users.add_child_resource(Box::new(posts)).unwrap();

        let status = call(
            &users,
            &["users", "7", "posts"],
            request(Method::GET, "/users/7/posts"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Without an identifier the child collection is not searched.
        let status = call(
            &users,
            &["users", "posts"],
            request(Method::GET, "/users/posts"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_deeper_segment_after_id_404() {
        let mut users = ApiResource::new("users");
        users.set_fetch(Some(status_handler(StatusCode::OK)));
        let status = call(
            &users,
            &["users", "7", "nope"],
            request(Method::GET, "/users/7/nope"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_handler_receives_resolved_action() {
        let seen = Arc::new(Mutex::new(None::<Action>));
        let seen_in = seen.clone();
        let mut res = ApiResource::new("users");
        res.set_handler(Some(dispatch_handler(move |action, _ctx, _req| {
            let seen = seen_in.clone();
            async move {
                *seen.lock().unwrap() = Some(action);
                response::status(StatusCode::OK)
            }
        })));

        let status = call(&res, &["users", "3"], request(Method::GET, "/users/3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*seen.lock().unwrap(), Some(Action::Fetch));

        // Restoring the default dispatcher brings back 405s.
        res.set_handler(None);
        let status = call(&res, &["users"], request(Method::GET, "/users")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_handler_invoked_exactly_once() {
        let called = Arc::new(AtomicBool::new(false));
        let called_in = called.clone();
        let mut res = ApiResource::new("users");
        res.set_list(Some(handler(move |_ctx, _req| {
            let called = called_in.clone();
            async move {
                assert!(!called.swap(true, Ordering::SeqCst), "handler ran twice");
                response::status(StatusCode::OK)
            }
        })));
        let status = call(&res, &["users"], request(Method::GET, "/users")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_identifier_value_in_context() {
        let seen = Arc::new(Mutex::new(None::<String>));
        let seen_in = seen.clone();
        let mut res = ApiResource::new("users");
        res.set_id("id-[0-9]+").unwrap();
        res.set_fetch(Some(handler(move |ctx, _req| {
            let seen = seen_in.clone();
            async move {
                *seen.lock().unwrap() = ctx.identifier("users").map(str::to_string);
                response::status(StatusCode::OK)
            }
        })));

        let status = call(
            &res,
            &["users", "id-123"],
            request(Method::GET, "/users/id-123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(seen.lock().unwrap().as_deref(), Some("id-123"));
    }

    #[test]
    fn test_identifier_value_errors_when_absent() {
        let res = ApiResource::new("users");
        let ctx = RequestContext::default();
        assert!(matches!(
            res.identifier_value(&ctx),
            Err(Error::IdentifierNotFound(_))
        ));

        let mut ctx = RequestContext::default();
        ctx.insert_identifier(ResourceName::from("users"), "9".into());
        assert_eq!(res.identifier_value(&ctx).unwrap(), "9");
    }

    #[test]
    fn test_invalid_pattern_keeps_previous_matcher() {
        let mut res = ApiResource::new("users");
        res.set_id("id-[0-9]+").unwrap();
        assert!(res.set_id("[unclosed").is_err());
        assert_eq!(res.id_pattern().as_str(), "id-[0-9]+");
    }

    #[test]
    fn test_duplicate_adds_leave_collections_unchanged() {
        let mut res = ApiResource::new("users");
        res.add_resource(Box::new(ApiResource::new("search")))
            .unwrap();
        let err = res
            .add_resource(Box::new(ApiResource::new("search")))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceExists(_)));
        assert_eq!(res.sub_resource_count(), 1);

        res.add_child_resource(Box::new(ApiResource::new("posts")))
            .unwrap();
        let err = res
            .add_child_resource(Box::new(ApiResource::new("posts")))
            .unwrap_err();
        assert!(matches!(err, Error::ChildResourceExists(_)));
        assert_eq!(res.child_resource_count(), 1);

        // The two collections are independent: the same name may live in
        // both without colliding.
        res.add_resource(Box::new(ApiResource::new("posts"))).unwrap();
        assert_eq!(res.sub_resource_count(), 2);
    }
}
