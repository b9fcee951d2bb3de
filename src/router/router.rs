use super::route::{split_path, Route, RouteHandle};
use crate::context::{Ctx, RawParams};
use crate::handler::{Dep, IntoHandler};
use crate::middleware::Middleware;
use http::Method;
use serde::Serialize;
use serde_json::json;

/// A successful match: the route's position in the table plus the raw path
/// parameters bound during the pairwise walk.
#[derive(Debug)]
pub struct RouteMatch {
    pub(crate) index: usize,
    pub params: RawParams,
}

/// Diagnostic view of one registered route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteInfo {
    pub path: String,
    pub method: String,
    pub id: String,
    pub rate_limited: bool,
}

/// Snapshot of the route table, registered into the service registry so the
/// diagnostic `/routes` handler can inject it like any other dependency.
/// Serializes as the bare array of [`RouteInfo`] entries.
#[derive(Debug, Clone, Serialize)]
pub struct RouteListing(pub Vec<RouteInfo>);

/// Ordered route table.
///
/// Matching iterates **in registration order** and the first structurally
/// matching route wins; there is no backtracking and no best-match search.
/// Declaration order is therefore a correctness-relevant contract: register
/// more specific patterns before more general ones that would shadow them.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<Middleware>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::GET, pattern, false, handler)
    }

    pub fn post<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::POST, pattern, false, handler)
    }

    pub fn put<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::PUT, pattern, false, handler)
    }

    pub fn patch<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::PATCH, pattern, false, handler)
    }

    pub fn delete<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::DELETE, pattern, false, handler)
    }

    /// Register a WebSocket route. Matched over GET; the dispatcher performs
    /// the protocol upgrade before invoking the handler.
    pub fn websocket<H, Args>(&mut self, pattern: &str, handler: H) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        self.register(Method::GET, pattern, true, handler)
    }

    fn register<H, Args>(
        &mut self,
        method: Method,
        pattern: &str,
        websocket: bool,
        handler: H,
    ) -> RouteHandle<'_>
    where
        H: IntoHandler<Args>,
    {
        let route = Route::new(method, pattern, websocket, handler.into_erased());
        self.routes.push(route);
        let index = self.routes.len() - 1;
        RouteHandle {
            route: &mut self.routes[index],
        }
    }

    /// Append a middleware to the pipeline. First registered is outermost.
    pub fn use_middleware(&mut self, mw: Middleware) {
        self.middlewares.push(mw);
    }

    pub(crate) fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Find the first route matching `method` and `path`, in registration
    /// order. Routes with a different method or segment count are skipped
    /// without inspecting content.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let request_segments = split_path(path);
        for (index, route) in self.routes.iter().enumerate() {
            if route.method != *method {
                continue;
            }
            if route.segments.len() != request_segments.len() {
                continue;
            }
            if let Some(params) = route.bind_segments(&request_segments) {
                return Some(RouteMatch { index, params });
            }
        }
        None
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn route_at(&self, index: usize) -> &Route {
        &self.routes[index]
    }

    /// Diagnostic snapshot of the table: path, method, id, rate-limited flag
    /// per route, in registration order.
    #[must_use]
    pub fn listing(&self) -> RouteListing {
        RouteListing(
            self.routes
                .iter()
                .map(|route| RouteInfo {
                    path: route.pattern.clone(),
                    method: route.method.to_string(),
                    id: route.id.to_string(),
                    rate_limited: route.is_rate_limited(),
                })
                .collect(),
        )
    }

    /// Register `GET /health` returning `{"status":"ok"}`.
    pub fn health(&mut self) {
        self.get("/health", |ctx: Ctx| {
            ctx.ok().json(json!({ "status": "ok" }));
        });
    }

    /// Register the diagnostic `GET /routes` endpoint. The listing is taken
    /// at dispatcher construction, so it reflects the full table including
    /// routes registered after this call.
    pub fn list_routes(&mut self) {
        self.get("/routes", |ctx: Ctx, routes: Dep<RouteListing>| {
            ctx.body(&*routes);
        });
    }
}
