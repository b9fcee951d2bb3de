//! Per-request dispatch orchestration.
//!
//! The dispatcher drives a linear state machine for every request, with no
//! retries: match → rate-check → (websocket upgrade) → dependency-resolve →
//! middleware-wrapped invoke. Exactly one terminal [`Outcome`] is produced
//! per request.
//!
//! Rate-limit denials terminate the request **before** any middleware runs.
//! A failed WebSocket upgrade is logged and the handler still runs with an
//! empty connection slot. A dependency the registry cannot resolve aborts
//! the request with a 500: missing wiring is a programming error, which is
//! why [`Dispatcher::validate`] exists to surface it at startup instead.

use crate::context::Ctx;
use crate::handler::ParamKind;
use crate::middleware::{self, HandlerFn};
use crate::registry::ServiceRegistry;
use crate::router::Router;
use crate::websocket::Upgrader;
use http::Method;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Terminal state of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No route matched; a fixed 404 body was written.
    NotFound,
    /// The rate limiter denied the client before the middleware chain ran.
    RateLimited,
    /// The handler chain ran to completion, whatever status it wrote.
    Served,
    /// Dependency resolution failed; a 500 body was written.
    Aborted,
}

/// A route whose handler declares a dependency the registry cannot resolve.
#[derive(Debug, Clone)]
pub struct MissingBinding {
    pub method: Method,
    pub pattern: String,
    pub type_name: &'static str,
}

/// Startup validation failure listing every unresolvable handler parameter.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct ValidationError {
    pub missing: Vec<MissingBinding>,
}

impl ValidationError {
    fn render(&self) -> String {
        let mut out = String::from("unresolvable handler dependencies:");
        for binding in &self.missing {
            let _ = write!(
                out,
                " [{} {} needs {}]",
                binding.method, binding.pattern, binding.type_name
            );
        }
        out
    }
}

/// Orchestrates per-request flow over a finalized router and registry.
pub struct Dispatcher {
    router: Arc<Router>,
    registry: Arc<ServiceRegistry>,
    upgrader: Option<Arc<dyn Upgrader>>,
}

impl Dispatcher {
    /// Build a dispatcher. Registers the router's diagnostic
    /// [`RouteListing`] into the registry so `GET /routes` resolves like any
    /// other dependency.
    ///
    /// [`RouteListing`]: crate::router::RouteListing
    #[must_use]
    pub fn new(router: Arc<Router>, registry: Arc<ServiceRegistry>) -> Self {
        registry.add(router.listing());
        Self {
            router,
            registry,
            upgrader: None,
        }
    }

    /// Install the transport upgrade capability for WebSocket routes.
    pub fn set_upgrader(&mut self, upgrader: Arc<dyn Upgrader>) {
        self.upgrader = Some(upgrader);
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Check every route's dependency descriptors against the registry,
    /// converting would-be request-time aborts into a startup failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        for route in self.router.routes() {
            for kind in route.param_kinds() {
                if let ParamKind::Dependency { id, type_name } = kind {
                    if !self.registry.contains(*id) {
                        missing.push(MissingBinding {
                            method: route.method.clone(),
                            pattern: route.pattern.clone(),
                            type_name,
                        });
                    }
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// Run one request through match → rate-check → upgrade → resolve →
    /// middleware-wrapped invoke, writing the response into `ctx`.
    pub fn dispatch(&self, ctx: &Ctx) -> Outcome {
        let Some(route_match) = self.router.match_route(ctx.method(), ctx.path()) else {
            debug!(method = %ctx.method(), path = %ctx.path(), "no route matched");
            ctx.status(404).json(json!({
                "error": "Not Found",
                "method": ctx.method().to_string(),
                "path": ctx.path(),
            }));
            return Outcome::NotFound;
        };

        let index = route_match.index;
        let route = self.router.route_at(index);
        ctx.bind_route(route.id, Arc::clone(&route.param_specs), route_match.params);

        if let Some(limiter) = &route.limiter {
            let key = ctx.client_ip();
            if !limiter.take(&key) {
                info!(client = %key, route_id = %route.id, "rate limited");
                match limiter.limited_callback() {
                    Some(callback) => callback(ctx),
                    None => {
                        ctx.too_many_requests().message("Too many requests");
                    }
                }
                return Outcome::RateLimited;
            }
        }

        if route.websocket {
            match &self.upgrader {
                Some(upgrader) => match upgrader.upgrade(ctx) {
                    Ok(conn) => ctx.attach_websocket(conn),
                    Err(err) => {
                        warn!(route_id = %route.id, %err, "websocket upgrade failed");
                    }
                },
                None => {
                    warn!(route_id = %route.id, "websocket route matched but no upgrader is configured");
                }
            }
        }

        let router = Arc::clone(&self.router);
        let registry = Arc::clone(&self.registry);
        let base: HandlerFn = Arc::new(move |ctx: &Ctx| {
            let route = router.route_at(index);
            if let Err(err) = (route.handler.call)(ctx, &registry) {
                error!(route_id = %route.id, %err, "aborting request");
                ctx.error(&err.to_string(), 500);
                ctx.mark_aborted();
            }
        });
        let chain = middleware::apply(self.router.middlewares(), base);
        chain(ctx);

        if ctx.aborted() {
            Outcome::Aborted
        } else {
            Outcome::Served
        }
    }
}
