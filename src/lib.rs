//! Embeddable HTTP request dispatcher on coroutine I/O.
//!
//! `roto` routes requests over an ordered table of `:name{type}` patterns,
//! injects shared dependencies into plain-function handlers, wraps them in a
//! composable middleware pipeline, and enforces per-client token-bucket rate
//! limits, all served by `may` coroutines.
//!
//! ```no_run
//! use roto::{App, Ctx, Router};
//! use serde_json::json;
//!
//! let mut router = Router::new();
//! router.get("/hello", |ctx: Ctx| {
//!     ctx.ok().json(json!({ "message": "Hello, World!" }));
//! });
//! router.health();
//!
//! App::new(router).start("127.0.0.1:8080").unwrap();
//! ```

pub mod app;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod ids;
pub mod middleware;
pub mod params;
pub mod rate;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod websocket;

pub use app::App;
pub use context::{BodyError, ContentType, Ctx, RequestParts, ResponseParts};
pub use dispatcher::{Dispatcher, MissingBinding, Outcome, ValidationError};
pub use handler::{Dep, IntoHandler, MissingDependency, ParamKind};
pub use ids::{RequestId, RouteId};
pub use middleware::{logging, HandlerFn, Middleware};
pub use params::{CoerceError, ParamSpec, ParamType, ParamValue};
pub use rate::RateLimiter;
pub use registry::ServiceRegistry;
pub use router::{RouteHandle, RouteInfo, RouteListing, Router};
pub use runtime_config::RuntimeConfig;
pub use server::{AppService, HttpServer, ServerHandle};
pub use websocket::{UpgradeError, Upgrader, WsConnection, WsTransport};
