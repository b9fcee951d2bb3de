//! Middleware pipeline.
//!
//! A middleware is a handler-wrapping function. The pipeline composes the
//! registration list right to left, so the **first registered middleware is
//! the outermost**: it runs first on the way in and last on the way out. A
//! middleware short-circuits by not invoking its inner handler; the
//! dispatcher has no visibility into why a chain stopped early.

use crate::context::Ctx;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};

/// An invocable handler stage, shared so wrappers can capture it.
pub type HandlerFn = Arc<dyn Fn(&Ctx) + Send + Sync>;

/// A handler-wrapping function.
pub type Middleware = Box<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

/// Wrap `handler` in every middleware, first registered outermost.
pub(crate) fn apply(middlewares: &[Middleware], handler: HandlerFn) -> HandlerFn {
    let mut wrapped = handler;
    for mw in middlewares.iter().rev() {
        wrapped = mw(wrapped);
    }
    wrapped
}

/// Stock middleware emitting a `tracing` span per request with method, path,
/// route id, response status, and latency.
#[must_use]
pub fn logging() -> Middleware {
    Box::new(|next: HandlerFn| {
        Arc::new(move |ctx: &Ctx| {
            let span = info_span!(
                "request",
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                path = %ctx.path(),
            );
            let _guard = span.enter();
            let start = Instant::now();
            next(ctx);
            info!(
                status = ctx.response_status().unwrap_or(200),
                latency_ms = start.elapsed().as_millis() as u64,
                route_id = ctx.route_id().map(tracing::field::display),
                "request served"
            );
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestParts;
    use http::Method;
    use parking_lot::Mutex;

    fn recording(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware {
        Box::new(move |next: HandlerFn| {
            let log = Arc::clone(&log);
            Arc::new(move |ctx: &Ctx| {
                log.lock().push(format!("{label}:in"));
                next(ctx);
                log.lock().push(format!("{label}:out"));
            })
        })
    }

    #[test]
    fn first_registered_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares = vec![
            recording("a", Arc::clone(&log)),
            recording("b", Arc::clone(&log)),
        ];
        let inner_log = Arc::clone(&log);
        let base: HandlerFn = Arc::new(move |_ctx| inner_log.lock().push("handler".to_string()));
        let chain = apply(&middlewares, base);
        chain(&Ctx::new(RequestParts::new(Method::GET, "/x")));
        assert_eq!(
            *log.lock(),
            vec!["a:in", "b:in", "handler", "b:out", "a:out"]
        );
    }

    #[test]
    fn short_circuit_skips_inner_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate_log = Arc::clone(&log);
        let gate: Middleware = Box::new(move |_next: HandlerFn| {
            let log = Arc::clone(&gate_log);
            Arc::new(move |ctx: &Ctx| {
                log.lock().push("gate".to_string());
                ctx.error("blocked", 403);
            })
        });
        let middlewares = vec![gate, recording("inner", Arc::clone(&log))];
        let base: HandlerFn = Arc::new(|_ctx| panic!("handler must not run"));
        let chain = apply(&middlewares, base);
        let ctx = Ctx::new(RequestParts::new(Method::GET, "/x"));
        chain(&ctx);
        assert_eq!(*log.lock(), vec!["gate"]);
        assert_eq!(ctx.response_status(), Some(403));
    }
}
